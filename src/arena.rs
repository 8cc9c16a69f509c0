//! Arena: the collection of segments, pools and roots a tracer drives, plus
//! the trace-slot table and the lifecycle operations that tie every other
//! module together.
//!
//! Segments and pools live in [`SegmentStore`], a field of `Arena` kept
//! separate from `roots`/`traces`/`shield` so that a scan can hold a
//! shared borrow of the store (handed to a [`ScanState`]) at the same
//! time the rest of `Arena` is mutated -- e.g. while a root's `scan` is
//! called through `&mut self.roots[i]`. Segment colour/summary mutation
//! goes through `Cell`s inside `Segment` itself, so `SegmentStore`'s own
//! methods only ever need `&self`.
//!
//! Segment storage here is the simplest thing that can work: a flat `Vec`
//! walked linearly by `seg_of_addr` and the grey-segment search in `step`.
//! A production arena would index segments by address (e.g. an interval
//! tree or page table) for the O(1) average lookup external collaborators
//! are expected to provide; that indexing concern belongs to the
//! address-space/storage layer this crate treats as external, and isn't
//! reimplemented here.


use log::{debug, trace, warn};

use crate::config::Config;
use crate::error::Res;
use crate::ld::LocationDependency;
use crate::pool::{Pool, PoolAttr};
use crate::rank::{Rank, RankSet};
use crate::refset::RefSet;
use crate::root::Root;
use crate::scanstate::ScanState;
use crate::segment::{Access, PoolId, SegId, Segment};
use crate::shield::Shield;
use crate::trace::{Trace, TraceState};
use crate::traceset::{TraceId, TraceSet};


/// Identifies one registered root within an `Arena`.
pub type RootId = usize;


/// Segment and pool storage, borrowed shared by `ScanState` for the
/// duration of one scan.
pub(crate) struct SegmentStore {
    segments: Vec<Segment>,
    pools: Vec<Box<dyn Pool>>,
    reserved_base: usize,
    reserved_limit: usize,
}

impl SegmentStore {
    fn new() -> SegmentStore {
        SegmentStore {
            segments: Vec::new(),
            pools: Vec::new(),
            reserved_base: 0,
            reserved_limit: 0,
        }
    }

    pub fn seg(&self, id: SegId) -> &Segment {
        &self.segments[id]
    }

    pub fn pool(&self, id: PoolId) -> &dyn Pool {
        self.pools[id].as_ref()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Linear scan for the segment containing `addr`, if any.
    pub fn seg_of_addr(&self, addr: usize) -> Option<SegId> {
        self.segments.iter().find(|s| addr >= s.base() && addr < s.limit()).map(|s| s.id())
    }

    /// `addr` lies within this arena's declared address range but inside
    /// no segment.
    pub fn is_reserved_addr(&self, addr: usize) -> bool {
        addr >= self.reserved_base && addr < self.reserved_limit && self.seg_of_addr(addr).is_none()
    }
}


/// Owns every segment, pool and root a tracer operates over, the trace-slot
/// table, and the shield/location-dependency collaborators.
pub struct Arena {
    config: Config,

    store: SegmentStore,
    roots: Vec<Box<dyn Root>>,

    shield: Box<dyn Shield>,
    ld: Box<dyn LocationDependency>,

    busy_traces: TraceSet,
    flipped_traces: TraceSet,
    traces: Vec<Option<Trace>>,
}


impl Arena {
    pub fn new(config: Config, shield: Box<dyn Shield>, ld: Box<dyn LocationDependency>) -> Arena {
        Arena {
            config,
            store: SegmentStore::new(),
            roots: Vec::new(),
            shield,
            ld,
            busy_traces: TraceSet::EMPTY,
            flipped_traces: TraceSet::EMPTY,
            traces: vec![None; crate::constants::TRACE_MAX],
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Declares `[base, limit)` as address space this arena manages, so
    /// that an address in that range but outside every segment is
    /// "reserved but unallocated" for `is_reserved_addr`.
    pub fn set_reserved_range(&mut self, base: usize, limit: usize) {
        self.store.reserved_base = base;
        self.store.reserved_limit = limit;
    }

    pub fn add_pool(&mut self, pool: Box<dyn Pool>) -> PoolId {
        self.store.pools.push(pool);
        self.store.pools.len() - 1
    }

    pub fn add_root(&mut self, root: Box<dyn Root>) -> RootId {
        self.roots.push(root);
        self.roots.len() - 1
    }

    pub fn add_segment(&mut self, base: usize, limit: usize, pool: PoolId, rank_set: RankSet) -> SegId {
        let id = self.store.segments.len();
        self.store.segments.push(Segment::new(id, base, limit, pool, rank_set));
        id
    }

    pub fn seg(&self, id: SegId) -> &Segment {
        self.store.seg(id)
    }

    pub fn pool(&self, id: PoolId) -> &dyn Pool {
        self.store.pool(id)
    }

    pub fn seg_of_addr(&self, addr: usize) -> Option<SegId> {
        self.store.seg_of_addr(addr)
    }

    pub fn is_reserved_addr(&self, addr: usize) -> bool {
        self.store.is_reserved_addr(addr)
    }

    pub fn trace(&self, ti: TraceId) -> &Trace {
        self.traces[ti].as_ref().expect("no trace in that slot")
    }

    fn trace_mut(&mut self, ti: TraceId) -> &mut Trace {
        self.traces[ti].as_mut().expect("no trace in that slot")
    }

    pub fn busy_traces(&self) -> TraceSet {
        self.busy_traces
    }

    pub fn flipped_traces(&self) -> TraceSet {
        self.flipped_traces
    }

    /// Claim a free trace slot. Never touches the heap: slot storage is
    /// embedded in the arena so a collection can always be started, even
    /// under memory exhaustion.
    pub fn create_trace(&mut self) -> Res<TraceId> {
        for ti in 0..self.traces.len() {
            if !self.busy_traces.is_member(ti) {
                self.traces[ti] = Some(Trace::new(ti));
                self.busy_traces = self.busy_traces.add(ti);
                debug!("trace {} created", ti);
                return Ok(ti);
            }
        }
        Err(crate::error::Error::Limit)
    }

    pub fn destroy_trace(&mut self, ti: TraceId) {
        assert_eq!(self.trace(ti).state(), TraceState::Finished, "destroy requires a finished trace");
        self.traces[ti] = None;
        self.busy_traces = self.busy_traces.del(ti);
        self.flipped_traces = self.flipped_traces.del(ti);
        debug!("trace {} destroyed", ti);
    }

    /// Offer one segment to a trace as a candidate for condemnation.
    /// Precondition: `seg` is not already white for `ti`.
    pub fn add_white(&mut self, ti: TraceId, seg_id: SegId) -> Res {
        let store = &self.store;
        assert!(!store.seg(seg_id).white().is_member(ti), "segment already white for this trace");

        let pool_id = store.seg(seg_id).pool();
        store.pool(pool_id).whiten(ti, store.seg(seg_id))?;

        if !store.seg(seg_id).white().is_member(ti) {
            // the pool declined; nothing else changes.
            return Ok(());
        }

        let zone_shift = self.config.zone_shift;
        let seg_refs = RefSet::of_range(store.seg(seg_id).base(), store.seg(seg_id).limit(), zone_shift);
        let seg_size = store.seg(seg_id).size();
        let moving = store.pool(pool_id).attrs().contains(PoolAttr::MOVING);

        let trace = self.trace_mut(ti);
        trace.set_white(trace.white().union(seg_refs));
        trace.add_condemned(seg_size);
        if moving {
            trace.set_may_move(trace.may_move().union(seg_refs));
        }

        Ok(())
    }

    /// Select every whole segment of a GC pool whose address range falls
    /// entirely within `condemned_set` and offer each to the trace.
    pub fn condemn_ref_set(&mut self, ti: TraceId, condemned_set: RefSet) -> Res {
        assert_eq!(self.trace(ti).state(), TraceState::Init);
        assert!(self.trace(ti).white().is_empty());
        assert!(!condemned_set.is_empty(), "condemn requires a nonempty zone set");

        let zone_shift = self.config.zone_shift;
        let store = &self.store;
        let candidates: Vec<SegId> = store.segments()
            .filter(|seg| store.pool(seg.pool()).attrs().contains(PoolAttr::GC))
            .filter(|seg| RefSet::of_range(seg.base(), seg.limit(), zone_shift).is_subset(condemned_set))
            .map(|seg| seg.id())
            .collect();

        for seg_id in candidates {
            self.add_white(ti, seg_id)?;
        }

        debug_assert!(self.trace(ti).white().is_subset(condemned_set));
        Ok(())
    }

    /// Compute the grey set and work rate, then flip. If nothing was
    /// condemned the trace finishes immediately.
    pub fn start(&mut self, ti: TraceId) -> Res {
        assert_eq!(self.trace(ti).state(), TraceState::Init);

        if self.trace(ti).white().is_empty() {
            let trace = self.trace_mut(ti);
            trace.set_state(TraceState::Finished);
            trace.set_rate(1);
            self.flipped_traces = self.flipped_traces.add(ti);
            debug!("trace {} started with nothing condemned, finished immediately", ti);
            return Ok(());
        }

        let white = self.trace(ti).white();

        let seg_ids: Vec<SegId> = self.store.segments().map(|s| s.id()).collect();
        for seg_id in seg_ids {
            if self.seg(seg_id).rank_set().is_empty() {
                continue;
            }
            let pool_id = self.seg(seg_id).pool();
            assert!(self.pool(pool_id).attrs().contains(PoolAttr::SCAN), "ranked segment in a non-scanning pool");

            if self.seg(seg_id).summary().intersects(white) {
                let seg_size = self.seg(seg_id).size();
                self.pool(pool_id).grey(ti, self.seg(seg_id));
                if self.seg(seg_id).grey().is_member(ti) {
                    self.trace_mut(ti).add_foundation(seg_size);
                }
            }
        }

        for root_idx in 0..self.roots.len() {
            if self.roots[root_idx].summary().intersects(white) {
                self.roots[root_idx].grey(ti);
            }
        }

        let foundation = self.trace(ti).foundation() as u128;
        let condemned = self.trace(ti).condemned() as u128;
        let numerator = (foundation + condemned / 2) * self.config.arena_poll_max as u128;
        let denominator = self.config.bytes_scanned_per_step as u128 * self.config.poll_allocation_bytes as u128;
        let rate = 1 + ceil_div(numerator, denominator);
        self.trace_mut(ti).set_rate(rate as usize);

        self.trace_mut(ti).set_state(TraceState::Unflipped);
        self.flip(ti)
    }

    /// Suspend the mutator, compute the grey set, install the read barrier
    /// on every newly-grey segment, and resume. Only called from `start`:
    /// this core flips every trace at start instead of deferring it.
    fn flip(&mut self, ti: TraceId) -> Res {
        self.shield.suspend();
        let result = self.flip_body(ti);
        if result.is_ok() {
            self.trace_mut(ti).set_state(TraceState::Flipped);
            self.flipped_traces = self.flipped_traces.add(ti);
        }
        self.shield.resume();
        result
    }

    fn flip_body(&mut self, ti: TraceId) -> Res {
        for pool in &self.store.pools {
            pool.flush_buffers();
        }

        let may_move = self.trace(ti).may_move();
        if !may_move.is_empty() {
            self.ld.age(may_move);
        }

        let white = self.trace(ti).white();
        let zone_shift = self.config.zone_shift;
        let emergency = self.trace(ti).is_emergency();

        for rank in Rank::iter() {
            let mut ss = ScanState::begin(&self.store, TraceSet::single(ti), rank, white, zone_shift, emergency);

            for root_idx in 0..self.roots.len() {
                if self.roots[root_idx].rank() != rank {
                    continue;
                }
                ss.reset_summary();
                self.roots[root_idx].scan(&mut ss)?;
                // `self.trace_mut(ti)` would borrow all of `self` and
                // conflict with `ss`'s live borrow of `self.store`; project
                // into the `traces` field directly instead.
                self.traces[ti].as_mut().expect("no trace in that slot").stats_mut().bump_root_scan();
            }

            let local = ss.finish();
            self.trace_mut(ti).stats_mut().merge(&local);
        }

        for rank in Rank::iter() {
            for seg in self.store.segments() {
                if !seg.rank_set().is_member(rank) {
                    continue;
                }
                let grey = seg.grey();
                // `flipped_traces` never yet contains `ti` here; this also
                // reads correctly once a future extension flips several
                // traces without resetting it in between.
                if grey.is_member(ti) && !grey.intersects(self.flipped_traces) {
                    self.shield.raise(seg, Access::READ);
                }
            }
        }

        Ok(())
    }

    /// Pick the lowest rank with any grey segment for `ti`. Visits
    /// segments in declaration order within a rank; fairness across equal
    /// ranks is not required.
    fn find_grey(&self, ti: TraceId) -> Option<(Rank, SegId)> {
        for rank in Rank::iter() {
            for seg in self.store.segments() {
                if seg.rank_set().is_member(rank) && seg.grey().is_member(ti) {
                    return Some((rank, seg.id()));
                }
            }
        }
        None
    }

    /// Remove greyness from one segment for every trace in `ts`.
    fn do_scan(&mut self, ts: TraceSet, rank: Rank, seg_id: SegId) -> Res {
        assert!(ts.intersects(self.seg(seg_id).grey()), "scan called on a segment not grey for any trace in ts");

        let mut white = RefSet::EMPTY;
        for ti in ts.iter() {
            white = white.union(self.trace(ti).white());
        }

        if !self.seg(seg_id).summary().intersects(white) {
            let pool_id = self.seg(seg_id).pool();
            self.pool(pool_id).blacken(ts, self.seg(seg_id));

            let grey = self.seg(seg_id).grey();
            self.seg(seg_id).set_grey(grey.diff(ts));
            return Ok(());
        }

        let zone_shift = self.config.zone_shift;
        let emergency = ts.iter().any(|ti| self.trace(ti).is_emergency());
        let mut ss = ScanState::begin(&self.store, ts, rank, white, zone_shift, emergency);

        self.shield.expose(self.store.seg(seg_id));

        let pool_id = self.seg(seg_id).pool();
        let scan_result = self.pool(pool_id).scan(&mut ss, self.seg(seg_id));

        self.shield.cover(self.store.seg(seg_id));

        debug_assert!(ss.unfixed_summary().is_subset(self.seg(seg_id).summary()));

        let res = match scan_result {
            Ok(was_total) => {
                let seg_summary = self.seg(seg_id).summary();
                let new_summary = if was_total { ss.summary() } else { seg_summary.union(ss.summary()) };
                self.seg(seg_id).set_summary(new_summary);

                let seg_size = self.seg(seg_id).size();
                let local = ss.finish();
                for ti in ts.iter() {
                    let stats = self.trace_mut(ti).stats_mut();
                    stats.bump_seg_scan(seg_size);
                    stats.merge(&local);
                }

                Ok(())
            }
            Err(e) => {
                // Partial: widen the summary conservatively, but keep no
                // counters from this attempt -- the segment stays grey and
                // will be rescanned from the start, so only the eventually
                // completing attempt's counts should be retained.
                let seg_summary = self.seg(seg_id).summary();
                self.seg(seg_id).set_summary(seg_summary.union(ss.summary()));
                trace!("partial scan of segment {}: {:?}", seg_id, e);
                Err(e)
            }
        };

        if res.is_ok() {
            let grey = self.seg(seg_id).grey();
            self.seg(seg_id).set_grey(grey.diff(ts));
        }

        res
    }

    fn do_reclaim(&mut self, ti: TraceId) {
        assert_eq!(self.trace(ti).state(), TraceState::Reclaim);

        let seg_ids: Vec<SegId> = self.store.segments().map(|s| s.id()).collect();
        for seg_id in seg_ids {
            if !self.seg(seg_id).white().is_member(ti) {
                continue;
            }

            let pool_id = self.seg(seg_id).pool();
            assert!(self.pool(pool_id).attrs().contains(PoolAttr::GC), "white segment in a non-GC pool");

            let seg_size = self.seg(seg_id).size();
            self.trace_mut(ti).stats_mut().reclaim_count += 1;

            self.pool(pool_id).reclaim(ti, self.seg(seg_id));

            debug_assert!(!self.seg(seg_id).white().is_member(ti), "pool left a reclaimed segment white");
            self.trace_mut(ti).stats_mut().reclaim_size += seg_size;
        }

        self.trace_mut(ti).set_state(TraceState::Finished);
        debug!("trace {} reclaimed, now finished", ti);
    }

    /// Advance `ti` by exactly one phase: scan one grey segment, or
    /// reclaim the whole arena, or do nothing if INIT/FINISHED. Only
    /// `Memory`/`Resource` failures are returned; anything else is a
    /// programming error.
    pub fn step(&mut self, ti: TraceId) -> Res {
        match self.trace(ti).state() {
            TraceState::Init | TraceState::Finished => Ok(()),
            TraceState::Unflipped => unreachable!("start already flips every trace in this core"),
            TraceState::Flipped => match self.find_grey(ti) {
                Some((rank, seg_id)) => self.do_scan(TraceSet::single(ti), rank, seg_id),
                None => {
                    self.trace_mut(ti).set_state(TraceState::Reclaim);
                    Ok(())
                }
            },
            TraceState::Reclaim => {
                self.do_reclaim(ti);
                Ok(())
            }
        }
    }

    /// Wrap `step`: on failure, escalate to emergency mode and drive the
    /// trace to completion. Never fails itself.
    pub fn poll(&mut self, ti: TraceId) {
        if self.step(ti).is_err() {
            self.expedite(ti);
        }
    }

    /// Switch `ti` into emergency mode (subsequent `ScanState`s dispatch to
    /// `Pool::fix_emergency`, which must never fail) and drive it to
    /// FINISHED.
    pub fn expedite(&mut self, ti: TraceId) {
        assert_ne!(self.trace(ti).state(), TraceState::Init, "expedite from INIT would not make progress");

        self.trace_mut(ti).set_emergency(true);
        warn!("trace {} entering emergency mode", ti);

        while self.trace(ti).state() != TraceState::Finished {
            if let Err(e) = self.step(ti) {
                panic!("emergency step failed, fix_emergency must not fail: {:?}", e);
            }
        }
    }

    /// Handle a read or write barrier fault on `seg_id`. Never fails: a
    /// read fault that errors escalates every busy trace to emergency and
    /// retries once, which must succeed.
    pub fn access(&mut self, seg_id: SegId, mode: Access) -> Res {
        if mode.contains(Access::READ) {
            assert!(
                self.seg(seg_id).grey().intersects(self.flipped_traces),
                "read fault on a segment not grey for any flipped trace"
            );

            let busy = self.busy_traces;
            if self.do_scan(busy, Rank::Exact, seg_id).is_err() {
                for ti in busy.iter() {
                    self.trace_mut(ti).set_emergency(true);
                }
                let retry = self.do_scan(busy, Rank::Exact, seg_id);
                assert!(retry.is_ok(), "emergency retry of a read-fault scan must succeed");
            }

            debug_assert!(!self.seg(seg_id).grey().intersects(self.flipped_traces));

            for ti in busy.iter() {
                self.trace_mut(ti).stats_mut().fault_count += 1;
            }
        }

        if mode.contains(Access::WRITE) {
            debug_assert!(self.seg(seg_id).summary() != RefSet::UNIV, "write fault on an already-universal summary");
            self.seg(seg_id).set_summary(RefSet::UNIV);
        }

        let current = self.seg(seg_id).shield_mode();
        self.seg(seg_id).set_shield_mode(current - mode);

        Ok(())
    }
}


/// Ceiling division for non-negative operands; `denominator` must be > 0.
fn ceil_div(numerator: u128, denominator: u128) -> u128 {
    (numerator + denominator - 1) / denominator
}
