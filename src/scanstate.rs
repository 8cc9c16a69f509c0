//! ScanState: the per-scan ephemeral context. Created on entry to a scan,
//! finished (merged into the owning `Trace`'s counters) on exit. Never
//! shared across scans.


use crate::arena::SegmentStore;
use crate::error::Res;
use crate::rank::Rank;
use crate::refset::RefSet;
use crate::statistics::TraceStats;
use crate::traceset::TraceSet;


/// Per-scan context. Holds a shared reference to the segment/pool storage
/// it dispatches `Fix` against -- see the "ScanState summary law":
/// `summary() == fixed_summary ∪ (unfixed_summary \ white)`.
pub struct ScanState<'a> {
    store: &'a SegmentStore,
    traces: TraceSet,
    rank: Rank,
    white: RefSet,
    unfixed_summary: RefSet,
    fixed_summary: RefSet,
    /// Reserved for future weak/final reference processing (explicitly a
    /// Non-goal here); kept so the field lines up with the usual
    /// ScanState attribute list of a tracing collector.
    was_marked: bool,
    zone_shift: u32,
    /// Fix dispatcher: when set, `fix` calls `Pool::fix_emergency` instead
    /// of `Pool::fix`.
    emergency: bool,
    counters: TraceStats,
}


impl<'a> ScanState<'a> {
    /// Begin a scan. `white` is the union of `white` over every trace in
    /// `traces`.
    pub fn begin(
        store: &'a SegmentStore,
        traces: TraceSet,
        rank: Rank,
        white: RefSet,
        zone_shift: u32,
        emergency: bool,
    ) -> ScanState<'a> {
        ScanState {
            store,
            traces,
            rank,
            white,
            unfixed_summary: RefSet::EMPTY,
            fixed_summary: RefSet::EMPTY,
            was_marked: false,
            zone_shift,
            emergency,
            counters: TraceStats::new(),
        }
    }

    pub fn traces(&self) -> TraceSet {
        self.traces
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn white(&self) -> RefSet {
        self.white
    }

    pub fn zone_shift(&self) -> u32 {
        self.zone_shift
    }

    pub fn unfixed_summary(&self) -> RefSet {
        self.unfixed_summary
    }

    pub fn fixed_summary(&self) -> RefSet {
        self.fixed_summary
    }

    pub fn set_was_marked(&mut self, marked: bool) {
        self.was_marked = marked;
    }

    pub fn was_marked(&self) -> bool {
        self.was_marked
    }

    /// Reset the running summary to empty. Used before each root's scan in
    /// `Arena::flip`.
    pub fn reset_summary(&mut self) {
        self.unfixed_summary = RefSet::EMPTY;
        self.fixed_summary = RefSet::EMPTY;
    }

    /// The ScanState summary law: fixed references, plus unfixed
    /// references minus whatever is white (those are exactly the ones
    /// still pending a `Fix`).
    pub fn summary(&self) -> RefSet {
        self.fixed_summary.union(self.unfixed_summary.diff(self.white))
    }

    /// Called by a `Pool::scan` implementation before it has decided
    /// whether a reference is in a white segment, to keep the unfixed
    /// summary sound even if scanning is later abandoned partway through.
    pub fn note_unfixed(&mut self, addr: usize) {
        self.unfixed_summary = self.unfixed_summary.add_addr(addr, self.zone_shift);
    }

    /// Cheap filter ahead of the full fix path -- modeled as `fix1`/`fix2`
    /// rather than a goto, per the original's `TRACE_FIX1`/`TRACE_FIX2`
    /// macros. Returns `false` for values that plainly cannot be managed
    /// references.
    #[inline]
    fn fix1(&self, ref_: usize) -> bool {
        ref_ != 0
    }

    /// Fix a single reference. `ref_io` may be rewritten by the pool to a
    /// forwarded address.
    pub fn fix(&mut self, ref_io: &mut usize) -> Res {
        self.counters.fix_ref_count += 1;

        if !self.fix1(*ref_io) {
            self.fixed_summary = self.fixed_summary.add_addr(*ref_io, self.zone_shift);
            return Ok(());
        }

        self.fix2(ref_io)?;

        // Regardless of whether the address hit a segment, fold the
        // (possibly rewritten) address into the fixed summary.
        self.fixed_summary = self.fixed_summary.add_addr(*ref_io, self.zone_shift);
        Ok(())
    }

    fn fix2(&mut self, ref_io: &mut usize) -> Res {
        let store = self.store;
        let addr = *ref_io;

        match store.seg_of_addr(addr) {
            Some(seg_id) => {
                self.counters.seg_ref_count += 1;

                let seg = store.seg(seg_id);
                if seg.white().intersects(self.traces) {
                    self.counters.white_seg_ref_count += 1;

                    let pool = store.pool(seg.pool());
                    if self.emergency {
                        pool.fix_emergency(self, seg, ref_io);
                    } else {
                        pool.fix(self, seg, ref_io)?;
                    }
                }
            }
            None => {
                // At EXACT rank or higher a reference either points outside
                // the arena or into an allocated segment, never into
                // reserved-but-unallocated space.
                debug_assert!(
                    self.rank < Rank::Exact || !store.is_reserved_addr(addr),
                    "exact reference into reserved-but-unallocated arena space"
                );
            }
        }

        Ok(())
    }

    /// Finish this scan, returning its accumulated local counters for the
    /// caller to fold into the owning `Trace`'s phase totals.
    pub fn finish(self) -> TraceStats {
        self.counters
    }
}
