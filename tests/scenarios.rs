//! Full-lifecycle integration tests against the mock collaborators in
//! `support.rs`, covering the concrete scenarios the design was checked
//! against: an empty condemn set, a fully reachable heap, unreferenced
//! garbage, and a scan that fails once before completing under emergency.

mod support;

use std::rc::Rc;

use gc_tracer::{Arena, Config, Error, Rank, RankSet, RefSet, TraceState};
use support::{FaultLog, MockLd, MockPool, MockRoot, MockShield, ZONE_SHIFT};

fn new_arena(pool: Rc<MockPool>, shield_log: FaultLog) -> (Arena, gc_tracer::PoolId) {
    struct PoolHandle(Rc<MockPool>);
    impl gc_tracer::Pool for PoolHandle {
        fn attrs(&self) -> gc_tracer::PoolAttr {
            self.0.attrs()
        }
        fn whiten(&self, trace: gc_tracer::TraceId, seg: &gc_tracer::Segment) -> gc_tracer::Res {
            self.0.whiten(trace, seg)
        }
        fn grey(&self, trace: gc_tracer::TraceId, seg: &gc_tracer::Segment) {
            self.0.grey(trace, seg)
        }
        fn blacken(&self, ts: gc_tracer::TraceSet, seg: &gc_tracer::Segment) {
            self.0.blacken(ts, seg)
        }
        fn scan(&self, ss: &mut gc_tracer::ScanState, seg: &gc_tracer::Segment) -> gc_tracer::Res<bool> {
            self.0.scan(ss, seg)
        }
        fn fix(
            &self,
            ss: &mut gc_tracer::ScanState,
            seg: &gc_tracer::Segment,
            ref_io: &mut usize,
        ) -> gc_tracer::Res {
            self.0.fix(ss, seg, ref_io)
        }
        fn fix_emergency(&self, ss: &mut gc_tracer::ScanState, seg: &gc_tracer::Segment, ref_io: &mut usize) {
            self.0.fix_emergency(ss, seg, ref_io)
        }
        fn reclaim(&self, trace: gc_tracer::TraceId, seg: &gc_tracer::Segment) {
            self.0.reclaim(trace, seg)
        }
    }

    let config = Config { zone_shift: ZONE_SHIFT, ..Config::default() };
    let mut arena = Arena::new(config, Box::new(MockShield::new(shield_log)), Box::new(MockLd::new()));
    arena.set_reserved_range(0, 0x1000);
    let pool_id = arena.add_pool(Box::new(PoolHandle(pool)));
    // Sized to exactly one zone (1 << ZONE_SHIFT) so `condemn_ref_set` with a
    // single-zone `RefSet` always condemns this whole segment.
    arena.add_segment(0, 0x1000, pool_id, RankSet::single(Rank::Exact));
    (arena, pool_id)
}

fn run_to_finish(arena: &mut Arena, ti: gc_tracer::TraceId) {
    let mut iterations = 0;
    while arena.trace(ti).state() != TraceState::Finished {
        arena.poll(ti);
        iterations += 1;
        assert!(iterations < 10_000, "trace did not converge");
    }
}

#[test]
fn empty_condemn_set_finishes_without_scanning() {
    let pool = Rc::new(MockPool::new());
    pool.alloc(0x100);
    let (mut arena, _pool_id) = new_arena(pool.clone(), FaultLog::new());

    let ti = arena.create_trace().unwrap();
    // Condemn a zone with no segments in it: start must still succeed and
    // finish immediately rather than hang waiting for a grey segment.
    arena.condemn_ref_set(ti, RefSet::of_addr(0x9000_0000, ZONE_SHIFT)).unwrap();
    arena.start(ti).unwrap();

    assert_eq!(arena.trace(ti).state(), TraceState::Finished);
    assert_eq!(arena.trace(ti).stats().reclaim_count, 0);
    arena.destroy_trace(ti);
}

#[test]
fn reachable_object_survives_collection() {
    let pool = Rc::new(MockPool::new());
    pool.alloc(0x100);
    pool.alloc(0x140);
    pool.link(0x100, 0x140);
    let (mut arena, _pool_id) = new_arena(pool.clone(), FaultLog::new());
    arena.add_root(Box::new(MockRoot { rank: Rank::Exact, refers_to: Some(0x100) }));

    let ti = arena.create_trace().unwrap();
    arena.condemn_ref_set(ti, RefSet::of_addr(0x100, ZONE_SHIFT)).unwrap();
    arena.start(ti).unwrap();
    run_to_finish(&mut arena, ti);

    assert!(pool.is_live(0x100));
    assert!(pool.is_live(0x140));
    arena.destroy_trace(ti);
}

#[test]
fn unreferenced_object_is_reclaimed() {
    let pool = Rc::new(MockPool::new());
    pool.alloc(0x100);
    pool.alloc(0x140);
    // no link between them, and no root reaches 0x140
    let (mut arena, _pool_id) = new_arena(pool.clone(), FaultLog::new());
    arena.add_root(Box::new(MockRoot { rank: Rank::Exact, refers_to: Some(0x100) }));

    let ti = arena.create_trace().unwrap();
    arena.condemn_ref_set(ti, RefSet::of_addr(0x100, ZONE_SHIFT)).unwrap();
    arena.start(ti).unwrap();
    run_to_finish(&mut arena, ti);

    assert!(pool.is_live(0x100));
    assert!(!pool.is_live(0x140));
    assert_eq!(arena.trace(ti).stats().reclaim_count, 1);
    arena.destroy_trace(ti);
}

#[test]
fn partial_scan_retries_under_emergency_without_double_counting() {
    let pool = Rc::new(MockPool::new());
    pool.alloc(0x100);
    let (mut arena, _pool_id) = new_arena(pool.clone(), FaultLog::new());
    arena.add_root(Box::new(MockRoot { rank: Rank::Exact, refers_to: Some(0x100) }));

    let ti = arena.create_trace().unwrap();
    arena.condemn_ref_set(ti, RefSet::of_addr(0x100, ZONE_SHIFT)).unwrap();
    arena.start(ti).unwrap();

    pool.fail_once.set(Some(Error::Memory));
    // One failing poll: the segment stays grey, no scan counters retained.
    arena.poll(ti);
    assert_eq!(arena.trace(ti).stats().seg_scan_count, 0);

    run_to_finish(&mut arena, ti);

    assert_eq!(arena.trace(ti).stats().seg_scan_count, 1, "only the completing attempt's scan should be counted");
    assert!(pool.is_live(0x100));
    arena.destroy_trace(ti);
}

#[test]
fn write_fault_widens_summary_to_universal() {
    let pool = Rc::new(MockPool::new());
    pool.alloc(0x100);
    let log = FaultLog::new();
    let (mut arena, _pool_id) = new_arena(pool.clone(), log.clone());

    let ti = arena.create_trace().unwrap();
    arena.condemn_ref_set(ti, RefSet::of_addr(0x100, ZONE_SHIFT)).unwrap();
    arena.start(ti).unwrap();
    run_to_finish(&mut arena, ti);

    let seg = arena.seg(0);
    assert_ne!(seg.summary(), RefSet::UNIV);
    arena.access(0, gc_tracer::Access::WRITE).unwrap();
    assert_eq!(arena.seg(0).summary(), RefSet::UNIV);
    arena.destroy_trace(ti);
}

#[test]
fn trace_slot_is_reusable_after_destroy() {
    let pool = Rc::new(MockPool::new());
    let (mut arena, _pool_id) = new_arena(pool, FaultLog::new());

    let ti = arena.create_trace().unwrap();
    assert!(arena.create_trace().is_err(), "TRACE_MAX is 1, a second concurrent trace must be refused");
    arena.condemn_ref_set(ti, RefSet::of_addr(0x9000_0000, ZONE_SHIFT)).unwrap();
    arena.start(ti).unwrap();
    arena.destroy_trace(ti);

    let ti2 = arena.create_trace().unwrap();
    assert_eq!(ti2, ti, "the freed slot should be reused");
}
