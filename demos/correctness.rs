//! Minimal mark-sweep pool driving the tracer end to end: a handful of
//! fixed-size objects, one inter-object reference, a condemn/start/poll
//! loop, and a check that the unreferenced object got reclaimed.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gc_tracer::{
    Access, Arena, Config, Error, LocationDependency, Pool, PoolAttr, Rank, RankSet, RefSet, Res,
    Root, ScanState, Segment, Shield, TraceId, TraceSet, TraceState,
};

const OBJECT_SIZE: usize = 64;

struct Object {
    addr: usize,
    /// Offset of a single outgoing reference slot within the object, or
    /// `None` if this object holds no reference.
    refers_to: Cell<Option<usize>>,
}

struct MarkSweepPool {
    objects: RefCell<Vec<Object>>,
    live: RefCell<Vec<usize>>,
}

impl MarkSweepPool {
    fn new() -> MarkSweepPool {
        MarkSweepPool { objects: RefCell::new(Vec::new()), live: RefCell::new(Vec::new()) }
    }

    fn alloc(&self, addr: usize) {
        self.objects.borrow_mut().push(Object { addr, refers_to: Cell::new(None) });
        self.live.borrow_mut().push(addr);
    }

    fn link(&self, from_addr: usize, to_addr: usize) {
        let objects = self.objects.borrow();
        let from = objects.iter().find(|o| o.addr == from_addr).expect("from object must exist");
        from.refers_to.set(Some(to_addr));
    }

    fn is_live(&self, addr: usize) -> bool {
        self.live.borrow().contains(&addr)
    }

    fn mark_live(&self, addr: usize) {
        let mut live = self.live.borrow_mut();
        if !live.contains(&addr) {
            live.push(addr);
        }
    }
}

impl Pool for MarkSweepPool {
    fn attrs(&self) -> PoolAttr {
        PoolAttr::GC | PoolAttr::SCAN
    }

    fn whiten(&self, trace: TraceId, seg: &Segment) -> Res {
        seg.set_white(seg.white().add(trace));
        let objects = self.objects.borrow();
        let addrs: Vec<usize> =
            objects.iter().filter(|o| o.addr >= seg.base() && o.addr < seg.limit()).map(|o| o.addr).collect();
        drop(objects);
        self.live.borrow_mut().retain(|a| !addrs.contains(a));
        Ok(())
    }

    fn grey(&self, trace: TraceId, seg: &Segment) {
        seg.set_grey(seg.grey().add(trace));
    }

    fn blacken(&self, ts: TraceSet, seg: &Segment) {
        seg.set_grey(seg.grey().diff(ts));
    }

    fn scan(&self, ss: &mut ScanState, seg: &Segment) -> Res<bool> {
        let objects = self.objects.borrow();
        for obj in objects.iter().filter(|o| o.addr >= seg.base() && o.addr < seg.limit()) {
            if let Some(mut target) = obj.refers_to.get() {
                ss.note_unfixed(target);
                ss.fix(&mut target)?;
                obj.refers_to.set(Some(target));
            }
        }
        Ok(true)
    }

    fn fix(&self, _ss: &mut ScanState, _seg: &Segment, ref_io: &mut usize) -> Res {
        self.mark_live(*ref_io);
        Ok(())
    }

    fn fix_emergency(&self, ss: &mut ScanState, seg: &Segment, ref_io: &mut usize) {
        self.fix(ss, seg, ref_io).expect("mark-sweep fix never fails");
    }

    fn reclaim(&self, trace: TraceId, seg: &Segment) {
        seg.set_white(seg.white().del(trace));
    }
}

struct StackRoot {
    refers_to: Option<usize>,
}

impl Root for StackRoot {
    fn rank(&self) -> Rank {
        Rank::Exact
    }

    fn summary(&self) -> RefSet {
        match self.refers_to {
            Some(addr) => RefSet::of_addr(addr, 20),
            None => RefSet::EMPTY,
        }
    }

    fn grey(&mut self, _trace: TraceId) {}

    fn scan(&mut self, ss: &mut ScanState) -> Res {
        if let Some(mut addr) = self.refers_to {
            ss.note_unfixed(addr);
            ss.fix(&mut addr)?;
            self.refers_to = Some(addr);
        }
        Ok(())
    }
}

/// No real mutator to suspend here; every call is a no-op.
struct NullShield;

impl Shield for NullShield {
    fn suspend(&mut self) {}
    fn resume(&mut self) {}
    fn expose(&mut self, _seg: &Segment) {}
    fn cover(&mut self, _seg: &Segment) {}
    fn raise(&mut self, _seg: &Segment, _mask: Access) {}
}

struct NullLd;

impl LocationDependency for NullLd {
    fn age(&mut self, _refs: RefSet) {}
}

/// Forwards to a shared `MarkSweepPool` so `main` can still query liveness
/// after handing a `Box<dyn Pool>` to the arena.
struct PoolHandle(Rc<MarkSweepPool>);

impl Pool for PoolHandle {
    fn attrs(&self) -> PoolAttr {
        self.0.attrs()
    }
    fn whiten(&self, trace: TraceId, seg: &Segment) -> Res {
        self.0.whiten(trace, seg)
    }
    fn grey(&self, trace: TraceId, seg: &Segment) {
        self.0.grey(trace, seg)
    }
    fn blacken(&self, ts: TraceSet, seg: &Segment) {
        self.0.blacken(ts, seg)
    }
    fn scan(&self, ss: &mut ScanState, seg: &Segment) -> Res<bool> {
        self.0.scan(ss, seg)
    }
    fn fix(&self, ss: &mut ScanState, seg: &Segment, ref_io: &mut usize) -> Res {
        self.0.fix(ss, seg, ref_io)
    }
    fn fix_emergency(&self, ss: &mut ScanState, seg: &Segment, ref_io: &mut usize) {
        self.0.fix_emergency(ss, seg, ref_io)
    }
    fn reclaim(&self, trace: TraceId, seg: &Segment) {
        self.0.reclaim(trace, seg)
    }
}

fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    let root_addr = 0x1000;
    let linked_addr = root_addr + OBJECT_SIZE;
    let garbage_addr = linked_addr + OBJECT_SIZE;

    let pool = Rc::new(MarkSweepPool::new());
    pool.alloc(root_addr);
    pool.alloc(linked_addr);
    pool.alloc(garbage_addr);
    pool.link(root_addr, linked_addr);

    let mut arena = Arena::new(Config::default(), Box::new(NullShield), Box::new(NullLd));
    arena.set_reserved_range(0x1000, 0x2000);
    let pool_id = arena.add_pool(Box::new(PoolHandle(pool.clone())));
    arena.add_segment(0x1000, 0x2000, pool_id, RankSet::single(Rank::Exact));
    arena.add_root(Box::new(StackRoot { refers_to: Some(root_addr) }));

    let ti = arena.create_trace()?;
    arena.condemn_ref_set(ti, RefSet::of_addr(root_addr, 20))?;
    arena.start(ti)?;

    while arena.trace(ti).state() != TraceState::Finished {
        arena.poll(ti);
    }

    let stats = arena.trace(ti).stats();
    println!(
        "trace {} finished: {} segments reclaimed, {} references fixed",
        ti, stats.reclaim_count, stats.fix_ref_count
    );
    assert!(pool.is_live(root_addr), "root-reachable object must survive");
    assert!(pool.is_live(linked_addr), "object reached through a reference must survive");
    assert!(!pool.is_live(garbage_addr), "unreferenced object must be reclaimed");
    arena.destroy_trace(ti);

    Ok(())
}
