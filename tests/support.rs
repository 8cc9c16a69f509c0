//! Mock Pool/Root/Shield/LocationDependency used by the integration tests
//! in this directory, standing in for the external collaborators a real
//! embedder would supply.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gc_tracer::{
    Access, Pool, PoolAttr, Rank, RefSet, Res, Root, ScanState, Segment, Shield, TraceId, TraceSet,
};

pub const ZONE_SHIFT: u32 = 12;

#[derive(Clone)]
pub struct FaultLog(Rc<RefCell<Vec<(usize, Access)>>>);

impl FaultLog {
    pub fn new() -> FaultLog {
        FaultLog(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn push(&self, seg_base: usize, mask: Access) {
        self.0.borrow_mut().push((seg_base, mask));
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

/// One heap object: a fixed-size slot with at most one outgoing reference.
pub struct Object {
    pub addr: usize,
    pub refers_to: Cell<Option<usize>>,
}

/// A simple mark-sweep pool: objects are whitened wholesale with their
/// segment, fixed by flipping a liveness flag, and reclaimed by dropping
/// anything that was never fixed.
pub struct MockPool {
    objects: RefCell<Vec<Object>>,
    live: RefCell<Vec<usize>>,
    /// When set, `scan` returns this error on its first call and clears it
    /// -- used to exercise the partial-scan/emergency-retry path.
    pub fail_once: Cell<Option<gc_tracer::Error>>,
}

impl MockPool {
    pub fn new() -> MockPool {
        MockPool { objects: RefCell::new(Vec::new()), live: RefCell::new(Vec::new()), fail_once: Cell::new(None) }
    }

    pub fn alloc(&self, addr: usize) {
        self.objects.borrow_mut().push(Object { addr, refers_to: Cell::new(None) });
        self.live.borrow_mut().push(addr);
    }

    pub fn link(&self, from_addr: usize, to_addr: usize) {
        let objects = self.objects.borrow();
        objects.iter().find(|o| o.addr == from_addr).expect("from object exists").refers_to.set(Some(to_addr));
    }

    pub fn is_live(&self, addr: usize) -> bool {
        self.live.borrow().contains(&addr)
    }

    fn mark_live(&self, addr: usize) {
        let mut live = self.live.borrow_mut();
        if !live.contains(&addr) {
            live.push(addr);
        }
    }
}

impl Pool for MockPool {
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
        if let Some(err) = self.fail_once.take() {
            return Err(err);
        }

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
        self.fix(ss, seg, ref_io).expect("mock pool fix_emergency must not fail");
    }

    fn reclaim(&self, trace: TraceId, seg: &Segment) {
        seg.set_white(seg.white().del(trace));
    }
}

/// A root holding a single, possibly-absent reference.
pub struct MockRoot {
    pub rank: Rank,
    pub refers_to: Option<usize>,
}

impl Root for MockRoot {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn summary(&self) -> RefSet {
        match self.refers_to {
            Some(addr) => RefSet::of_addr(addr, ZONE_SHIFT),
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

/// Records suspend/resume/expose/cover/raise calls instead of acting on a
/// real mutator.
pub struct MockShield {
    pub log: FaultLog,
}

impl MockShield {
    pub fn new(log: FaultLog) -> MockShield {
        MockShield { log }
    }
}

impl Shield for MockShield {
    fn suspend(&mut self) {}
    fn resume(&mut self) {}
    fn expose(&mut self, _seg: &Segment) {}
    fn cover(&mut self, _seg: &Segment) {}

    fn raise(&mut self, seg: &Segment, mask: Access) {
        self.log.push(seg.base(), mask);
    }
}

pub struct MockLd {
    pub aged: Cell<usize>,
}

impl MockLd {
    pub fn new() -> MockLd {
        MockLd { aged: Cell::new(0) }
    }
}

impl gc_tracer::LocationDependency for MockLd {
    fn age(&mut self, _refs: RefSet) {
        self.aged.set(self.aged.get() + 1);
    }
}
