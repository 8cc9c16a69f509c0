//! TraceSet: a small-integer bitset over active trace IDs, `[0, TRACE_MAX)`.
//!
//! Kept as its own algebra, distinct from `RefSet`: the two bitsets model
//! different axes (address zones vs. trace identity) and mixing them would
//! blur "which trace" with "which zone".


use crate::constants::TRACE_MAX;


/// Identifies one trace slot in an `Arena`.
pub type TraceId = usize;


/// A bitset over trace IDs.
#[derive(Copy, Clone, Eq, PartialEq, Default, Hash)]
pub struct TraceSet(u32);


impl TraceSet {
    pub const EMPTY: TraceSet = TraceSet(0);

    #[inline]
    pub fn single(ti: TraceId) -> TraceSet {
        debug_assert!(ti < TRACE_MAX);
        TraceSet(1 << ti)
    }

    #[inline]
    pub fn add(self, ti: TraceId) -> TraceSet {
        self.union(TraceSet::single(ti))
    }

    #[inline]
    pub fn del(self, ti: TraceId) -> TraceSet {
        self.diff(TraceSet::single(ti))
    }

    #[inline]
    pub fn is_member(self, ti: TraceId) -> bool {
        self.intersects(TraceSet::single(ti))
    }

    #[inline]
    pub fn union(self, other: TraceSet) -> TraceSet {
        TraceSet(self.0 | other.0)
    }

    #[inline]
    pub fn inter(self, other: TraceSet) -> TraceSet {
        TraceSet(self.0 & other.0)
    }

    #[inline]
    pub fn diff(self, other: TraceSet) -> TraceSet {
        TraceSet(self.0 & !other.0)
    }

    #[inline]
    pub fn is_subset(self, other: TraceSet) -> bool {
        self.diff(other).0 == 0
    }

    #[inline]
    pub fn is_superset(self, other: TraceSet) -> bool {
        other.is_subset(self)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn intersects(self, other: TraceSet) -> bool {
        !self.inter(other).is_empty()
    }

    /// Iterate the member trace IDs, lowest first.
    pub fn iter(self) -> impl Iterator<Item = TraceId> {
        let bits = self.0;
        (0..TRACE_MAX).filter(move |ti| bits & (1 << ti) != 0)
    }
}


impl std::fmt::Debug for TraceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TraceSet({:#b})", self.0)
    }
}
