//! Segment: a contiguous managed region owned by one pool, the unit of
//! colouring and shielding.
//!
//! Colour and summary live in `Cell`s rather than plain fields: a scan of
//! one segment routinely needs to flip the grey/white/summary bits of a
//! *different* segment reached through a reference, while the tracer only
//! ever holds shared (`&Segment`) access during a scan. Interior
//! mutability sidesteps the aliasing that exclusive references would
//! otherwise require -- the same reason object metadata is `Cell`-backed
//! in a concurrent tracing collector.


use std::cell::Cell;

use bitflags::bitflags;

use crate::rank::RankSet;
use crate::refset::RefSet;
use crate::traceset::TraceSet;


/// Identifies one segment within an `Arena`.
pub type SegId = usize;

/// Identifies one pool within an `Arena`.
pub type PoolId = usize;


bitflags! {
    /// Shield access mask: which mutator operations currently fault into
    /// `Arena::access`.
    #[derive(Default)]
    pub struct Access: u8 {
        const READ = 0b01;
        const WRITE = 0b10;
    }
}


/// A managed region of address space.
#[derive(Debug)]
pub struct Segment {
    id: SegId,
    base: usize,
    limit: usize,
    pool: PoolId,
    rank_set: RankSet,
    summary: Cell<RefSet>,
    grey: Cell<TraceSet>,
    white: Cell<TraceSet>,
    shield_mode: Cell<Access>,
}


impl Segment {
    pub fn new(id: SegId, base: usize, limit: usize, pool: PoolId, rank_set: RankSet) -> Segment {
        assert!(base < limit, "segment must have nonzero size");
        Segment {
            id,
            base,
            limit,
            pool,
            rank_set,
            summary: Cell::new(RefSet::EMPTY),
            grey: Cell::new(TraceSet::EMPTY),
            white: Cell::new(TraceSet::EMPTY),
            shield_mode: Cell::new(Access::empty()),
        }
    }

    #[inline]
    pub fn id(&self) -> SegId {
        self.id
    }

    #[inline]
    pub fn base(&self) -> usize {
        self.base
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.limit - self.base
    }

    #[inline]
    pub fn pool(&self) -> PoolId {
        self.pool
    }

    #[inline]
    pub fn rank_set(&self) -> RankSet {
        self.rank_set
    }

    #[inline]
    pub fn summary(&self) -> RefSet {
        self.summary.get()
    }

    /// Owned by the tracer; a pool never calls this directly.
    #[inline]
    pub fn set_summary(&self, summary: RefSet) {
        self.summary.set(summary);
    }

    #[inline]
    pub fn grey(&self) -> TraceSet {
        self.grey.get()
    }

    /// Owned by the tracer; a pool never calls this directly.
    #[inline]
    pub fn set_grey(&self, grey: TraceSet) {
        self.grey.set(grey);
    }

    #[inline]
    pub fn white(&self) -> TraceSet {
        self.white.get()
    }

    /// Mutated only by `Pool::whiten` (accept) and `Pool::reclaim` (clear).
    #[inline]
    pub fn set_white(&self, white: TraceSet) {
        self.white.set(white);
    }

    #[inline]
    pub fn shield_mode(&self) -> Access {
        self.shield_mode.get()
    }

    #[inline]
    pub fn set_shield_mode(&self, mode: Access) {
        self.shield_mode.set(mode);
    }

    /// Colour uniqueness invariant: for any trace, at most one of
    /// grey/white holds.
    pub fn colour_is_consistent(&self, ti: crate::traceset::TraceId) -> bool {
        !(self.grey().is_member(ti) && self.white().is_member(ti))
    }
}
