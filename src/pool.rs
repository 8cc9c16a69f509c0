//! Pool: the external collaborator that owns segment contents and object
//! formats. Out of scope for this crate; only the interface the tracer
//! drives is defined here. A concrete pool class (e.g. mark-sweep,
//! copying) lives above this crate and is handed in as a `Box<dyn Pool>`.
//!
//! Every method takes `&self`: `Segment`'s colour and summary are
//! `Cell`-backed, so the tracer only ever needs shared access to drive a
//! pool. A concrete pool that needs its own mutable bookkeeping (object
//! headers, free lists, forwarding tables) reaches for its own interior
//! mutability, the same way `Segment` does here.


use bitflags::bitflags;

use crate::error::Res;
use crate::scanstate::ScanState;
use crate::segment::Segment;
use crate::traceset::{TraceId, TraceSet};


bitflags! {
    /// Attributes a pool class declares about itself.
    #[derive(Default)]
    pub struct PoolAttr: u8 {
        /// Segments in this pool may be condemned and reclaimed.
        const GC = 0b001;
        /// The pool may move (copy) objects during a collection.
        const MOVING = 0b010;
        /// Segments in this pool contain references and must be scanned.
        const SCAN = 0b100;
    }
}


/// Operations the tracer drives on a pool's segments during a collection.
pub trait Pool {
    /// Attributes declared by this pool class.
    fn attrs(&self) -> PoolAttr;

    /// Decide whether to accept `seg` as white for `trace`. On acceptance,
    /// must mark `seg` white for `trace` via `Segment::set_white` before
    /// returning -- `Arena::add_white` checks this post-condition.
    fn whiten(&self, trace: TraceId, seg: &Segment) -> Res;

    /// Mark `seg` grey for `trace` if this pool wants it scanned.
    fn grey(&self, trace: TraceId, seg: &Segment);

    /// Mark `seg` black for every trace in `ts` (no scanning needed: the
    /// segment's summary proved it holds no white references).
    fn blacken(&self, ts: TraceSet, seg: &Segment);

    /// Walk every live object in `seg`, calling `ScanState::fix` on each
    /// reference. Returns whether the whole segment was scanned
    /// (`wasTotal`); `false` or an error means the segment stays grey.
    fn scan(&self, ss: &mut ScanState, seg: &Segment) -> Res<bool>;

    /// Fix a single reference found in a scanned segment, possibly
    /// rewriting `*ref_io` to a forwarded address. May fail with `Memory`
    /// or `Resource`.
    fn fix(&self, ss: &mut ScanState, seg: &Segment, ref_io: &mut usize) -> Res;

    /// As `fix`, but must never fail -- used once a trace has entered
    /// emergency mode.
    fn fix_emergency(&self, ss: &mut ScanState, seg: &Segment, ref_io: &mut usize);

    /// Free (or otherwise un-whiten) `seg`'s storage for `trace`. Must
    /// leave `seg` not-white for `trace` if `seg` still exists afterward.
    fn reclaim(&self, trace: TraceId, seg: &Segment);

    /// Terminate every allocation buffer's current chunk so it joins the
    /// tracked heap. A pool without allocation buffers has nothing to do
    /// here.
    fn flush_buffers(&self) {}
}
