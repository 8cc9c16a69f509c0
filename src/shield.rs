//! Shield: the mechanism that makes segments inaccessible to the mutator,
//! producing synchronous faults handled by `Arena::access`. Out of scope
//! for this crate; only the interface the tracer drives is defined here.


use crate::segment::{Access, Segment};


/// Operations the tracer drives on the mutator shield.
pub trait Shield {
    /// Stop the mutator. Only ever called from inside `Arena::flip`.
    fn suspend(&mut self);

    /// Resume the mutator.
    fn resume(&mut self);

    /// Transiently make `seg` fully accessible, without lifting its
    /// recorded `shield_mode` -- used while a pool walks a segment's
    /// objects during `Scan`.
    fn expose(&mut self, seg: &Segment);

    /// Undo `expose`, restoring `seg`'s recorded `shield_mode`.
    fn cover(&mut self, seg: &Segment);

    /// Install a barrier: mutator accesses matching `mask` on `seg` will
    /// fault into `Arena::access`.
    fn raise(&mut self, seg: &Segment, mask: Access);
}
