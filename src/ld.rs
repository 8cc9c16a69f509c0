//! Location dependency (LD): notifies dependents when a set of addresses
//! that might move is about to advance. Out of scope for this crate; only
//! the interface the tracer drives is defined here.


use crate::refset::RefSet;


/// Age-stamp notification for addresses that may move.
pub trait LocationDependency {
    /// Called once per flip when `trace.may_move` is non-empty.
    fn age(&mut self, refs: RefSet);
}
