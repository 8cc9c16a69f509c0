//! Root: a registered root object scanned at flip. Out of scope for this
//! crate; only the interface the tracer drives against a root is defined
//! here.


use crate::error::Res;
use crate::rank::Rank;
use crate::refset::RefSet;
use crate::scanstate::ScanState;
use crate::traceset::TraceId;


/// Operations the tracer drives on a registered root.
pub trait Root {
    /// The rank of references this root contains.
    fn rank(&self) -> Rank;

    /// A conservative over-approximation of the addresses this root may
    /// reference.
    fn summary(&self) -> RefSet;

    /// Mark this root grey for `trace` (it will be scanned during Flip).
    fn grey(&mut self, trace: TraceId);

    /// Scan this root's references into `ss` via `ScanState::fix`.
    fn scan(&mut self, ss: &mut ScanState) -> Res;
}
