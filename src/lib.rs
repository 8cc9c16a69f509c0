//! Core of an incremental tri-color mark-and-sweep garbage collector: the
//! tracer that condemns a set of objects, finds survivors by transitive
//! reachability, and reclaims whatever is left unreached.
//!
//! The tracer drives several external collaborators it does not itself
//! implement -- [`pool::Pool`], [`root::Root`], [`shield::Shield`] and
//! [`ld::LocationDependency`] -- supplied by the embedder as trait objects
//! when segments, pools and roots are registered with an [`arena::Arena`].
//!
//! A typical session: `Arena::create_trace` → `Arena::condemn_ref_set` →
//! `Arena::start` (which flips immediately), then repeated `Arena::poll`
//! until the trace reaches [`trace::TraceState::Finished`], then
//! `Arena::destroy_trace`. Barrier faults from the mutator enter through
//! `Arena::access`.

mod arena;
mod config;
mod constants;
mod error;
mod ld;
mod pool;
mod rank;
mod refset;
mod root;
mod scanstate;
mod segment;
mod shield;
mod statistics;
mod trace;
mod traceset;

pub use arena::{Arena, RootId};
pub use config::Config;
pub use error::{Error, Res};
pub use ld::LocationDependency;
pub use pool::{Pool, PoolAttr};
pub use rank::{Rank, RankSet, ALL_RANKS, RANK_COUNT};
pub use refset::RefSet;
pub use root::Root;
pub use scanstate::ScanState;
pub use segment::{Access, PoolId, SegId, Segment};
pub use shield::Shield;
pub use statistics::TraceStats;
pub use trace::{Trace, TraceState};
pub use traceset::{TraceId, TraceSet};

pub use constants::TRACE_MAX;
