//! Error taxonomy for the tracer.
//!
//! Only `Limit`, `Memory` and `Resource` are ever returned from the public
//! API. Logic/contract violations are programming errors and are raised as
//! assertion failures, never as an `Error` value.


use thiserror::Error;


/// Errors the tracer can report to its caller.
#[derive(Debug, Error, Copy, Clone, Eq, PartialEq)]
pub enum Error {
    /// `Arena::create_trace` found no free trace slot.
    #[error("no free trace slot available")]
    Limit,

    /// A pool reported that it could not satisfy a request because the heap
    /// is out of memory.
    #[error("out of memory during collection")]
    Memory,

    /// A pool reported a non-memory resource exhaustion (e.g. a fixed-size
    /// side table was full).
    #[error("pool resource exhausted during collection")]
    Resource,
}

/// Result alias used throughout the tracer.
pub type Res<T = ()> = Result<T, Error>;
