//! Tracer configuration.
//!
//! The rate-formula constants are exposed here rather than hardcoded as
//! literals in `Arena::start`, since a client tuning collection pacing
//! needs to adjust them without touching the formula itself.


use crate::constants::{DEFAULT_ARENA_POLL_MAX, DEFAULT_BYTES_PER_STEP, DEFAULT_POLL_ALLOCATION_BYTES,
                        DEFAULT_ZONE_SHIFT};


/// Tunable parameters for one `Arena`.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    /// log2 of the address range a single `RefSet` zone bit covers.
    pub zone_shift: u32,

    /// Polls the client is expected to make per `poll_allocation_bytes` of
    /// mutator allocation. Used by the `Trace::rate` formula.
    pub arena_poll_max: usize,

    /// Approximate bytes scanned per unit of `Trace::rate`.
    pub bytes_scanned_per_step: usize,

    /// Target amount of mutator allocation within which a collection should
    /// complete.
    pub poll_allocation_bytes: usize,
}


impl Default for Config {
    fn default() -> Config {
        Config {
            zone_shift: DEFAULT_ZONE_SHIFT,
            arena_poll_max: DEFAULT_ARENA_POLL_MAX,
            bytes_scanned_per_step: DEFAULT_BYTES_PER_STEP,
            poll_allocation_bytes: DEFAULT_POLL_ALLOCATION_BYTES,
        }
    }
}
