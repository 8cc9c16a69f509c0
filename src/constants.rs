//! Numerous constants used as parameters to tracer behavior


/// Maximum number of simultaneously active traces. The data model (`TraceSet`,
/// the `traces` array on `Arena`) is shaped to support more than one, but this
/// core asserts the limit at 1 in `Arena::create_trace` -- see DESIGN.md.
pub const TRACE_MAX: usize = 1;

/// Approximate bytes scanned per unit of `Trace::rate`. Used only as the
/// default for `Config::bytes_scanned_per_step`.
pub const DEFAULT_BYTES_PER_STEP: usize = 4096;

/// Default "complete the collection within this much mutator allocation"
/// target used by the rate formula in `Arena::start`.
pub const DEFAULT_POLL_ALLOCATION_BYTES: usize = 1 << 20;

/// Default value for `Config::arena_poll_max`, the number of polls the
/// client is expected to make per unit of mutator allocation.
pub const DEFAULT_ARENA_POLL_MAX: usize = 64;

/// Default number of zones (`RefSet` is a bitset over this many zones).
pub const ZONE_COUNT: u32 = 64;

/// Default zone-shift: log2 of the address-space partition size a single
/// `RefSet` bit covers.
pub const DEFAULT_ZONE_SHIFT: u32 = 20;
