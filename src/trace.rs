//! Trace: the per-collection control block.
//!
//! Does *not* carry an arena back-reference -- see DESIGN.md. Every
//! operation that needs the arena takes it as an explicit `&mut Arena`
//! parameter instead.


use crate::refset::RefSet;
use crate::statistics::TraceStats;
use crate::traceset::TraceId;


/// A trace's position in its lifecycle.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TraceState {
    Init,
    Unflipped,
    Flipped,
    Reclaim,
    Finished,
}


/// One collection's control block and statistics.
#[derive(Debug)]
pub struct Trace {
    ti: TraceId,
    state: TraceState,

    white: RefSet,
    may_move: RefSet,

    condemned: usize,
    foundation: usize,
    rate: usize,
    emergency: bool,

    stats: TraceStats,
}


impl Trace {
    /// A freshly created trace: INIT state, everything else empty/zero.
    pub(crate) fn new(ti: TraceId) -> Trace {
        Trace {
            ti,
            state: TraceState::Init,
            white: RefSet::EMPTY,
            may_move: RefSet::EMPTY,
            condemned: 0,
            foundation: 0,
            rate: 0,
            emergency: false,
            stats: TraceStats::new(),
        }
    }

    pub fn id(&self) -> TraceId {
        self.ti
    }

    pub fn state(&self) -> TraceState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: TraceState) {
        self.state = state;
    }

    pub fn white(&self) -> RefSet {
        self.white
    }

    pub(crate) fn set_white(&mut self, white: RefSet) {
        self.white = white;
    }

    pub fn may_move(&self) -> RefSet {
        self.may_move
    }

    pub(crate) fn set_may_move(&mut self, may_move: RefSet) {
        self.may_move = may_move;
    }

    pub fn condemned(&self) -> usize {
        self.condemned
    }

    pub(crate) fn add_condemned(&mut self, bytes: usize) {
        self.condemned += bytes;
    }

    pub fn foundation(&self) -> usize {
        self.foundation
    }

    pub(crate) fn add_foundation(&mut self, bytes: usize) {
        self.foundation += bytes;
    }

    pub fn rate(&self) -> usize {
        self.rate
    }

    pub(crate) fn set_rate(&mut self, rate: usize) {
        self.rate = rate.max(1);
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    pub(crate) fn set_emergency(&mut self, emergency: bool) {
        self.emergency = emergency;
    }

    pub fn stats(&self) -> &TraceStats {
        &self.stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut TraceStats {
        &mut self.stats
    }
}
