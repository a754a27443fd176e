//! Turn arbiter.
//!
//! Decides whose input is accepted, when the turn passes, and when the
//! deadline fires. Only the authority's arbiter is binding; the other
//! peer's arbiter mirrors snapshots and `turn` notices to gate local input.

pub mod turn;

pub use turn::{Phase, TurnArbiter, TurnChange, TurnState};
