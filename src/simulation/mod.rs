//! Simulation contract consumed by the duel core.
//!
//! Each minigame provides a thin adapter implementing
//! `pack_state / apply_state / legal_actions / apply_action`; the duel core
//! owns everything else (turns, snapshots, relay, outcome).

pub mod contract;

pub use contract::{ActionOutcome, ContinuousField, Simulation, Terminal};
