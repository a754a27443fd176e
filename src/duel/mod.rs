//! Duel engine.
//!
//! `DuelEngine` wires the session, transport link, turn arbiter, relay,
//! snapshot broadcaster and finalizer around one `Simulation`. Callers
//! drive it with `update(dt)` once per frame and feed local input through
//! `submit_local`.

pub mod engine;

pub use engine::{DuelEngine, DuelEvent, EngineStats};
