//! Core duel types: participants, sides, deterministic streams, configuration, errors.
//!
//! Everything here is game-agnostic. Minigames plug in through the
//! `Simulation` contract rather than extending these types.

pub mod side;
pub mod rng;
pub mod config;
pub mod error;

pub use side::{ParticipantId, Side, SideMap};
pub use rng::{seed_of, DeterministicStream, StreamState};
pub use config::{DuelConfig, StartingSide, TurnMode};
pub use error::{DuelError, RejectReason, Result};
