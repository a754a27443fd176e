//! Reference minigame adapters.
//!
//! - `kalah`: 6-pit Kalah, the turn-based adapter used by the integration tests

pub mod kalah;

pub use kalah::{Kalah, KalahAction, KalahState};
