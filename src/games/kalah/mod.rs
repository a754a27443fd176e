//! Kalah (Mancala) with six pits and four seeds per pit.

pub mod game;

pub use game::{Kalah, KalahAction, KalahState, PITS, SEEDS};
