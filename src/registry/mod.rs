//! Minigame catalog and duel wheel selection.

pub mod catalog;

pub use catalog::{MinigameEntry, MinigameRegistry, ResolvedResult, FALLBACK_MINIGAMES};
