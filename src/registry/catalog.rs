//! Minigame catalog.
//!
//! The catalog is usually loaded from TOML shipped next to the minigames:
//!
//! ```
//! use duel_sync::registry::MinigameRegistry;
//!
//! let registry = MinigameRegistry::from_toml_str(r#"
//!     [[minigame]]
//!     id = "kalah_duel"
//!     multiplayer_enabled = true
//!
//!     [[minigame]]
//!     id = "tetris_solo"
//! "#).unwrap();
//! assert_eq!(registry.multiplayer(), vec!["kalah_duel".to_string()]);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{DeterministicStream, DuelError, ParticipantId, Result};
use crate::outcome::{MatchResult, Outcome};

/// Wheel entries used when nothing opts into multiplayer.
pub const FALLBACK_MINIGAMES: &[&str] = &["rps_duel"];

/// One catalog entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinigameEntry {
    /// Minigame id (folder name).
    pub id: String,
    /// Opts into networked duels.
    #[serde(default)]
    pub multiplayer_enabled: bool,
}

impl MinigameEntry {
    /// Entry that opts into duels.
    pub fn multiplayer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            multiplayer_enabled: true,
        }
    }

    /// Entry for single-player only.
    pub fn solo(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            multiplayer_enabled: false,
        }
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    minigame: Vec<MinigameEntry>,
}

/// Result fields the host needs, normalized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedResult {
    /// Minigame that produced the result.
    pub minigame: String,
    /// Duel id, when networked.
    pub duel_id: Option<String>,
    /// Winner, when known.
    pub winner: Option<ParticipantId>,
    /// Loser, when known.
    pub loser: Option<ParticipantId>,
    /// Local outcome.
    pub outcome: Outcome,
}

/// Known minigames keyed by id.
#[derive(Clone, Debug, Default)]
pub struct MinigameRegistry {
    entries: BTreeMap<String, MinigameEntry>,
}

impl MinigameRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from TOML (`[[minigame]]` tables).
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(text).map_err(|e| DuelError::Config(e.to_string()))?;
        let mut registry = Self::new();
        for entry in file.minigame {
            if entry.id.is_empty() {
                return Err(DuelError::Config("minigame id must not be empty".into()));
            }
            registry.register(entry);
        }
        Ok(registry)
    }

    /// Add or replace an entry.
    pub fn register(&mut self, entry: MinigameEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Look up an entry.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&MinigameEntry> {
        self.entries.get(id)
    }

    /// The minigame can run as a duel.
    #[must_use]
    pub fn has_hooks(&self, id: &str) -> bool {
        self.entries.get(id).is_some_and(|e| e.multiplayer_enabled)
    }

    /// Sorted ids of duel-capable minigames, or the fallback list.
    #[must_use]
    pub fn multiplayer(&self) -> Vec<String> {
        // BTreeMap iteration is already sorted by id.
        let ids: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.multiplayer_enabled)
            .map(|e| e.id.clone())
            .collect();
        if ids.is_empty() {
            FALLBACK_MINIGAMES.iter().map(|id| (*id).to_string()).collect()
        } else {
            ids
        }
    }

    /// Draw a wheel of distinct duel-capable minigames.
    ///
    /// `candidates` defaults to `multiplayer()`. Candidates without hooks
    /// are dropped; the wheel holds `max(1, slots)` entries clamped to what
    /// remains, and is empty if nothing remains.
    pub fn pick_wheel(
        &self,
        rng: &mut DeterministicStream,
        candidates: Option<&[String]>,
        slots: usize,
    ) -> Vec<String> {
        let pool: Vec<String> = match candidates {
            Some(list) if !list.is_empty() => list.to_vec(),
            _ => self.multiplayer(),
        };
        let pool: Vec<String> = pool.into_iter().filter(|id| self.has_hooks(id)).collect();
        if pool.is_empty() {
            return Vec::new();
        }
        rng.sample(&pool, slots.max(1))
    }

    /// Launch payload for a duel.
    #[must_use]
    pub fn build_match_payload(
        &self,
        id: &str,
        participants: &[ParticipantId],
        seed: u64,
    ) -> serde_json::Value {
        serde_json::json!({
            "minigame": id,
            "participants": participants,
            "seed": seed,
        })
    }

    /// Normalize a handed-off result for the host.
    #[must_use]
    pub fn resolve_result(&self, result: &MatchResult) -> ResolvedResult {
        ResolvedResult {
            minigame: result.minigame.clone(),
            duel_id: result.duel_id.clone(),
            winner: result.winner.clone(),
            loser: result.loser.clone(),
            outcome: result.outcome,
        }
    }
}
