//! Duel configuration.
//!
//! Minigames tune the sync layer to their tempo at launch:
//! - Snapshot cadence (fast for pong, slow for board games)
//! - Per-turn deadline before the authority auto-plays
//! - Interpolation gain for continuous values
//! - Banner delay before the result is handed to the host
//!
//! Durations are milliseconds so a TOML file reads naturally:
//!
//! ```
//! use duel_sync::core::DuelConfig;
//!
//! let config = DuelConfig::from_toml_str(r#"
//!     broadcast_interval_ms = 66
//!     turn_deadline_ms = 12000
//! "#).unwrap();
//! assert_eq!(config.broadcast_interval_ms, 66);
//! assert_eq!(config.result_delay_ms, 2500);
//! ```

use serde::{Deserialize, Serialize};

use super::error::{DuelError, Result};
use super::side::{ParticipantId, Side};

/// Rule deciding who moves first in a round.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartingSide {
    /// Participant 0 (the authority) starts.
    #[default]
    Host,
    /// The lexicographically smallest participant id starts.
    LexicographicFirst,
}

impl StartingSide {
    /// Resolve to a side for the given roster.
    #[must_use]
    pub fn resolve(self, participants: &[ParticipantId]) -> Side {
        match (self, participants) {
            (StartingSide::LexicographicFirst, [first, second, ..]) if second < first => {
                Side::Second
            }
            _ => Side::First,
        }
    }
}

/// How input is gated between the two sides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnMode {
    /// One side holds the turn at a time (board and card games).
    #[default]
    Alternating,
    /// Both sides act whenever input is open (pong, air hockey). No turn
    /// deadline applies.
    Simultaneous,
}

/// Sync-layer configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DuelConfig {
    /// Minimum time between periodic (non-forced) snapshots.
    pub broadcast_interval_ms: u64,

    /// Soft per-turn deadline; `None` disables auto-play.
    pub turn_deadline_ms: Option<u64>,

    /// Pause between a round ending and the next round starting.
    pub round_delay_ms: u64,

    /// Banner time between a decided outcome and the host hand-off.
    pub result_delay_ms: u64,

    /// Finalize as a disconnect after this much silence from the opponent.
    /// `None` waits indefinitely.
    pub silence_timeout_ms: Option<u64>,

    /// Exponential smoothing gain `K` for continuous values.
    pub smoothing_gain: f32,

    /// Extrapolate continuous values with last-known velocity between snapshots.
    pub dead_reckoning: bool,

    /// Attach state and stream checksums to snapshots.
    pub snapshot_checksums: bool,

    /// Who moves first each round.
    pub starting_side: StartingSide,

    /// Alternating turns or simultaneous input.
    pub turn_mode: TurnMode,
}

impl Default for DuelConfig {
    fn default() -> Self {
        Self {
            broadcast_interval_ms: 150,
            turn_deadline_ms: Some(15_000),
            round_delay_ms: 1_500,
            result_delay_ms: 2_500,
            silence_timeout_ms: None,
            smoothing_gain: 8.0,
            dead_reckoning: true,
            snapshot_checksums: true,
            starting_side: StartingSide::Host,
            turn_mode: TurnMode::Alternating,
        }
    }
}

fn secs(ms: u64) -> f32 {
    ms as f32 / 1000.0
}

impl DuelConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| DuelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.broadcast_interval_ms == 0 {
            return Err(DuelError::Config("broadcast_interval_ms must be positive".into()));
        }
        if self.turn_deadline_ms == Some(0) {
            return Err(DuelError::Config("turn_deadline_ms must be positive when set".into()));
        }
        if !self.smoothing_gain.is_finite() || self.smoothing_gain < 0.0 {
            return Err(DuelError::Config(format!(
                "smoothing_gain must be a non-negative number, got {}",
                self.smoothing_gain
            )));
        }
        Ok(())
    }

    /// Set the snapshot interval.
    #[must_use]
    pub fn with_broadcast_interval_ms(mut self, ms: u64) -> Self {
        self.broadcast_interval_ms = ms;
        self
    }

    /// Set or clear the per-turn deadline.
    #[must_use]
    pub fn with_turn_deadline_ms(mut self, ms: Option<u64>) -> Self {
        self.turn_deadline_ms = ms;
        self
    }

    /// Set the round transition delay.
    #[must_use]
    pub fn with_round_delay_ms(mut self, ms: u64) -> Self {
        self.round_delay_ms = ms;
        self
    }

    /// Set the result banner delay.
    #[must_use]
    pub fn with_result_delay_ms(mut self, ms: u64) -> Self {
        self.result_delay_ms = ms;
        self
    }

    /// Set or clear the opponent silence timeout.
    #[must_use]
    pub fn with_silence_timeout_ms(mut self, ms: Option<u64>) -> Self {
        self.silence_timeout_ms = ms;
        self
    }

    /// Set the smoothing gain.
    #[must_use]
    pub fn with_smoothing_gain(mut self, gain: f32) -> Self {
        self.smoothing_gain = gain;
        self
    }

    /// Toggle snapshot checksums.
    #[must_use]
    pub fn with_snapshot_checksums(mut self, enabled: bool) -> Self {
        self.snapshot_checksums = enabled;
        self
    }

    /// Set the starting side rule.
    #[must_use]
    pub fn with_starting_side(mut self, rule: StartingSide) -> Self {
        self.starting_side = rule;
        self
    }

    /// Set the input mode.
    #[must_use]
    pub fn with_turn_mode(mut self, mode: TurnMode) -> Self {
        self.turn_mode = mode;
        self
    }

    /// Toggle dead reckoning for smoothed values.
    #[must_use]
    pub fn with_dead_reckoning(mut self, enabled: bool) -> Self {
        self.dead_reckoning = enabled;
        self
    }

    /// Snapshot interval in seconds.
    #[must_use]
    pub fn broadcast_interval(&self) -> f32 {
        secs(self.broadcast_interval_ms)
    }

    /// Turn deadline in seconds. Always `None` for simultaneous input.
    #[must_use]
    pub fn turn_deadline(&self) -> Option<f32> {
        match self.turn_mode {
            TurnMode::Alternating => self.turn_deadline_ms.map(secs),
            TurnMode::Simultaneous => None,
        }
    }

    /// Round delay in seconds.
    #[must_use]
    pub fn round_delay(&self) -> f32 {
        secs(self.round_delay_ms)
    }

    /// Result delay in seconds.
    #[must_use]
    pub fn result_delay(&self) -> f32 {
        secs(self.result_delay_ms)
    }

    /// Silence timeout in seconds.
    #[must_use]
    pub fn silence_timeout(&self) -> Option<f32> {
        self.silence_timeout_ms.map(secs)
    }
}
