//! Cumulative player stats fed by match results.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::outcome::{MatchResult, Outcome};

/// Credits awarded per win.
pub const CREDITS_PER_WIN: u64 = 10;

/// Per-minigame tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinigameRecord {
    /// Wins.
    pub wins: u32,
    /// Losses.
    pub losses: u32,
}

/// Running totals.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    /// Wins across all minigames.
    pub wins: u32,
    /// Losses across all minigames.
    pub losses: u32,
    /// Tally per minigame id.
    pub minigames_played: BTreeMap<String, MinigameRecord>,
    /// Seconds played.
    pub total_time: f64,
    /// Credits earned.
    pub credits: u64,
}

/// The host's view of the player between minigames.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HostContext {
    /// Running totals.
    pub stats: HostStats,
    /// Most recent hand-off.
    pub last_result: Option<MatchResult>,
}

impl HostContext {
    /// Fresh context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a hand-off and fold it into the totals.
    pub fn record_result(&mut self, result: MatchResult) {
        self.last_result = Some(result);
        self.apply_result();
    }

    /// Fold `last_result` into the totals.
    ///
    /// Only wins and losses are counted; ties and forfeits only register
    /// the minigame as played.
    pub fn apply_result(&mut self) {
        let Some(result) = &self.last_result else {
            return;
        };
        let record = self.stats.minigames_played.entry(result.minigame.clone()).or_default();
        match result.outcome {
            Outcome::Win => {
                self.stats.wins += 1;
                record.wins += 1;
                self.stats.credits += CREDITS_PER_WIN;
            }
            Outcome::Lose => {
                self.stats.losses += 1;
                record.losses += 1;
            }
            Outcome::Tie | Outcome::Forfeit => {}
        }
        debug!(
            minigame = %result.minigame,
            outcome = %result.outcome,
            credits = self.stats.credits,
            "result applied"
        );
    }

    /// Add frame time to the play clock.
    pub fn add_playtime(&mut self, dt: f64) {
        self.stats.total_time += dt.max(0.0);
    }
}

impl std::fmt::Display for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "wins={} losses={} credits={} time={:.1}s",
            self.stats.wins, self.stats.losses, self.stats.credits, self.stats.total_time
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(minigame: &str, outcome: Outcome) -> MatchResult {
        MatchResult {
            minigame: minigame.into(),
            outcome,
            details: serde_json::Value::Null,
            duel_id: None,
            winner: None,
            loser: None,
        }
    }

    #[test]
    fn test_win_awards_credits() {
        let mut host = HostContext::new();
        host.record_result(result("kalah_duel", Outcome::Win));
        host.record_result(result("kalah_duel", Outcome::Lose));
        host.record_result(result("pong_duel", Outcome::Win));

        assert_eq!(host.stats.wins, 2);
        assert_eq!(host.stats.losses, 1);
        assert_eq!(host.stats.credits, 2 * CREDITS_PER_WIN);
        assert_eq!(
            host.stats.minigames_played["kalah_duel"],
            MinigameRecord { wins: 1, losses: 1 }
        );
    }

    #[test]
    fn test_tie_and_forfeit_only_register() {
        let mut host = HostContext::new();
        host.record_result(result("kalah_duel", Outcome::Tie));
        host.record_result(result("kalah_duel", Outcome::Forfeit));
        assert_eq!(host.stats.wins + host.stats.losses, 0);
        assert_eq!(host.stats.minigames_played["kalah_duel"], MinigameRecord::default());
    }

    #[test]
    fn test_apply_without_result_is_noop() {
        let mut host = HostContext::new();
        host.apply_result();
        host.add_playtime(1.5);
        host.add_playtime(-3.0);
        assert_eq!(host.stats.total_time, 1.5);
        assert_eq!(host.to_string(), "wins=0 losses=0 credits=0 time=1.5s");
    }
}
