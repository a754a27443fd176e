//! One-shot outcome finalization.
//!
//! The first terminal trigger evaluated (a rules terminal, an inbound
//! `finish`, a forfeit, a disconnect) is accepted; every later trigger is a
//! no-op. An accepted outcome sits on a banner countdown and then produces
//! exactly one `MatchResult` for the host.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::record::{Outcome, OutcomeRecord};
use crate::core::ParticipantId;

/// Result hand-off delivered to the host once at scene teardown.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Minigame that produced the result.
    pub minigame: String,
    /// Outcome from the local player's perspective.
    pub outcome: Outcome,
    /// Game-specific details.
    pub details: serde_json::Value,
    /// Duel id, when played over the network.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duel_id: Option<String>,
    /// Winning participant, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<ParticipantId>,
    /// Losing participant, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loser: Option<ParticipantId>,
}

#[derive(Clone, Debug)]
struct Pending {
    record: OutcomeRecord,
    local: Outcome,
    remaining: f32,
}

/// Converges a session on exactly one result.
#[derive(Clone, Debug)]
pub struct Finalizer {
    minigame: String,
    duel_id: Option<String>,
    delay: f32,
    pending: Option<Pending>,
    completed: bool,
    delivered: Option<MatchResult>,
}

impl Finalizer {
    /// Create a finalizer; `delay` is the banner time in seconds.
    pub fn new(minigame: impl Into<String>, duel_id: Option<String>, delay: f32) -> Self {
        Self {
            minigame: minigame.into(),
            duel_id,
            delay: delay.max(0.0),
            pending: None,
            completed: false,
            delivered: None,
        }
    }

    /// Offer a terminal record. Returns `false` if an outcome was already decided.
    pub fn propose(&mut self, record: OutcomeRecord, local: Outcome) -> bool {
        if self.is_decided() {
            return false;
        }
        info!(
            minigame = %self.minigame,
            outcome = %local,
            reason = ?record.reason,
            "outcome decided"
        );
        self.pending = Some(Pending {
            record,
            local,
            remaining: self.delay,
        });
        true
    }

    /// An outcome is pending or already delivered.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.pending.is_some() || self.completed
    }

    /// The finalize routine has run.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    /// The decided record, pending or delivered.
    #[must_use]
    pub fn record(&self) -> Option<&OutcomeRecord> {
        self.pending.as_ref().map(|p| &p.record)
    }

    /// Local outcome of the decided record.
    #[must_use]
    pub fn local_outcome(&self) -> Option<Outcome> {
        self.pending
            .as_ref()
            .map(|p| p.local)
            .or_else(|| self.delivered.as_ref().map(|r| r.outcome))
    }

    /// The delivered result.
    #[must_use]
    pub fn result(&self) -> Option<&MatchResult> {
        self.delivered.as_ref()
    }

    /// Count down the banner; yields the result once when it expires.
    pub fn tick(&mut self, dt: f32) -> Option<MatchResult> {
        let pending = self.pending.as_mut()?;
        pending.remaining -= dt;
        if pending.remaining > 0.0 {
            return None;
        }
        self.finalize_now()
    }

    /// Skip the banner and finalize immediately.
    ///
    /// Returns `None` if nothing is pending or the result was already delivered.
    pub fn finalize_now(&mut self) -> Option<MatchResult> {
        if self.completed {
            return None;
        }
        let pending = self.pending.take()?;
        self.completed = true;

        let result = MatchResult {
            minigame: self.minigame.clone(),
            outcome: pending.local,
            details: pending.record.payload,
            duel_id: self.duel_id.clone(),
            winner: pending.record.winner_id,
            loser: pending.record.loser_id,
        };
        info!(minigame = %result.minigame, outcome = %result.outcome, "match finalized");
        self.delivered = Some(result.clone());
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> OutcomeRecord {
        OutcomeRecord::victory(
            Some(ParticipantId::new("alice")),
            Some(ParticipantId::new("bob")),
            serde_json::json!({"stores": [30, 18]}),
        )
    }

    #[test]
    fn test_first_proposal_wins() {
        let mut fin = Finalizer::new("kalah_duel", Some("duel-1".into()), 1.0);
        assert!(fin.propose(record(), Outcome::Win));

        let forfeit = OutcomeRecord::forfeit(
            Some(ParticipantId::new("alice")),
            Some(ParticipantId::new("bob")),
            serde_json::Value::Null,
        );
        assert!(!fin.propose(forfeit, Outcome::Forfeit));
        assert_eq!(fin.local_outcome(), Some(Outcome::Win));
    }

    #[test]
    fn test_banner_delay() {
        let mut fin = Finalizer::new("kalah_duel", None, 1.0);
        fin.propose(record(), Outcome::Win);

        assert!(fin.tick(0.6).is_none());
        assert!(!fin.completed());

        let result = fin.tick(0.6).unwrap();
        assert_eq!(result.outcome, Outcome::Win);
        assert_eq!(result.winner, Some(ParticipantId::new("alice")));
        assert!(fin.completed());

        assert!(fin.tick(1.0).is_none());
        assert!(fin.finalize_now().is_none());
        assert!(fin.completed());
    }

    #[test]
    fn test_completed_blocks_new_proposals() {
        let mut fin = Finalizer::new("kalah_duel", None, 0.0);
        fin.propose(record(), Outcome::Win);
        assert!(fin.finalize_now().is_some());
        assert!(!fin.propose(record(), Outcome::Lose));
        assert_eq!(fin.result().unwrap().outcome, Outcome::Win);
    }

    #[test]
    fn test_result_serialization_skips_missing_ids() {
        let mut fin = Finalizer::new("rps_duel", None, 0.0);
        fin.propose(OutcomeRecord::tie(serde_json::Value::Null), Outcome::Tie);
        let result = fin.finalize_now().unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "tie");
        assert!(json.get("duel_id").is_none());
        assert!(json.get("winner").is_none());
    }
}
