//! Outcome records and the symmetric local mapping.
//!
//! A record is computed once by one side and always keyed by stable
//! participant ids. Each receiver derives its own view with
//! `OutcomeRecord::local_view`, which is pure: the winner sees `Win`, the
//! loser sees `Lose` (or `Forfeit` if they conceded), and no record can make
//! both peers see `Win`.

use serde::{Deserialize, Serialize};

use crate::core::ParticipantId;

/// Terminal outcome label.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Won the match.
    Win,
    /// Lost the match.
    Lose,
    /// Nobody won.
    Tie,
    /// Conceded (the forfeiting side's view).
    Forfeit,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Outcome::Win => "win",
            Outcome::Lose => "lose",
            Outcome::Tie => "tie",
            Outcome::Forfeit => "forfeit",
        };
        f.write_str(text)
    }
}

/// Why the match ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The rules reached a terminal state.
    #[default]
    Completed,
    /// A participant conceded.
    Forfeit,
    /// The opponent went silent past the configured timeout.
    Disconnect,
}

/// The agreed terminal result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Outcome as computed by the deciding side.
    ///
    /// For id-keyed records this is informational; receivers re-map it.
    /// Offline records (no ids) carry the local player's view directly.
    pub outcome: Outcome,
    /// Winning participant.
    pub winner_id: Option<ParticipantId>,
    /// Losing participant.
    pub loser_id: Option<ParticipantId>,
    /// Why the match ended.
    pub reason: FinishReason,
    /// Game-specific details (scores, stores, detonated cell...).
    pub payload: serde_json::Value,
}

impl OutcomeRecord {
    /// `winner` beat `loser` by the rules.
    #[must_use]
    pub fn victory(
        winner: Option<ParticipantId>,
        loser: Option<ParticipantId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            outcome: Outcome::Win,
            winner_id: winner,
            loser_id: loser,
            reason: FinishReason::Completed,
            payload,
        }
    }

    /// Nobody won.
    #[must_use]
    pub fn tie(payload: serde_json::Value) -> Self {
        Self {
            outcome: Outcome::Tie,
            winner_id: None,
            loser_id: None,
            reason: FinishReason::Completed,
            payload,
        }
    }

    /// `forfeiter` conceded to `opponent`.
    #[must_use]
    pub fn forfeit(
        forfeiter: Option<ParticipantId>,
        opponent: Option<ParticipantId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            outcome: Outcome::Forfeit,
            winner_id: opponent,
            loser_id: forfeiter,
            reason: FinishReason::Forfeit,
            payload,
        }
    }

    /// Offline record already expressed from the local player's view.
    #[must_use]
    pub fn local_only(outcome: Outcome, reason: FinishReason, payload: serde_json::Value) -> Self {
        Self {
            outcome,
            winner_id: None,
            loser_id: None,
            reason,
            payload,
        }
    }

    /// Override the finish reason.
    #[must_use]
    pub fn with_reason(mut self, reason: FinishReason) -> Self {
        self.reason = reason;
        self
    }

    /// Map the record to `local`'s perspective.
    #[must_use]
    pub fn local_view(&self, local: Option<&ParticipantId>) -> Outcome {
        if self.outcome == Outcome::Tie {
            return Outcome::Tie;
        }
        let Some(local) = local else {
            return self.outcome;
        };
        if self.winner_id.as_ref() == Some(local) {
            Outcome::Win
        } else if self.loser_id.as_ref() == Some(local) {
            if self.reason == FinishReason::Forfeit {
                Outcome::Forfeit
            } else {
                Outcome::Lose
            }
        } else if self.winner_id.is_none() && self.loser_id.is_none() {
            self.outcome
        } else {
            // Keyed record that names neither of us.
            Outcome::Lose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (ParticipantId, ParticipantId) {
        (ParticipantId::new("alice"), ParticipantId::new("bob"))
    }

    #[test]
    fn test_victory_is_complementary() {
        let (a, b) = ids();
        let record =
            OutcomeRecord::victory(Some(a.clone()), Some(b.clone()), serde_json::Value::Null);
        assert_eq!(record.local_view(Some(&a)), Outcome::Win);
        assert_eq!(record.local_view(Some(&b)), Outcome::Lose);
    }

    #[test]
    fn test_forfeit_view() {
        let (a, b) = ids();
        let record =
            OutcomeRecord::forfeit(Some(b.clone()), Some(a.clone()), serde_json::Value::Null);
        assert_eq!(record.local_view(Some(&a)), Outcome::Win);
        assert_eq!(record.local_view(Some(&b)), Outcome::Forfeit);
    }

    #[test]
    fn test_tie_is_tie_for_everyone() {
        let (a, b) = ids();
        let record = OutcomeRecord::tie(serde_json::json!({"stores": [24, 24]}));
        assert_eq!(record.local_view(Some(&a)), Outcome::Tie);
        assert_eq!(record.local_view(Some(&b)), Outcome::Tie);
    }

    #[test]
    fn test_offline_record_keeps_outcome() {
        let record = OutcomeRecord::local_only(
            Outcome::Lose,
            FinishReason::Completed,
            serde_json::Value::Null,
        );
        assert_eq!(record.local_view(None), Outcome::Lose);
        assert_eq!(record.local_view(Some(&ParticipantId::new("solo"))), Outcome::Lose);
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(serde_json::to_string(&Outcome::Forfeit).unwrap(), "\"forfeit\"");
        assert_eq!(serde_json::to_string(&FinishReason::Disconnect).unwrap(), "\"disconnect\"");
        assert_eq!(format!("{}", Outcome::Win), "win");
    }
}
