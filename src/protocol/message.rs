//! Duel wire messages.
//!
//! Every message is an envelope `{from, action}` whose payload is a closed
//! sum type tagged by `kind`. Each variant carries exactly its own fields:
//!
//! ```text
//! {"from":"alice","action":{"kind":"turn","turn":1,"round":1}}
//! {"from":"bob","action":{"kind":"intent","side":1,"action":{"kind":"move","pit":2}}}
//! {"from":"alice","action":{"kind":"finish","outcome":"win","winner":"alice","loser":"bob",...}}
//! ```
//!
//! Game-specific intents (move/roll/toggle/hold/bank/pass) are the
//! simulation's own `Action` type nested under `intent`.

use serde::{Deserialize, Serialize};

use super::snapshot::Snapshot;
use crate::core::{ParticipantId, Side};
use crate::outcome::{FinishReason, Outcome, OutcomeRecord};

/// Message envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DuelMessage<St, A> {
    /// Sender.
    pub from: ParticipantId,
    /// Payload.
    pub action: ActionPayload<St, A>,
}

impl<St, A> DuelMessage<St, A> {
    /// Wrap a payload.
    pub fn new(from: ParticipantId, action: ActionPayload<St, A>) -> Self {
        Self { from, action }
    }
}

/// Message payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionPayload<St, A> {
    /// First snapshot after launch.
    Init {
        /// Full state.
        snapshot: Snapshot<St>,
    },
    /// Periodic or forced snapshot from the authority.
    State {
        /// Full state.
        snapshot: Snapshot<St>,
    },
    /// Discrete intent from a non-authority peer.
    Intent {
        /// Side the sender plays.
        side: Side,
        /// Game-specific action.
        action: A,
        /// Correlation id for exactly-once requests.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pending_id: Option<u64>,
    },
    /// Immediate turn handoff notice.
    Turn {
        /// Side now holding the turn.
        turn: Side,
        /// Current round.
        round: u32,
    },
    /// Agreed terminal result.
    Finish {
        /// Outcome as computed by the sender.
        outcome: Outcome,
        /// Winning participant.
        #[serde(default)]
        winner: Option<ParticipantId>,
        /// Losing participant.
        #[serde(default)]
        loser: Option<ParticipantId>,
        /// Why the match ended.
        #[serde(default)]
        reason: FinishReason,
        /// Game-specific details.
        #[serde(default)]
        payload: serde_json::Value,
    },
    /// Concession; valid in any state.
    Forfeit {
        /// Participant conceding.
        by: ParticipantId,
    },
}

impl<St, A> ActionPayload<St, A> {
    /// Wire `kind` tag, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ActionPayload::Init { .. } => "init",
            ActionPayload::State { .. } => "state",
            ActionPayload::Intent { .. } => "intent",
            ActionPayload::Turn { .. } => "turn",
            ActionPayload::Finish { .. } => "finish",
            ActionPayload::Forfeit { .. } => "forfeit",
        }
    }

    /// Build a `finish` payload from a record.
    #[must_use]
    pub fn finish(record: &OutcomeRecord) -> Self {
        ActionPayload::Finish {
            outcome: record.outcome,
            winner: record.winner_id.clone(),
            loser: record.loser_id.clone(),
            reason: record.reason,
            payload: record.payload.clone(),
        }
    }

    /// Rebuild the record carried by a `finish` payload.
    #[must_use]
    pub fn to_record(&self) -> Option<OutcomeRecord> {
        match self {
            ActionPayload::Finish {
                outcome,
                winner,
                loser,
                reason,
                payload,
            } => Some(OutcomeRecord {
                outcome: *outcome,
                winner_id: winner.clone(),
                loser_id: loser.clone(),
                reason: *reason,
                payload: payload.clone(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Payload = ActionPayload<Vec<u8>, u8>;

    #[test]
    fn test_turn_wire_shape() {
        let msg: DuelMessage<Vec<u8>, u8> = DuelMessage::new(
            ParticipantId::new("alice"),
            ActionPayload::Turn { turn: Side::Second, round: 1 },
        );
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["from"], "alice");
        assert_eq!(json["action"]["kind"], "turn");
        assert_eq!(json["action"]["turn"], 1);
    }

    #[test]
    fn test_intent_omits_missing_pending_id() {
        let payload: Payload = ActionPayload::Intent {
            side: Side::Second,
            action: 4,
            pending_id: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "intent");
        assert!(json.get("pending_id").is_none());

        let back: Payload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_finish_record_roundtrip() {
        let record = OutcomeRecord::forfeit(
            Some(ParticipantId::new("bob")),
            Some(ParticipantId::new("alice")),
            serde_json::json!({"stores": [3, 4]}),
        );
        let payload: Payload = ActionPayload::finish(&record);
        assert_eq!(payload.kind(), "finish");
        assert_eq!(payload.to_record(), Some(record));
    }

    #[test]
    fn test_finish_accepts_sparse_fields() {
        let json = serde_json::json!({"kind": "finish", "outcome": "tie"});
        let payload: Payload = serde_json::from_value(json).unwrap();
        let record = payload.to_record().unwrap();
        assert_eq!(record.outcome, Outcome::Tie);
        assert_eq!(record.reason, FinishReason::Completed);
        assert!(record.winner_id.is_none());
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let json = serde_json::json!({"kind": "teleport"});
        assert!(serde_json::from_value::<Payload>(json).is_err());
    }
}
