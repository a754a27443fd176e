//! Error types for the duel synchronization layer.
//!
//! Every variant is recovered locally inside the sync layer: transport
//! failures are logged, illegal actions are dropped with a corrective
//! snapshot, desyncs trigger a resync. Only construction-time codec and
//! config errors reach callers.

use thiserror::Error;

use super::side::Side;

/// Why the authority refused to apply an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The action's side does not hold the turn.
    NotYourTurn,
    /// The simulation does not list the action as legal.
    NotLegal,
    /// The exactly-once request was already resolved.
    AlreadyResolved,
    /// A terminal outcome is already decided.
    MatchOver,
    /// The arbiter is between turns (resolving or round end).
    NotAccepting,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            RejectReason::NotYourTurn => "not your turn",
            RejectReason::NotLegal => "illegal action",
            RejectReason::AlreadyResolved => "already resolved",
            RejectReason::MatchOver => "match is over",
            RejectReason::NotAccepting => "input gate closed",
        };
        f.write_str(text)
    }
}

/// Errors that can occur in the duel layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DuelError {
    /// Send or receive failed on the duel message bus.
    #[error("transport failure: {0}")]
    Transport(String),

    /// A received action failed validation.
    #[error("illegal action from {side}: {reason}")]
    IllegalAction {
        /// Side that sent the action.
        side: Side,
        /// Why it was refused.
        reason: RejectReason,
    },

    /// Local state diverged from the authority's.
    #[error("state diverged from authority at revision {revision}")]
    Desync {
        /// Snapshot revision where the mismatch was observed.
        revision: u64,
    },

    /// The local player is not part of the roster.
    #[error("participant {local_id:?} not found in roster")]
    ParticipantResolution {
        /// The unresolved local id.
        local_id: String,
    },

    /// Wire encode/decode failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Invalid configuration value or file.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Seat index outside 0..2.
    #[error("invalid side index: {0}")]
    InvalidSide(u8),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DuelError>;
