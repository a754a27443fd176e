//! Snapshots and the authority-side broadcaster.
//!
//! A snapshot is a full structural copy of the simulation's visible state
//! plus the duel bookkeeping needed to continue play. The non-authority
//! replaces its state wholesale on every applied snapshot, never
//! incrementally, so applying the same snapshot twice changes nothing.
//!
//! Only the authority produces snapshots. `revision` increases by one per
//! snapshot sent.

use serde::{Deserialize, Serialize};

use crate::core::{Side, StreamState};

/// Full-state snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<St> {
    /// Authority-assigned, strictly increasing.
    pub revision: u64,
    /// Current round (1-based).
    pub round: u32,
    /// Side holding the turn.
    pub turn: Side,
    /// The round ended and the next one has not started.
    #[serde(default)]
    pub round_over: bool,
    /// A terminal outcome has been decided.
    #[serde(default)]
    pub pending_outcome: bool,
    /// Remaining time on the turn deadline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_time_left_ms: Option<u64>,
    /// Simulation state.
    pub state: St,
    /// Checksum of the packed state as produced by the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<u64>,
    /// Authority's stream position for call-order parity checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamState>,
}

impl<St> Snapshot<St> {
    /// Snapshot without checksums.
    pub fn new(revision: u64, round: u32, turn: Side, state: St) -> Self {
        Self {
            revision,
            round,
            turn,
            round_over: false,
            pending_outcome: false,
            turn_time_left_ms: None,
            state,
            checksum: None,
            stream: None,
        }
    }
}

/// Rate limiter for periodic snapshots.
///
/// Periodic sends go out at most once per interval; forced sends (round
/// end, turn handoff, match finish, corrective) always go out and restart
/// the interval.
#[derive(Clone, Debug)]
pub struct SnapshotBroadcaster {
    interval: f32,
    since_last: f32,
}

impl SnapshotBroadcaster {
    /// Create a broadcaster with an interval in seconds.
    ///
    /// The first periodic send is allowed immediately.
    #[must_use]
    pub fn new(interval: f32) -> Self {
        Self {
            interval,
            since_last: interval,
        }
    }

    /// Advance the clock by the frame delta.
    pub fn advance(&mut self, dt: f32) {
        self.since_last += dt;
    }

    /// Decide whether to send now; records the send if so.
    pub fn should_send(&mut self, force: bool) -> bool {
        if force || self.since_last >= self.interval {
            self.since_last = 0.0;
            true
        } else {
            false
        }
    }

    /// Interval in seconds.
    #[must_use]
    pub fn interval(&self) -> f32 {
        self.interval
    }
}
