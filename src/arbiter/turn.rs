//! Turn phases and the per-turn deadline.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::{Side, TurnMode};

/// Where the duel is in its turn cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// The local player holds the turn and may act.
    WaitingForLocal,
    /// The opponent holds the turn.
    WaitingForRemote,
    /// An action is in flight; input is closed until it resolves.
    Resolving,
    /// Between rounds.
    RoundEnd,
    /// Terminal. No further transitions.
    MatchEnd,
}

/// Turn bookkeeping mirrored into snapshots.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TurnState {
    /// Side holding the turn.
    pub turn_index: Side,
    /// Current round (1-based, 0 before the first round).
    pub round: u32,
    /// Seconds left before the deadline fires.
    pub deadline_left: Option<f32>,
    /// Exactly-once request awaiting resolution.
    pub pending_action_id: Option<u64>,
}

/// Result of resolving an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TurnChange {
    /// The turn moved to the other side.
    pub flipped: bool,
    /// Side now holding the turn.
    pub turn: Side,
}

/// Gatekeeper for whose input is accepted.
///
/// `local` is `None` in hot-seat play, where both sides are local.
/// In simultaneous mode the turn index is informational: both sides are
/// accepted whenever input is open and the turn never flips.
#[derive(Clone, Debug)]
pub struct TurnArbiter {
    local: Option<Side>,
    mode: TurnMode,
    deadline: Option<f32>,
    state: TurnState,
    phase: Phase,
    expired: bool,
}

impl TurnArbiter {
    /// Arbiter before the first round.
    #[must_use]
    pub fn new(local: Option<Side>, starting: Side, deadline: Option<f32>) -> Self {
        Self {
            local,
            mode: TurnMode::Alternating,
            deadline,
            state: TurnState {
                turn_index: starting,
                round: 0,
                deadline_left: None,
                pending_action_id: None,
            },
            phase: Phase::RoundEnd,
            expired: false,
        }
    }

    /// Switch input mode. Simultaneous input has no deadline.
    #[must_use]
    pub fn with_mode(mut self, mode: TurnMode) -> Self {
        self.mode = mode;
        if mode == TurnMode::Simultaneous {
            self.deadline = None;
        }
        self
    }

    /// Input mode.
    #[must_use]
    pub fn mode(&self) -> TurnMode {
        self.mode
    }

    /// Both sides act at once.
    #[must_use]
    pub fn is_simultaneous(&self) -> bool {
        self.mode == TurnMode::Simultaneous
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Turn bookkeeping.
    #[must_use]
    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Side holding the turn.
    #[must_use]
    pub fn turn(&self) -> Side {
        self.state.turn_index
    }

    /// Current round.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.state.round
    }

    /// The match has ended.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.phase == Phase::MatchEnd
    }

    /// Local input is accepted right now.
    #[must_use]
    pub fn accepts_local(&self) -> bool {
        self.phase == Phase::WaitingForLocal
    }

    /// Input from `side` is accepted right now.
    #[must_use]
    pub fn accepts_from(&self, side: Side) -> bool {
        self.is_waiting() && (self.is_simultaneous() || self.state.turn_index == side)
    }

    /// A side holds the turn and input is open.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        matches!(self.phase, Phase::WaitingForLocal | Phase::WaitingForRemote)
    }

    /// Close input while an action resolves.
    pub fn begin_resolve(&mut self) {
        if self.is_waiting() {
            self.phase = Phase::Resolving;
        }
    }

    /// Reopen input after an action; flips the turn if `ends_turn`.
    ///
    /// The deadline restarts either way.
    pub fn finish_resolve(&mut self, ends_turn: bool) -> TurnChange {
        if self.phase == Phase::MatchEnd || self.phase == Phase::RoundEnd {
            return TurnChange {
                flipped: false,
                turn: self.state.turn_index,
            };
        }
        let flipped = ends_turn && !self.is_simultaneous();
        if flipped {
            self.state.turn_index = self.state.turn_index.other();
        }
        // Every resolved action opens a fresh decision, extra turns included.
        self.reset_deadline();
        self.phase = self.waiting_phase();
        trace!(turn = %self.state.turn_index, flipped, "turn resolved");
        TurnChange {
            flipped,
            turn: self.state.turn_index,
        }
    }

    /// Hand the turn over without an action (deadline with nothing legal).
    pub fn force_pass(&mut self) -> TurnChange {
        self.begin_resolve();
        self.finish_resolve(true)
    }

    /// Adopt the authority's view of the turn.
    ///
    /// Returns `true` if the turn holder or round changed.
    pub fn sync(&mut self, turn: Side, round: u32, round_over: bool) -> bool {
        if self.phase == Phase::MatchEnd {
            return false;
        }
        let changed = self.state.turn_index != turn || self.state.round != round;
        self.state.turn_index = turn;
        self.state.round = round;
        if changed {
            self.reset_deadline();
        }
        self.phase = if round_over { Phase::RoundEnd } else { self.waiting_phase() };
        changed
    }

    /// Close the round.
    pub fn end_round(&mut self) {
        if self.phase != Phase::MatchEnd {
            self.phase = Phase::RoundEnd;
            self.state.deadline_left = None;
        }
    }

    /// Open a round with `starting` on the move.
    pub fn start_round(&mut self, round: u32, starting: Side) {
        if self.phase == Phase::MatchEnd {
            return;
        }
        self.state.round = round;
        self.state.turn_index = starting;
        self.state.pending_action_id = None;
        self.reset_deadline();
        self.phase = self.waiting_phase();
    }

    /// Enter the terminal phase. Valid from any phase.
    pub fn end_match(&mut self) {
        self.phase = Phase::MatchEnd;
        self.state.deadline_left = None;
        self.state.pending_action_id = None;
    }

    /// Record an exactly-once request in flight.
    pub fn set_pending(&mut self, id: Option<u64>) {
        self.state.pending_action_id = id;
    }

    /// Adopt a remaining deadline reported by the authority.
    pub fn set_deadline_left(&mut self, left: Option<f32>) {
        if self.deadline.is_some() && self.is_waiting() {
            self.state.deadline_left = left;
        }
    }

    /// Count the deadline down. Returns `true` once when it expires.
    pub fn tick(&mut self, dt: f32) -> bool {
        if !self.is_waiting() || self.expired {
            return false;
        }
        let Some(left) = self.state.deadline_left.as_mut() else {
            return false;
        };
        *left -= dt;
        if *left > 0.0 {
            return false;
        }
        *left = 0.0;
        self.expired = true;
        true
    }

    fn reset_deadline(&mut self) {
        self.state.deadline_left = self.deadline;
        self.expired = false;
    }

    fn waiting_phase(&self) -> Phase {
        match self.local {
            _ if self.is_simultaneous() => Phase::WaitingForLocal,
            Some(local) if local != self.state.turn_index => Phase::WaitingForRemote,
            _ => Phase::WaitingForLocal,
        }
    }
}
