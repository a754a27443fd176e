//! Simulation trait for minigame rule adapters.
//!
//! Games implement `Simulation` to plug their rules into the duel core:
//! - What actions are legal for a side
//! - How actions modify state, and whether the turn passes
//! - How state is packed into, and restored from, a snapshot
//!
//! The duel core never interprets game-specific state.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::core::{DeterministicStream, Side};
use crate::interp::Vec2;

/// Terminal condition reported by an applied action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    /// The match is over with a single winner.
    Winner(Side),
    /// The match is over without a winner.
    Tie,
    /// The round is over; the match continues with the next round.
    RoundOver {
        /// Round winner, if any (informational).
        winner: Option<Side>,
    },
}

impl Terminal {
    /// True if this ends the whole match.
    #[must_use]
    pub fn ends_match(self) -> bool {
        !matches!(self, Terminal::RoundOver { .. })
    }
}

/// What happened when an action was applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    /// The turn passes to the other side.
    pub ends_turn: bool,
    /// Pieces/seeds/cards captured by the action.
    pub captures: u32,
    /// Terminal condition, if the action ended the round or match.
    pub terminal: Option<Terminal>,
}

impl ActionOutcome {
    /// Turn passes, nothing else happened.
    #[must_use]
    pub fn pass_turn() -> Self {
        Self {
            ends_turn: true,
            ..Self::default()
        }
    }

    /// Same side moves again.
    #[must_use]
    pub fn extra_turn() -> Self {
        Self::default()
    }

    /// Attach a capture count.
    #[must_use]
    pub fn with_captures(mut self, captures: u32) -> Self {
        self.captures = captures;
        self
    }

    /// Attach a terminal condition.
    #[must_use]
    pub fn with_terminal(mut self, terminal: Terminal) -> Self {
        self.terminal = Some(terminal);
        self
    }
}

/// A continuous value the presentation layer smooths between snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuousField {
    /// Interpolator channel name.
    pub name: String,
    /// Authoritative value.
    pub value: Vec2,
    /// Velocity for dead reckoning.
    pub velocity: Vec2,
}

impl ContinuousField {
    /// Field at rest.
    pub fn at(name: impl Into<String>, value: Vec2) -> Self {
        Self {
            name: name.into(),
            value,
            velocity: Vec2::default(),
        }
    }

    /// Attach a velocity.
    #[must_use]
    pub fn moving(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }
}

/// Simulation contract.
///
/// ## Implementation Notes
///
/// - `apply_state` must replace visible state wholesale; applying the same
///   state twice is the same as applying it once
/// - `start_round` is the only place that may draw from the shared stream;
///   both peers call it with the same arguments
/// - `apply_action` and `step` are only ever called by the authority (or offline)
pub trait Simulation {
    /// Full visible state carried in snapshots.
    type State: Clone + Debug + Serialize + DeserializeOwned;

    /// Discrete intent (move/roll/toggle/hold/bank/pass...).
    type Action: Clone + Debug + PartialEq + Serialize + DeserializeOwned;

    /// Minigame id reported in the result hand-off.
    fn minigame_id(&self) -> &str;

    /// Set up a round from the shared stream.
    ///
    /// Returns a starting-side override when the rules decide the opener
    /// (e.g. whoever holds the seven of diamonds), else `None`.
    fn start_round(
        &mut self,
        round: u32,
        stream: &mut DeterministicStream,
        starting: Side,
    ) -> Option<Side>;

    /// Pack the full visible state.
    fn pack_state(&self) -> Self::State;

    /// Replace visible state from a snapshot.
    fn apply_state(&mut self, state: &Self::State);

    /// Legal actions for a side in the current state.
    ///
    /// Returns empty if the side cannot act.
    fn legal_actions(&self, side: Side) -> Vec<Self::Action>;

    /// Apply a validated action.
    fn apply_action(&mut self, side: Side, action: &Self::Action) -> ActionOutcome;

    // === Provided Methods ===

    /// Free-form result details for the host hand-off.
    fn details(&self) -> serde_json::Value {
        serde_json::Value::Null
    }

    /// Check a single action against `legal_actions`.
    fn is_legal(&self, side: Side, action: &Self::Action) -> bool {
        self.legal_actions(side).contains(action)
    }

    /// Actions that need request/response correlation (e.g. a fired shot).
    fn exactly_once(&self, _action: &Self::Action) -> bool {
        false
    }

    /// Advance continuous state by `dt` seconds while input is open.
    ///
    /// Real-time games move balls and timers here and may end the round or
    /// match. Default: nothing moves.
    fn step(&mut self, _dt: f32) -> Option<Terminal> {
        None
    }

    /// Continuous values to smooth on screen.
    ///
    /// The owner shows them as-is; the other peer eases toward each
    /// snapshot's values. Default: none.
    fn continuous(&self) -> Vec<ContinuousField> {
        Vec::new()
    }

    /// Action synthesized when a side misses its turn deadline.
    ///
    /// Default: a random legal action.
    fn auto_action(&self, side: Side, stream: &mut DeterministicStream) -> Option<Self::Action> {
        let actions = self.legal_actions(side);
        stream.choose(&actions).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_builders() {
        let outcome = ActionOutcome::pass_turn().with_captures(3);
        assert!(outcome.ends_turn);
        assert_eq!(outcome.captures, 3);
        assert_eq!(outcome.terminal, None);

        let outcome = ActionOutcome::extra_turn().with_terminal(Terminal::Tie);
        assert!(!outcome.ends_turn);
        assert_eq!(outcome.terminal, Some(Terminal::Tie));
    }

    #[test]
    fn test_field_builder() {
        let field = ContinuousField::at("ball", Vec2::new(1.0, 2.0)).moving(Vec2::new(0.5, 0.0));
        assert_eq!(field.name, "ball");
        assert_eq!(field.value, Vec2::new(1.0, 2.0));
        assert_eq!(field.velocity, Vec2::new(0.5, 0.0));
    }

    #[test]
    fn test_terminal_ends_match() {
        assert!(Terminal::Winner(Side::First).ends_match());
        assert!(Terminal::Tie.ends_match());
        assert!(!Terminal::RoundOver { winner: None }.ends_match());
    }
}
