//! Intent relay and authority-side validation.
//!
//! A non-authority never mutates the simulation. Its local input becomes
//! an `intent` message; the resulting state arrives in the next snapshot.
//! The authority re-checks every intent against the turn and the rules.

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::arbiter::TurnArbiter;
use crate::core::{RejectReason, Side};
use crate::protocol::ActionPayload;
use crate::simulation::Simulation;

/// Outbound intent tracking and inbound duplicate suppression.
#[derive(Clone, Debug, Default)]
pub struct InputRelay {
    next_id: u64,
    pending: Option<u64>,
    resolved: FxHashSet<u64>,
}

impl InputRelay {
    /// Empty relay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a local action as an intent.
    ///
    /// Exactly-once actions get a fresh correlation id that stays pending
    /// until the authority's answer arrives.
    pub fn outbound<St, A>(
        &mut self,
        side: Side,
        action: A,
        exactly_once: bool,
    ) -> ActionPayload<St, A> {
        let pending_id = exactly_once.then(|| {
            self.next_id += 1;
            self.next_id
        });
        if pending_id.is_some() {
            self.pending = pending_id;
        }
        ActionPayload::Intent {
            side,
            action,
            pending_id,
        }
    }

    /// Authority-side check of an action from `side`.
    pub fn validate<S: Simulation>(
        &self,
        sim: &S,
        arbiter: &TurnArbiter,
        decided: bool,
        side: Side,
        action: &S::Action,
        pending_id: Option<u64>,
    ) -> Result<(), RejectReason> {
        if decided || arbiter.is_over() {
            return Err(RejectReason::MatchOver);
        }
        if pending_id.is_some_and(|id| self.resolved.contains(&id)) {
            return Err(RejectReason::AlreadyResolved);
        }
        if !arbiter.is_waiting() {
            return Err(RejectReason::NotAccepting);
        }
        if !arbiter.accepts_from(side) {
            return Err(RejectReason::NotYourTurn);
        }
        if !sim.is_legal(side, action) {
            return Err(RejectReason::NotLegal);
        }
        Ok(())
    }

    /// Remember an answered exactly-once request.
    pub fn mark_resolved(&mut self, pending_id: Option<u64>) {
        if let Some(id) = pending_id {
            debug!(pending_id = id, "exactly-once request resolved");
            self.resolved.insert(id);
        }
    }

    /// The authority answered; nothing is in flight anymore.
    pub fn clear_pending(&mut self) {
        self.pending = None;
    }

    /// An exactly-once request is awaiting its answer.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Correlation id in flight.
    #[must_use]
    pub fn pending(&self) -> Option<u64> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DeterministicStream, TurnMode};
    use crate::simulation::ActionOutcome;

    /// Each side may only play its own seat number.
    struct Echo;

    impl Simulation for Echo {
        type State = ();
        type Action = u8;

        fn minigame_id(&self) -> &str {
            "echo"
        }

        fn start_round(
            &mut self,
            _round: u32,
            _stream: &mut DeterministicStream,
            _starting: Side,
        ) -> Option<Side> {
            None
        }

        fn pack_state(&self) {}

        fn apply_state(&mut self, _state: &()) {}

        fn legal_actions(&self, side: Side) -> Vec<u8> {
            vec![side.index() as u8]
        }

        fn apply_action(&mut self, _side: Side, _action: &u8) -> ActionOutcome {
            ActionOutcome::pass_turn()
        }
    }

    fn arbiter() -> TurnArbiter {
        let mut arbiter = TurnArbiter::new(Some(Side::First), Side::First, None);
        arbiter.start_round(1, Side::First);
        arbiter.force_pass();
        arbiter
    }

    #[test]
    fn test_outbound_ids() {
        let mut relay = InputRelay::new();
        let plain: ActionPayload<(), u8> = relay.outbound(Side::Second, 1, false);
        assert!(matches!(plain, ActionPayload::Intent { pending_id: None, .. }));
        assert!(!relay.has_pending());

        let once: ActionPayload<(), u8> = relay.outbound(Side::Second, 1, true);
        assert!(matches!(once, ActionPayload::Intent { pending_id: Some(1), .. }));
        assert_eq!(relay.pending(), Some(1));

        relay.clear_pending();
        assert!(!relay.has_pending());
    }

    #[test]
    fn test_validate_order() {
        let relay = InputRelay::new();
        let arbiter = arbiter();

        assert_eq!(relay.validate(&Echo, &arbiter, false, Side::Second, &1, None), Ok(()));
        assert_eq!(
            relay.validate(&Echo, &arbiter, false, Side::First, &0, None),
            Err(RejectReason::NotYourTurn)
        );
        assert_eq!(
            relay.validate(&Echo, &arbiter, false, Side::Second, &0, None),
            Err(RejectReason::NotLegal)
        );
        assert_eq!(
            relay.validate(&Echo, &arbiter, true, Side::Second, &1, None),
            Err(RejectReason::MatchOver)
        );
    }

    #[test]
    fn test_duplicate_request_dropped() {
        let mut relay = InputRelay::new();
        let arbiter = arbiter();
        relay.mark_resolved(Some(7));
        assert_eq!(
            relay.validate(&Echo, &arbiter, false, Side::Second, &1, Some(7)),
            Err(RejectReason::AlreadyResolved)
        );
        assert_eq!(relay.validate(&Echo, &arbiter, false, Side::Second, &1, Some(8)), Ok(()));
    }

    #[test]
    fn test_simultaneous_skips_turn_check() {
        let relay = InputRelay::new();
        let mut arbiter = TurnArbiter::new(Some(Side::First), Side::First, None)
            .with_mode(TurnMode::Simultaneous);
        arbiter.start_round(1, Side::First);
        assert_eq!(relay.validate(&Echo, &arbiter, false, Side::First, &0, None), Ok(()));
        assert_eq!(relay.validate(&Echo, &arbiter, false, Side::Second, &1, None), Ok(()));
        assert_eq!(
            relay.validate(&Echo, &arbiter, false, Side::Second, &0, None),
            Err(RejectReason::NotLegal)
        );
    }

    #[test]
    fn test_closed_gate() {
        let relay = InputRelay::new();
        let mut arbiter = arbiter();
        arbiter.end_round();
        assert_eq!(
            relay.validate(&Echo, &arbiter, false, Side::Second, &1, None),
            Err(RejectReason::NotAccepting)
        );
    }
}
