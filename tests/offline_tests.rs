//! Offline and hot-seat play.
//!
//! Without a duel id, a transport, or a full roster the engine owns the
//! simulation locally and must never touch the bus.

use std::cell::Cell;
use std::rc::Rc;

use duel_sync::core::{DuelConfig, DuelError, ParticipantId, RejectReason, Result, Side, SideMap};
use duel_sync::duel::{DuelEngine, DuelEvent};
use duel_sync::games::kalah::{KalahAction, KalahState};
use duel_sync::games::Kalah;
use duel_sync::outcome::Outcome;
use duel_sync::simulation::Simulation;
use duel_sync::session::MatchContext;
use duel_sync::transport::{DuelTransport, Envelope};

/// Transport that only counts calls.
#[derive(Clone, Default)]
struct Counting {
    sends: Rc<Cell<u32>>,
    polls: Rc<Cell<u32>>,
}

impl Counting {
    fn calls(&self) -> u32 {
        self.sends.get() + self.polls.get()
    }
}

impl DuelTransport for Counting {
    fn send(&mut self, _duel_id: &str, _bytes: Vec<u8>) -> Result<()> {
        self.sends.set(self.sends.get() + 1);
        Ok(())
    }

    fn poll(&mut self, _duel_id: &str) -> Result<Option<Envelope>> {
        self.polls.set(self.polls.get() + 1);
        Ok(None)
    }
}

fn config() -> DuelConfig {
    DuelConfig::default()
        .with_turn_deadline_ms(None)
        .with_result_delay_ms(200)
}

fn play_a_few(engine: &mut DuelEngine<Kalah, Counting>) {
    for _ in 0..6 {
        engine.update(0.05);
        let side = engine.turn();
        if let Some(action) = engine.sim().legal_actions(side).first().cloned() {
            engine.submit_as(side, action).unwrap();
        }
    }
}

#[test]
fn test_no_duel_id_never_touches_transport() {
    let counting = Counting::default();
    let ctx = MatchContext {
        duel_id: None,
        ..MatchContext::duel("unused", ["alice", "bob"], "alice")
    };
    let mut engine = DuelEngine::new(&ctx, Kalah::new(), Some(counting.clone()), config()).unwrap();

    assert!(engine.session().owns_simulation());
    assert!(!engine.session().net_enabled());
    play_a_few(&mut engine);

    assert!(engine.stats().actions_applied > 0);
    assert_eq!(counting.calls(), 0);
    assert_eq!(engine.link_stats(), None);
}

#[test]
fn test_short_roster_never_touches_transport() {
    let counting = Counting::default();
    let ctx = MatchContext {
        duel_id: Some("duel-solo".into()),
        participants: vec![ParticipantId::new("alice")],
        local_player_id: Some(ParticipantId::new("alice")),
        has_transport: true,
    };
    let mut engine = DuelEngine::new(&ctx, Kalah::new(), Some(counting.clone()), config()).unwrap();

    assert!(!engine.session().net_enabled());
    play_a_few(&mut engine);
    engine.forfeit();

    assert_eq!(counting.calls(), 0);
}

#[test]
fn test_hot_seat_drives_both_sides() {
    let mut engine: DuelEngine<Kalah, Counting> =
        DuelEngine::new(&MatchContext::offline(), Kalah::new(), None, config()).unwrap();
    engine.update(0.0);

    assert_eq!(engine.turn(), Side::First);
    let err = engine.submit_as(Side::Second, KalahAction::Move { pit: 0 }).unwrap_err();
    assert!(matches!(
        err,
        DuelError::IllegalAction {
            side: Side::Second,
            reason: RejectReason::NotYourTurn
        }
    ));

    // Pit 0 holds four seeds and stops short of the store.
    engine.submit_as(Side::First, KalahAction::Move { pit: 0 }).unwrap();
    assert_eq!(engine.turn(), Side::Second);
    engine.submit_as(Side::Second, KalahAction::Move { pit: 0 }).unwrap();
    assert_eq!(engine.turn(), Side::First);

    let events = engine.update(0.0);
    assert!(events.contains(&DuelEvent::TurnChanged { turn: Side::Second }));
    assert!(events.contains(&DuelEvent::TurnChanged { turn: Side::First }));
    assert_eq!(engine.stats().actions_rejected, 1);
}

#[test]
fn test_offline_win_hands_off_once() {
    let preset = KalahState {
        pits: SideMap::from_pair([0, 0, 0, 0, 0, 1], [0; 6]),
        stores: SideMap::from_pair(2, 0),
    };
    let mut engine: DuelEngine<Kalah, Counting> =
        DuelEngine::new(&MatchContext::offline(), Kalah::with_state(preset), None, config())
            .unwrap();

    engine.submit_as(Side::First, KalahAction::Move { pit: 5 }).unwrap();
    assert!(engine.is_decided());
    assert_eq!(engine.local_outcome(), Some(Outcome::Win));

    let events = engine.update(0.1);
    assert!(events.contains(&DuelEvent::OutcomeDecided { outcome: Outcome::Win }));
    assert!(!engine.is_finalized());

    let events = engine.update(0.15);
    let finalized: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            DuelEvent::Finalized(result) => Some(result.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(finalized.len(), 1);
    assert_eq!(finalized[0].outcome, Outcome::Win);
    assert_eq!(finalized[0].minigame, "kalah_duel");
    assert_eq!(finalized[0].duel_id, None);

    assert!(engine.update(1.0).is_empty());
    assert!(engine.take_result().is_some());
    assert!(engine.take_result().is_none());
    assert_eq!(engine.forfeit(), None);
}

#[test]
fn test_offline_forfeit_is_immediate() {
    let mut engine: DuelEngine<Kalah, Counting> =
        DuelEngine::new(&MatchContext::offline(), Kalah::new(), None, config()).unwrap();
    let result = engine.forfeit().unwrap();
    assert_eq!(result.outcome, Outcome::Forfeit);
    assert!(engine.is_finalized());
    assert!(engine.submit_as(Side::First, KalahAction::Move { pit: 0 }).is_err());
}
