//! Kalah rules.
//!
//! Pits are indexed 0..6 in each side's sowing direction, so the pit facing
//! `i` on the other side is `PITS - 1 - i`. Sowing runs through the mover's
//! pits, into the mover's store, then through the opponent's pits, skipping
//! the opponent's store.
//!
//! - Last seed in the mover's store: extra turn
//! - Last seed in an empty pit of the mover: it and the facing pit's seeds
//!   go to the mover's store, if the facing pit is non-empty
//! - A side with no seeds left ends the game; the other side sweeps its pits

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::core::{DeterministicStream, Side, SideMap};
use crate::simulation::{ActionOutcome, Simulation, Terminal};

/// Pits per side.
pub const PITS: usize = 6;

/// Seeds per pit at the start of a round.
pub const SEEDS: u8 = 4;

/// Kalah intent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KalahAction {
    /// Sow from one of the mover's pits.
    Move {
        /// Pit index in the mover's sowing direction.
        pit: usize,
    },
}

/// Board state.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KalahState {
    /// Seeds per pit, per side.
    pub pits: SideMap<[u8; PITS]>,
    /// Seeds per store.
    pub stores: SideMap<u8>,
}

impl Default for KalahState {
    fn default() -> Self {
        Self {
            pits: SideMap::with_value([SEEDS; PITS]),
            stores: SideMap::with_value(0),
        }
    }
}

impl KalahState {
    /// Seeds left in a side's pits.
    #[must_use]
    pub fn seeds_in_pits(&self, side: Side) -> u32 {
        self.pits[side].iter().map(|&s| u32::from(s)).sum()
    }

    /// Where the last seed of a move lands.
    #[must_use]
    pub fn landing(&self, side: Side, pit: usize) -> Option<Landing> {
        let seeds = *self.pits[side].get(pit)?;
        if seeds == 0 {
            return None;
        }
        let mut pos = Landing::Pit(side, pit);
        for _ in 0..seeds {
            pos = pos.next(side);
        }
        Some(pos)
    }
}

/// A place a seed can land.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Landing {
    /// A pit on `Side`.
    Pit(Side, usize),
    /// The mover's store.
    Store,
}

impl Landing {
    fn next(self, mover: Side) -> Landing {
        match self {
            Landing::Pit(side, pit) if pit + 1 < PITS => Landing::Pit(side, pit + 1),
            Landing::Pit(side, _) if side == mover => Landing::Store,
            Landing::Pit(side, _) => Landing::Pit(side.other(), 0),
            Landing::Store => Landing::Pit(mover.other(), 0),
        }
    }
}

/// Kalah adapter.
#[derive(Clone, Debug)]
pub struct Kalah {
    preset: KalahState,
    state: KalahState,
}

impl Default for Kalah {
    fn default() -> Self {
        Self::new()
    }
}

impl Kalah {
    /// Standard opening board.
    #[must_use]
    pub fn new() -> Self {
        Self::with_state(KalahState::default())
    }

    /// Start every round from a given position.
    #[must_use]
    pub fn with_state(state: KalahState) -> Self {
        Self {
            preset: state.clone(),
            state,
        }
    }

    /// Current board.
    #[must_use]
    pub fn state(&self) -> &KalahState {
        &self.state
    }

    fn captures_at(&self, side: Side, pit: usize) -> bool {
        let mut trial = self.clone();
        trial.apply_action(side, &KalahAction::Move { pit }).captures > 0
    }

    fn sweep_if_over(&mut self) -> Option<Terminal> {
        let empty = Side::BOTH.iter().any(|&s| self.state.seeds_in_pits(s) == 0);
        if !empty {
            return None;
        }
        for side in Side::BOTH {
            let rest: u8 = self.state.pits[side].iter().sum();
            self.state.stores[side] += rest;
            self.state.pits[side] = [0; PITS];
        }
        let (first, second) = (self.state.stores[Side::First], self.state.stores[Side::Second]);
        Some(match first.cmp(&second) {
            std::cmp::Ordering::Greater => Terminal::Winner(Side::First),
            std::cmp::Ordering::Less => Terminal::Winner(Side::Second),
            std::cmp::Ordering::Equal => Terminal::Tie,
        })
    }
}

impl Simulation for Kalah {
    type State = KalahState;
    type Action = KalahAction;

    fn minigame_id(&self) -> &str {
        "kalah_duel"
    }

    fn start_round(
        &mut self,
        _round: u32,
        _stream: &mut DeterministicStream,
        _starting: Side,
    ) -> Option<Side> {
        self.state = self.preset.clone();
        None
    }

    fn pack_state(&self) -> KalahState {
        self.state.clone()
    }

    fn apply_state(&mut self, state: &KalahState) {
        self.state = state.clone();
    }

    fn legal_actions(&self, side: Side) -> Vec<KalahAction> {
        self.state.pits[side]
            .iter()
            .enumerate()
            .filter(|(_, seeds)| **seeds > 0)
            .map(|(pit, _)| KalahAction::Move { pit })
            .collect()
    }

    fn apply_action(&mut self, side: Side, action: &KalahAction) -> ActionOutcome {
        let KalahAction::Move { pit } = *action;
        let seeds = self.state.pits[side][pit];
        self.state.pits[side][pit] = 0;

        let mut pos = Landing::Pit(side, pit);
        for _ in 0..seeds {
            pos = pos.next(side);
            match pos {
                Landing::Pit(s, i) => self.state.pits[s][i] += 1,
                Landing::Store => self.state.stores[side] += 1,
            }
        }

        let mut outcome = match pos {
            Landing::Store => ActionOutcome::extra_turn(),
            Landing::Pit(s, i) if s == side && self.state.pits[side][i] == 1 => {
                let facing = PITS - 1 - i;
                let taken = self.state.pits[side.other()][facing];
                if taken > 0 {
                    self.state.pits[side.other()][facing] = 0;
                    self.state.pits[side][i] = 0;
                    self.state.stores[side] += taken + 1;
                    ActionOutcome::pass_turn().with_captures(u32::from(taken) + 1)
                } else {
                    ActionOutcome::pass_turn()
                }
            }
            Landing::Pit(..) => ActionOutcome::pass_turn(),
        };

        if let Some(terminal) = self.sweep_if_over() {
            outcome = outcome.with_terminal(terminal);
        }
        outcome
    }

    fn details(&self) -> serde_json::Value {
        json!({
            "stores": [self.state.stores[Side::First], self.state.stores[Side::Second]],
        })
    }

    /// Prefer an extra turn, then a capture, else a random pit.
    fn auto_action(&self, side: Side, stream: &mut DeterministicStream) -> Option<KalahAction> {
        let moves = self.legal_actions(side);
        let pit_of = |m: &KalahAction| match *m {
            KalahAction::Move { pit } => pit,
        };
        let to_store = moves
            .iter()
            .find(|m| self.state.landing(side, pit_of(m)) == Some(Landing::Store));
        if let Some(m) = to_store {
            return Some(*m);
        }
        if let Some(m) = moves.iter().find(|m| self.captures_at(side, pit_of(m))) {
            return Some(*m);
        }
        stream.choose(&moves).copied()
    }
}
