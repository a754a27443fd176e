//! The duel engine: one synchronous tick per frame.
//!
//! ## Control flow
//!
//! ```text
//! update(dt)
//!   drain inbound        authority: validate + apply intents
//!                        other peer: apply snapshots, turn, finish
//!   silence timeout      other peer only, when configured
//!   deadline             authority: auto-play or pass on expiry
//!   simulation step      owner, while input is open
//!   round delay          authority: start the next round
//!   banner countdown     hand off the result exactly once
//!   periodic broadcast   authority only
//!   smoothing            owner snaps, other peer eases toward snapshots
//! ```
//!
//! In simultaneous mode both sides' intents are accepted at once and
//! state reaches the other peer on the periodic cadence.
//!
//! Offline (no duel id, no transport, or a short roster) the engine owns
//! the simulation on the local peer, accepts input for both sides and
//! never touches the transport.

use tracing::{debug, info, warn};

use crate::arbiter::{Phase, TurnArbiter};
use crate::core::{DeterministicStream, DuelConfig, DuelError, RejectReason, Result, Side};
use crate::interp::Interpolator;
use crate::outcome::{FinishReason, Finalizer, MatchResult, Outcome, OutcomeRecord};
use crate::protocol::{codec, ActionPayload, DuelMessage, Snapshot, SnapshotBroadcaster};
use crate::relay::InputRelay;
use crate::session::{DuelSession, MatchContext};
use crate::simulation::{ActionOutcome, Simulation, Terminal};
use crate::transport::{DuelTransport, LinkStats, TransportLink};

/// Seed material when there is no duel id.
const OFFLINE_SEED: &str = "offline";

/// Something the presentation layer may want to react to.
#[derive(Clone, Debug, PartialEq)]
pub enum DuelEvent {
    /// A round was set up.
    RoundStarted {
        /// Round number.
        round: u32,
        /// Side on the move.
        starting: Side,
    },
    /// The simulation applied an action (authority or offline only).
    ActionApplied {
        /// Side that acted.
        side: Side,
        /// Captures reported by the rules.
        captures: u32,
    },
    /// An action was refused.
    ActionRejected {
        /// Side that acted.
        side: Side,
        /// Why.
        reason: RejectReason,
    },
    /// The turn moved.
    TurnChanged {
        /// Side now on the move.
        turn: Side,
    },
    /// A snapshot replaced local state.
    SnapshotApplied {
        /// Snapshot revision.
        revision: u64,
    },
    /// Local state or stream disagreed with the authority.
    DesyncDetected {
        /// Snapshot revision.
        revision: u64,
    },
    /// A terminal outcome was accepted; the banner is showing.
    OutcomeDecided {
        /// Outcome from the local player's view.
        outcome: Outcome,
    },
    /// The result was handed off.
    Finalized(MatchResult),
}

/// Engine counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Snapshots broadcast (authority).
    pub snapshots_sent: u64,
    /// Snapshots applied (other peer).
    pub snapshots_applied: u64,
    /// Snapshots dropped as older than the last applied.
    pub stale_snapshots: u64,
    /// Intents relayed to the authority.
    pub intents_sent: u64,
    /// Actions applied to the simulation.
    pub actions_applied: u64,
    /// Actions refused.
    pub actions_rejected: u64,
    /// Checksum mismatches.
    pub desyncs: u64,
    /// Stream re-seats after a fingerprint mismatch.
    pub resyncs: u64,
    /// Messages from outside the roster.
    pub strangers: u64,
}

/// Host-authoritative duel driver over a `Simulation`.
pub struct DuelEngine<S: Simulation, T: DuelTransport> {
    session: DuelSession,
    config: DuelConfig,
    sim: S,
    link: Option<TransportLink<T>>,
    arbiter: TurnArbiter,
    relay: InputRelay,
    finalizer: Finalizer,
    broadcaster: SnapshotBroadcaster,
    interp: Interpolator,
    stream: DeterministicStream,
    seed_material: String,
    starting: Side,
    revision: u64,
    applied_any: bool,
    round_over: bool,
    round_delay_left: Option<f32>,
    silence: f32,
    handed_off: bool,
    events: Vec<DuelEvent>,
    stats: EngineStats,
}

impl<S: Simulation, T: DuelTransport> DuelEngine<S, T> {
    /// Resolve the session and set up round 1.
    ///
    /// The authority broadcasts `init` immediately. The other peer waits
    /// for its first snapshot before accepting input.
    pub fn new(
        ctx: &MatchContext,
        sim: S,
        transport: Option<T>,
        config: DuelConfig,
    ) -> Result<Self> {
        config.validate()?;

        let mut ctx = ctx.clone();
        ctx.has_transport &= transport.is_some();
        let session = DuelSession::resolve(&ctx);

        let link = match (session.net_enabled(), session.duel_id(), session.local_id(), transport) {
            (true, Some(duel_id), Some(local_id), Some(transport)) => {
                Some(TransportLink::new(transport, duel_id, local_id.clone()))
            }
            _ => None,
        };

        let local = session.net_enabled().then(|| session.local_side());
        let starting = config.starting_side.resolve(session.participants());
        let seed_material = session.duel_id().unwrap_or(OFFLINE_SEED).to_string();
        let finalizer = Finalizer::new(
            sim.minigame_id(),
            session.duel_id().map(String::from),
            config.result_delay(),
        );

        let mut engine = Self {
            arbiter: TurnArbiter::new(local, starting, config.turn_deadline())
                .with_mode(config.turn_mode),
            broadcaster: SnapshotBroadcaster::new(config.broadcast_interval()),
            interp: Interpolator::new(config.smoothing_gain, config.dead_reckoning),
            stream: DeterministicStream::derive(&seed_material, 0),
            relay: InputRelay::new(),
            session,
            config,
            sim,
            link,
            finalizer,
            seed_material,
            starting,
            revision: 0,
            applied_any: false,
            round_over: false,
            round_delay_left: None,
            silence: 0.0,
            handed_off: false,
            events: Vec::new(),
            stats: EngineStats::default(),
        };

        if engine.session.owns_simulation() {
            engine.begin_round(1);
            engine.snap_continuous();
            engine.broadcast(true, true);
        }
        Ok(engine)
    }

    /// Advance one frame. Returns what happened, in order.
    pub fn update(&mut self, dt: f32) -> Vec<DuelEvent> {
        let dt = dt.max(0.0);

        self.drain();
        self.tick_silence(dt);

        if self.session.owns_simulation() {
            self.tick_simulation(dt);
            self.tick_deadline(dt);
            self.tick_round_delay(dt);
        } else {
            // Display countdown only; expiry is the authority's call.
            self.arbiter.tick(dt);
        }

        if let Some(result) = self.finalizer.tick(dt) {
            self.arbiter.end_match();
            self.events.push(DuelEvent::Finalized(result));
        }

        if !self.finalizer.completed() {
            self.broadcaster.advance(dt);
            self.broadcast(false, false);
        }
        if self.session.owns_simulation() {
            self.snap_continuous();
        }
        self.interp.step(dt);

        std::mem::take(&mut self.events)
    }

    /// Submit the local player's action.
    ///
    /// The authority (or offline peer) applies it at once. The other peer
    /// relays it as an intent; the effect arrives with the next snapshot.
    pub fn submit_local(&mut self, action: S::Action) -> Result<()> {
        let side = self.session.local_side();
        if self.session.owns_simulation() {
            return self.apply_checked(side, action, None);
        }

        let gate = if self.finalizer.is_decided() || self.arbiter.is_over() {
            Err(RejectReason::MatchOver)
        } else if !self.arbiter.accepts_local() {
            Err(match self.arbiter.phase() {
                Phase::WaitingForRemote => RejectReason::NotYourTurn,
                _ => RejectReason::NotAccepting,
            })
        } else if !self.sim.is_legal(side, &action) {
            Err(RejectReason::NotLegal)
        } else {
            Ok(())
        };
        if let Err(reason) = gate {
            debug!(%side, %reason, "local input refused");
            return Err(DuelError::IllegalAction { side, reason });
        }

        let exactly_once = self.sim.exactly_once(&action);
        let payload = self.relay.outbound(side, action, exactly_once);
        self.arbiter.set_pending(self.relay.pending());
        if !self.arbiter.is_simultaneous() {
            self.arbiter.begin_resolve();
        }
        self.send(payload);
        self.stats.intents_sent += 1;
        Ok(())
    }

    /// Submit an action for either side (hot-seat or local AI).
    ///
    /// Networked, only the local side may be driven.
    pub fn submit_as(&mut self, side: Side, action: S::Action) -> Result<()> {
        if self.session.net_enabled() {
            if side != self.session.local_side() {
                return Err(DuelError::IllegalAction {
                    side,
                    reason: RejectReason::NotYourTurn,
                });
            }
            return self.submit_local(action);
        }
        self.apply_checked(side, action, None)
    }

    /// Concede. Always succeeds locally and skips the banner.
    ///
    /// If an outcome is already pending, that outcome is finalized instead.
    /// Returns `None` once the result has already been handed off.
    pub fn forfeit(&mut self) -> Option<MatchResult> {
        if self.finalizer.completed() {
            return None;
        }
        if !self.finalizer.is_decided() {
            let local_id = self.session.local_id().cloned();
            let record = OutcomeRecord::forfeit(
                local_id.clone(),
                self.session.remote_id().cloned(),
                self.sim.details(),
            );
            let outcome = record.local_view(local_id.as_ref());
            self.decide(record, outcome);
            if let Some(by) = local_id.filter(|_| self.link.is_some()) {
                self.send(ActionPayload::Forfeit { by });
            }
        }
        let result = self.finalizer.finalize_now();
        if let Some(result) = &result {
            self.events.push(DuelEvent::Finalized(result.clone()));
        }
        result
    }

    // === Inbound ===

    fn drain(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        let messages = link.drain::<S::State, S::Action>();
        if !messages.is_empty() {
            self.silence = 0.0;
        }
        for msg in messages {
            self.handle(msg);
        }
    }

    fn handle(&mut self, msg: DuelMessage<S::State, S::Action>) {
        let Some(sender) = self.session.side_of(&msg.from) else {
            self.stats.strangers += 1;
            debug!(
                from = %msg.from,
                kind = msg.action.kind(),
                "dropping message from outside the roster"
            );
            return;
        };
        let authority = self.session.is_authority();

        match msg.action {
            ActionPayload::Init { snapshot } | ActionPayload::State { snapshot } if !authority => {
                self.apply_snapshot(snapshot);
            }
            ActionPayload::Intent {
                side,
                action,
                pending_id,
            } if authority => {
                if side != sender {
                    debug!(
                        claimed = %side,
                        %sender,
                        "intent side does not match sender, using sender"
                    );
                }
                // Rejections are reported through events and a corrective snapshot.
                let _ = self.apply_checked(sender, action, pending_id);
            }
            ActionPayload::Turn { turn, round } if !authority => {
                if round == self.arbiter.round()
                    && self.arbiter.sync(turn, round, self.round_over)
                {
                    self.events.push(DuelEvent::TurnChanged { turn });
                }
                self.relay.clear_pending();
                self.arbiter.set_pending(None);
            }
            ref finish @ ActionPayload::Finish { .. } => {
                if let Some(record) = finish.to_record() {
                    let outcome = record.local_view(self.session.local_id());
                    self.decide(record, outcome);
                }
            }
            ActionPayload::Forfeit { by } => {
                let Some(by_side) = self.session.side_of(&by) else {
                    debug!(by = %by, "forfeit for a stranger ignored");
                    return;
                };
                let opponent = self.session.participant(by_side.other()).cloned();
                let record = OutcomeRecord::forfeit(Some(by), opponent, self.sim.details());
                let outcome = record.local_view(self.session.local_id());
                self.decide(record, outcome);
            }
            other => {
                debug!(kind = other.kind(), authority, "message not meant for this role");
            }
        }
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot<S::State>) {
        if self.applied_any && snapshot.revision < self.revision {
            self.stats.stale_snapshots += 1;
            debug!(revision = snapshot.revision, last = self.revision, "dropping stale snapshot");
            return;
        }

        if snapshot.round != self.arbiter.round() && snapshot.round > 0 {
            let round = u64::from(snapshot.round);
            self.stream = DeterministicStream::derive(&self.seed_material, round);
            let starting = self
                .sim
                .start_round(snapshot.round, &mut self.stream, self.starting)
                .unwrap_or(self.starting);
            self.events.push(DuelEvent::RoundStarted {
                round: snapshot.round,
                starting,
            });
        }

        self.sim.apply_state(&snapshot.state);
        for field in self.sim.continuous() {
            self.interp.set_target(&field.name, field.value, field.velocity);
        }
        self.revision = snapshot.revision;
        self.applied_any = true;
        self.round_over = snapshot.round_over;

        if self.arbiter.sync(snapshot.turn, snapshot.round, snapshot.round_over) {
            self.events.push(DuelEvent::TurnChanged { turn: snapshot.turn });
        }
        self.arbiter
            .set_deadline_left(snapshot.turn_time_left_ms.map(|ms| ms as f32 / 1000.0));
        self.relay.clear_pending();
        self.arbiter.set_pending(None);

        if let Some(expected) = snapshot.checksum {
            match codec::state_checksum(&self.sim.pack_state()) {
                Ok(local) if local != expected => {
                    self.stats.desyncs += 1;
                    let error = DuelError::Desync {
                        revision: snapshot.revision,
                    };
                    warn!(%error, expected, local, "state checksum mismatch");
                    self.events.push(DuelEvent::DesyncDetected {
                        revision: snapshot.revision,
                    });
                }
                Ok(_) => {}
                Err(error) => warn!(%error, "could not checksum local state"),
            }
        }
        if let Some(remote) = snapshot.stream {
            if self.stream.state() != remote {
                self.stats.resyncs += 1;
                warn!(
                    revision = snapshot.revision,
                    local = self.stream.fingerprint(),
                    remote = DeterministicStream::from_state(&remote).fingerprint(),
                    "stream fingerprint mismatch, re-seating from authority"
                );
                self.stream = DeterministicStream::from_state(&remote);
                self.events.push(DuelEvent::DesyncDetected {
                    revision: snapshot.revision,
                });
            }
        }

        self.stats.snapshots_applied += 1;
        self.events.push(DuelEvent::SnapshotApplied {
            revision: snapshot.revision,
        });
    }

    // === Simulation ownership ===

    fn apply_checked(
        &mut self,
        side: Side,
        action: S::Action,
        pending_id: Option<u64>,
    ) -> Result<()> {
        let verdict = self.relay.validate(
            &self.sim,
            &self.arbiter,
            self.finalizer.is_decided(),
            side,
            &action,
            pending_id,
        );
        if let Err(reason) = verdict {
            self.stats.actions_rejected += 1;
            debug!(%side, %reason, ?action, "action rejected");
            self.events.push(DuelEvent::ActionRejected { side, reason });
            // Corrective: the sender re-syncs to the unchanged state.
            self.broadcast(true, false);
            return Err(DuelError::IllegalAction { side, reason });
        }

        self.arbiter.begin_resolve();
        let outcome = self.sim.apply_action(side, &action);
        self.relay.mark_resolved(pending_id);
        self.stats.actions_applied += 1;
        self.events.push(DuelEvent::ActionApplied {
            side,
            captures: outcome.captures,
        });
        self.resolve(side, outcome);
        Ok(())
    }

    fn resolve(&mut self, side: Side, outcome: ActionOutcome) {
        if let Some(terminal) = outcome.terminal {
            self.conclude(terminal);
            return;
        }
        let change = self.arbiter.finish_resolve(outcome.ends_turn);
        // Simultaneous input rides the periodic cadence.
        self.broadcast(!self.arbiter.is_simultaneous(), false);
        if change.flipped {
            debug!(from = %side, to = %change.turn, "turn handed over");
            self.announce_turn(change.turn);
        }
    }

    fn conclude(&mut self, terminal: Terminal) {
        if terminal.ends_match() {
            let (record, local) = self.terminal_record(terminal);
            self.decide(record.clone(), local);
            self.send(ActionPayload::finish(&record));
            self.broadcast(true, false);
            return;
        }
        info!(round = self.arbiter.round(), ?terminal, "round over");
        self.arbiter.end_round();
        self.round_over = true;
        self.round_delay_left = Some(self.config.round_delay());
        self.broadcast(true, false);
    }

    fn terminal_record(&self, terminal: Terminal) -> (OutcomeRecord, Outcome) {
        let payload = self.sim.details();
        let local_id = self.session.local_id();
        let keyed = local_id.is_some() && self.session.participants().len() == 2;
        match terminal {
            Terminal::Winner(winner) if keyed => {
                let record = OutcomeRecord::victory(
                    self.session.participant(winner).cloned(),
                    self.session.participant(winner.other()).cloned(),
                    payload,
                );
                let local = record.local_view(local_id);
                (record, local)
            }
            Terminal::Winner(winner) => {
                let local = if winner == self.session.local_side() {
                    Outcome::Win
                } else {
                    Outcome::Lose
                };
                (OutcomeRecord::local_only(local, FinishReason::Completed, payload), local)
            }
            _ => (OutcomeRecord::tie(payload), Outcome::Tie),
        }
    }

    fn decide(&mut self, record: OutcomeRecord, local: Outcome) {
        if self.finalizer.propose(record, local) {
            self.arbiter.end_match();
            self.round_delay_left = None;
            self.events.push(DuelEvent::OutcomeDecided { outcome: local });
        }
    }

    fn begin_round(&mut self, round: u32) {
        self.stream = DeterministicStream::derive(&self.seed_material, u64::from(round));
        let starting = self
            .sim
            .start_round(round, &mut self.stream, self.starting)
            .unwrap_or(self.starting);
        self.arbiter.start_round(round, starting);
        self.round_over = false;
        self.round_delay_left = None;
        info!(round, %starting, minigame = self.sim.minigame_id(), "round started");
        self.events.push(DuelEvent::RoundStarted { round, starting });
    }

    fn announce_turn(&mut self, turn: Side) {
        let round = self.arbiter.round();
        self.send(ActionPayload::Turn { turn, round });
        self.events.push(DuelEvent::TurnChanged { turn });
    }

    // === Timers ===

    fn tick_simulation(&mut self, dt: f32) {
        if self.finalizer.is_decided() || !self.arbiter.is_waiting() {
            return;
        }
        if let Some(terminal) = self.sim.step(dt) {
            debug!(?terminal, "simulation step reached a terminal");
            self.conclude(terminal);
        }
    }

    fn tick_deadline(&mut self, dt: f32) {
        if !self.arbiter.tick(dt) || self.finalizer.is_decided() {
            return;
        }
        let side = self.arbiter.turn();
        let context = format!("auto-{}-{}", self.arbiter.round(), self.stats.actions_applied);
        let mut stream = self.stream.for_context(&context);
        match self.sim.auto_action(side, &mut stream) {
            Some(action) => {
                info!(%side, ?action, "turn deadline expired, auto-playing");
                if let Err(error) = self.apply_checked(side, action, None) {
                    warn!(%error, "auto-action refused, passing turn");
                    self.pass_turn();
                }
            }
            None => {
                info!(%side, "turn deadline expired with nothing legal, passing turn");
                self.pass_turn();
            }
        }
    }

    fn pass_turn(&mut self) {
        let change = self.arbiter.force_pass();
        self.broadcast(true, false);
        self.announce_turn(change.turn);
    }

    fn tick_round_delay(&mut self, dt: f32) {
        let Some(left) = self.round_delay_left.as_mut() else {
            return;
        };
        *left -= dt;
        if *left > 0.0 {
            return;
        }
        self.round_delay_left = None;
        let next = self.arbiter.round() + 1;
        self.begin_round(next);
        self.broadcast(true, false);
    }

    fn tick_silence(&mut self, dt: f32) {
        let Some(timeout) = self.config.silence_timeout() else {
            return;
        };
        if self.link.is_none() || self.session.is_authority() || self.finalizer.is_decided() {
            return;
        }
        self.silence += dt;
        if self.silence < timeout {
            return;
        }
        warn!(silence = self.silence, "opponent silent past timeout, finalizing as disconnect");
        let local_id = self.session.local_id().cloned();
        let record = OutcomeRecord::forfeit(
            self.session.remote_id().cloned(),
            local_id.clone(),
            self.sim.details(),
        )
        .with_reason(FinishReason::Disconnect);
        let outcome = record.local_view(local_id.as_ref());
        self.decide(record, outcome);
    }

    // === Outbound ===

    fn broadcast(&mut self, force: bool, init: bool) {
        if self.link.is_none() || !self.session.is_authority() {
            return;
        }
        if !self.broadcaster.should_send(force) {
            return;
        }
        let snapshot = self.build_snapshot();
        self.stats.snapshots_sent += 1;
        let payload = if init {
            ActionPayload::Init { snapshot }
        } else {
            ActionPayload::State { snapshot }
        };
        self.send(payload);
    }

    fn build_snapshot(&mut self) -> Snapshot<S::State> {
        self.revision += 1;
        let mut snapshot = Snapshot::new(
            self.revision,
            self.arbiter.round(),
            self.arbiter.turn(),
            self.sim.pack_state(),
        );
        snapshot.round_over = self.round_over;
        snapshot.pending_outcome = self.finalizer.is_decided();
        snapshot.turn_time_left_ms = self
            .arbiter
            .state()
            .deadline_left
            .map(|left| (left.max(0.0) * 1000.0) as u64);
        if self.config.snapshot_checksums {
            snapshot.checksum = codec::state_checksum(&snapshot.state)
                .map_err(|error| warn!(%error, "could not checksum snapshot"))
                .ok();
            snapshot.stream = Some(self.stream.state());
        }
        snapshot
    }

    fn snap_continuous(&mut self) {
        for field in self.sim.continuous() {
            self.interp.snap(&field.name, field.value);
        }
    }

    fn send(&mut self, payload: ActionPayload<S::State, S::Action>) {
        if let Some(link) = self.link.as_mut() {
            link.send(payload);
        }
    }

    // === Accessors ===

    /// Resolved session.
    #[must_use]
    pub fn session(&self) -> &DuelSession {
        &self.session
    }

    /// The simulation.
    #[must_use]
    pub fn sim(&self) -> &S {
        &self.sim
    }

    /// Turn arbiter.
    #[must_use]
    pub fn arbiter(&self) -> &TurnArbiter {
        &self.arbiter
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.arbiter.phase()
    }

    /// Side on the move.
    #[must_use]
    pub fn turn(&self) -> Side {
        self.arbiter.turn()
    }

    /// Current round.
    #[must_use]
    pub fn round(&self) -> u32 {
        self.arbiter.round()
    }

    /// Last snapshot revision sent (authority) or applied (other peer).
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Shared stream of the current round.
    #[must_use]
    pub fn stream(&self) -> &DeterministicStream {
        &self.stream
    }

    /// Presentation smoothing.
    #[must_use]
    pub fn interp(&self) -> &Interpolator {
        &self.interp
    }

    /// Presentation smoothing, for feeding targets.
    pub fn interp_mut(&mut self) -> &mut Interpolator {
        &mut self.interp
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &DuelConfig {
        &self.config
    }

    /// Engine counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Transport counters, when networked.
    #[must_use]
    pub fn link_stats(&self) -> Option<LinkStats> {
        self.link.as_ref().map(TransportLink::stats)
    }

    /// A terminal outcome is pending or delivered.
    #[must_use]
    pub fn is_decided(&self) -> bool {
        self.finalizer.is_decided()
    }

    /// The result has been handed off.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.finalizer.completed()
    }

    /// Local outcome, once decided.
    #[must_use]
    pub fn local_outcome(&self) -> Option<Outcome> {
        self.finalizer.local_outcome()
    }

    /// The handed-off result.
    #[must_use]
    pub fn result(&self) -> Option<&MatchResult> {
        self.finalizer.result()
    }

    /// Take the handed-off result; yields it at most once.
    pub fn take_result(&mut self) -> Option<MatchResult> {
        if self.handed_off {
            return None;
        }
        let result = self.finalizer.result().cloned()?;
        self.handed_off = true;
        Some(result)
    }
}
