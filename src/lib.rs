//! # duel-sync
//!
//! Host-authoritative synchronization core for two-player minigame duels.
//!
//! ## Design Principles
//!
//! 1. **Single Writer**: Participant 0 owns the simulation. The other peer
//!    only sends intents and replaces its state from snapshots.
//!
//! 2. **Game-Agnostic**: Minigames plug in through the `Simulation`
//!    contract; the core never interprets game state.
//!
//! 3. **Deterministic Streams**: Both peers derive the same seeded stream
//!    per round from the duel id, so shuffles and deals agree without
//!    exchanging them.
//!
//! 4. **Exactly One Result**: The first terminal trigger wins and the host
//!    receives exactly one `MatchResult`.
//!
//! ## Modules
//!
//! - `core`: Participants, sides, deterministic streams, configuration, errors
//! - `transport`: Duel-bus trait, error-swallowing link, in-memory loopback bus
//! - `session`: Local seat and authority resolution
//! - `protocol`: Wire messages, snapshots, codec
//! - `relay`: Intent relay and authority-side validation
//! - `arbiter`: Turn phases and deadlines
//! - `interp`: Presentation smoothing for continuous values
//! - `outcome`: Outcome records and the one-shot finalizer
//! - `simulation`: The contract minigames implement
//! - `duel`: The engine tying it all together
//! - `registry`: Minigame catalog and duel wheel
//! - `host`: Cumulative stats fed by results
//! - `games`: Reference adapters

pub mod core;
pub mod transport;
pub mod session;
pub mod protocol;
pub mod relay;
pub mod arbiter;
pub mod interp;
pub mod outcome;
pub mod simulation;
pub mod duel;
pub mod registry;
pub mod host;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    seed_of, DeterministicStream, StreamState,
    DuelConfig, StartingSide, TurnMode,
    DuelError, RejectReason, Result,
    ParticipantId, Side, SideMap,
};

pub use crate::transport::{DuelTransport, Envelope, LoopbackBus, LoopbackPeer, TransportLink};

pub use crate::session::{DuelSession, MatchContext};

pub use crate::protocol::{ActionPayload, DuelMessage, Snapshot, SnapshotBroadcaster};

pub use crate::arbiter::{Phase, TurnArbiter, TurnState};

pub use crate::outcome::{FinishReason, Finalizer, MatchResult, Outcome, OutcomeRecord};

pub use crate::simulation::{ActionOutcome, ContinuousField, Simulation, Terminal};

pub use crate::duel::{DuelEngine, DuelEvent, EngineStats};

pub use crate::registry::{MinigameEntry, MinigameRegistry};

pub use crate::host::HostContext;
