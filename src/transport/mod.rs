//! Transport adapter over the external duel-message bus.
//!
//! ## Contract
//!
//! - `send` is fire-and-forget; the adapter catches and logs failures so
//!   flaky networking never reaches the game loop
//! - `poll` is non-blocking and drained until empty each tick
//! - messages from one sender arrive in send order; nothing is guaranteed
//!   across senders, and messages may be dropped
//! - echoes of our own messages are discarded

pub mod link;
pub mod loopback;

pub use link::{LinkStats, TransportLink};
pub use loopback::{BusStats, LoopbackBus, LoopbackPeer};

use crate::core::{ParticipantId, Result};

/// Raw frame popped from the bus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Sender as stamped by the bus.
    pub from: ParticipantId,
    /// Encoded `DuelMessage`.
    pub bytes: Vec<u8>,
}

/// Duel-message bus handle.
pub trait DuelTransport {
    /// Publish a frame to the duel.
    fn send(&mut self, duel_id: &str, bytes: Vec<u8>) -> Result<()>;

    /// Pop the next inbound frame, if any. Never blocks.
    fn poll(&mut self, duel_id: &str) -> Result<Option<Envelope>>;
}

impl<T: DuelTransport + ?Sized> DuelTransport for Box<T> {
    fn send(&mut self, duel_id: &str, bytes: Vec<u8>) -> Result<()> {
        (**self).send(duel_id, bytes)
    }

    fn poll(&mut self, duel_id: &str) -> Result<Option<Envelope>> {
        (**self).poll(duel_id)
    }
}
