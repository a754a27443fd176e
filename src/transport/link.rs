//! Error-swallowing link between a session and the bus.

use serde::de::DeserializeOwned;
use serde::Serialize;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::DuelTransport;
use crate::core::ParticipantId;
use crate::protocol::{codec, ActionPayload, DuelMessage};

/// Link counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames handed to the bus.
    pub sent: u64,
    /// Sends that failed (encode or bus).
    pub send_failures: u64,
    /// Frames accepted from the bus.
    pub received: u64,
    /// Own frames echoed back and discarded.
    pub echoes: u64,
    /// Frames that failed to decode.
    pub malformed: u64,
    /// Poll calls that errored.
    pub poll_failures: u64,
}

/// A transport bound to one duel and one local participant.
pub struct TransportLink<T> {
    transport: T,
    duel_id: String,
    local_id: ParticipantId,
    stats: LinkStats,
}

impl<T: DuelTransport> TransportLink<T> {
    /// Bind a transport.
    pub fn new(transport: T, duel_id: impl Into<String>, local_id: ParticipantId) -> Self {
        Self {
            transport,
            duel_id: duel_id.into(),
            local_id,
            stats: LinkStats::default(),
        }
    }

    /// Send a payload. Failures are logged and counted, never returned.
    pub fn send<St: Serialize, A: Serialize>(&mut self, action: ActionPayload<St, A>) {
        let kind = action.kind();
        let msg = DuelMessage::new(self.local_id.clone(), action);
        let bytes = match codec::encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(duel_id = %self.duel_id, kind, error = %e, "failed to encode duel action");
                return;
            }
        };
        match self.transport.send(&self.duel_id, bytes) {
            Ok(()) => {
                self.stats.sent += 1;
                trace!(duel_id = %self.duel_id, kind, "sent duel action");
            }
            Err(e) => {
                self.stats.send_failures += 1;
                warn!(duel_id = %self.duel_id, kind, error = %e, "failed to send duel action");
            }
        }
    }

    /// Poll until the bus is empty, returning decoded messages in arrival order.
    pub fn drain<St: DeserializeOwned, A: DeserializeOwned>(
        &mut self,
    ) -> SmallVec<[DuelMessage<St, A>; 8]> {
        let mut out = SmallVec::new();
        loop {
            let envelope = match self.transport.poll(&self.duel_id) {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break,
                Err(e) => {
                    self.stats.poll_failures += 1;
                    warn!(duel_id = %self.duel_id, error = %e, "failed to poll duel actions");
                    break;
                }
            };
            if envelope.from == self.local_id {
                self.stats.echoes += 1;
                continue;
            }
            match codec::decode::<St, A>(&envelope.bytes) {
                Ok(msg) if msg.from == self.local_id => self.stats.echoes += 1,
                Ok(msg) => {
                    self.stats.received += 1;
                    out.push(msg);
                }
                Err(e) => {
                    self.stats.malformed += 1;
                    debug!(
                        duel_id = %self.duel_id,
                        from = %envelope.from,
                        error = %e,
                        "dropping malformed frame"
                    );
                }
            }
        }
        out
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Duel this link is bound to.
    #[must_use]
    pub fn duel_id(&self) -> &str {
        &self.duel_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Side;
    use crate::transport::LoopbackBus;

    type Payload = ActionPayload<Vec<u8>, u8>;

    #[test]
    fn test_send_and_drain() {
        let bus = LoopbackBus::new();
        let mut alice =
            TransportLink::new(bus.peer("d1", "alice"), "d1", ParticipantId::new("alice"));
        let mut bob = TransportLink::new(bus.peer("d1", "bob"), "d1", ParticipantId::new("bob"));

        alice.send::<Vec<u8>, u8>(ActionPayload::Turn { turn: Side::Second, round: 1 });
        alice.send::<Vec<u8>, u8>(ActionPayload::Turn { turn: Side::First, round: 1 });

        let msgs = bob.drain::<Vec<u8>, u8>();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].action, Payload::Turn { turn: Side::Second, round: 1 });
        assert_eq!(msgs[1].action, Payload::Turn { turn: Side::First, round: 1 });
        assert!(bob.drain::<Vec<u8>, u8>().is_empty());
    }

    #[test]
    fn test_echoes_discarded() {
        let bus = LoopbackBus::with_echo();
        let mut alice =
            TransportLink::new(bus.peer("d1", "alice"), "d1", ParticipantId::new("alice"));
        let _bob = bus.peer("d1", "bob");

        alice.send::<Vec<u8>, u8>(ActionPayload::Forfeit { by: ParticipantId::new("alice") });
        assert!(alice.drain::<Vec<u8>, u8>().is_empty());
        assert_eq!(alice.stats().echoes, 1);
    }

    #[test]
    fn test_send_failure_is_swallowed() {
        let bus = LoopbackBus::new();
        bus.set_fail_sends(true);
        let mut alice =
            TransportLink::new(bus.peer("d1", "alice"), "d1", ParticipantId::new("alice"));

        alice.send::<Vec<u8>, u8>(ActionPayload::Turn { turn: Side::Second, round: 1 });
        assert_eq!(alice.stats().sent, 0);
        assert_eq!(alice.stats().send_failures, 1);
    }

    #[test]
    fn test_malformed_frames_skipped() {
        let bus = LoopbackBus::new();
        let mut bob = TransportLink::new(bus.peer("d1", "bob"), "d1", ParticipantId::new("bob"));
        let mut raw = bus.peer("d1", "alice");
        raw.send("d1", b"garbage".to_vec()).unwrap();

        assert!(bob.drain::<Vec<u8>, u8>().is_empty());
        assert_eq!(bob.stats().malformed, 1);
    }
}
