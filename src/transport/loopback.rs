//! In-memory duel bus for local play-tests and integration tests.
//!
//! Single-threaded like the frame loop it serves. Each attached peer has
//! its own FIFO queue per duel, so per-sender ordering holds. Fault
//! injection can drop frames or fail sends.

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::{DuelTransport, Envelope};
use crate::core::{DuelError, ParticipantId, Result};

/// Bus counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BusStats {
    /// `send` calls made by any peer.
    pub sends: u64,
    /// `poll` calls made by any peer.
    pub polls: u64,
    /// Frames queued for a recipient.
    pub delivered: u64,
    /// Frames dropped by fault injection.
    pub dropped: u64,
}

#[derive(Default)]
struct BusInner {
    members: FxHashMap<String, Vec<ParticipantId>>,
    queues: FxHashMap<(String, ParticipantId), VecDeque<Envelope>>,
    echo: bool,
    fail_sends: bool,
    drop_every: Option<u64>,
    frame_counter: u64,
    stats: BusStats,
}

/// Shared in-memory bus.
#[derive(Clone, Default)]
pub struct LoopbackBus {
    inner: Rc<RefCell<BusInner>>,
}

impl LoopbackBus {
    /// Bus that never echoes frames back to their sender.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bus that also delivers every frame back to its sender.
    #[must_use]
    pub fn with_echo() -> Self {
        let bus = Self::default();
        bus.inner.borrow_mut().echo = true;
        bus
    }

    /// Attach a participant to a duel and return its handle.
    pub fn peer(&self, duel_id: &str, id: impl Into<ParticipantId>) -> LoopbackPeer {
        let id = id.into();
        let mut inner = self.inner.borrow_mut();
        let members = inner.members.entry(duel_id.to_string()).or_default();
        if !members.contains(&id) {
            members.push(id.clone());
        }
        inner.queues.entry((duel_id.to_string(), id.clone())).or_default();
        LoopbackPeer {
            bus: self.clone(),
            id,
        }
    }

    /// Make every subsequent send fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.borrow_mut().fail_sends = fail;
    }

    /// Drop every `n`-th frame (per recipient delivery). `None` disables.
    pub fn set_drop_every(&self, n: Option<u64>) {
        self.inner.borrow_mut().drop_every = n.filter(|&n| n > 0);
    }

    /// Frames waiting for a participant.
    #[must_use]
    pub fn pending(&self, duel_id: &str, id: &ParticipantId) -> usize {
        self.inner
            .borrow()
            .queues
            .get(&(duel_id.to_string(), id.clone()))
            .map_or(0, VecDeque::len)
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> BusStats {
        self.inner.borrow().stats
    }
}

/// One participant's handle on the bus.
#[derive(Clone)]
pub struct LoopbackPeer {
    bus: LoopbackBus,
    id: ParticipantId,
}

impl LoopbackPeer {
    /// Participant this handle sends as.
    #[must_use]
    pub fn id(&self) -> &ParticipantId {
        &self.id
    }
}

impl DuelTransport for LoopbackPeer {
    fn send(&mut self, duel_id: &str, bytes: Vec<u8>) -> Result<()> {
        let mut guard = self.bus.inner.borrow_mut();
        let inner = &mut *guard;
        inner.stats.sends += 1;
        if inner.fail_sends {
            return Err(DuelError::Transport("loopback bus rejected send".into()));
        }

        let members = inner.members.get(duel_id).cloned().unwrap_or_default();
        for member in members {
            if member == self.id && !inner.echo {
                continue;
            }
            inner.frame_counter += 1;
            if inner.drop_every.is_some_and(|n| inner.frame_counter % n == 0) {
                inner.stats.dropped += 1;
                continue;
            }
            let envelope = Envelope {
                from: self.id.clone(),
                bytes: bytes.clone(),
            };
            inner
                .queues
                .entry((duel_id.to_string(), member))
                .or_default()
                .push_back(envelope);
            inner.stats.delivered += 1;
        }
        Ok(())
    }

    fn poll(&mut self, duel_id: &str) -> Result<Option<Envelope>> {
        let mut inner = self.bus.inner.borrow_mut();
        inner.stats.polls += 1;
        Ok(inner
            .queues
            .get_mut(&(duel_id.to_string(), self.id.clone()))
            .and_then(VecDeque::pop_front))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_per_sender() {
        let bus = LoopbackBus::new();
        let mut alice = bus.peer("d1", "alice");
        let mut bob = bus.peer("d1", "bob");

        for i in 0..5u8 {
            alice.send("d1", vec![i]).unwrap();
        }
        for i in 0..5u8 {
            let env = bob.poll("d1").unwrap().unwrap();
            assert_eq!(env.bytes, vec![i]);
            assert_eq!(env.from, ParticipantId::new("alice"));
        }
        assert!(bob.poll("d1").unwrap().is_none());
        assert!(alice.poll("d1").unwrap().is_none());
    }

    #[test]
    fn test_duels_are_isolated() {
        let bus = LoopbackBus::new();
        let mut alice = bus.peer("d1", "alice");
        let mut bob = bus.peer("d2", "bob");

        alice.send("d1", vec![1]).unwrap();
        assert!(bob.poll("d2").unwrap().is_none());
    }

    #[test]
    fn test_drop_every() {
        let bus = LoopbackBus::new();
        let mut alice = bus.peer("d1", "alice");
        let bob = bus.peer("d1", "bob");
        bus.set_drop_every(Some(2));

        for i in 0..4u8 {
            alice.send("d1", vec![i]).unwrap();
        }
        assert_eq!(bus.pending("d1", bob.id()), 2);
        assert_eq!(bus.stats().dropped, 2);
    }

    #[test]
    fn test_fail_sends() {
        let bus = LoopbackBus::new();
        let mut alice = bus.peer("d1", "alice");
        bus.set_fail_sends(true);
        assert!(matches!(alice.send("d1", vec![0]), Err(DuelError::Transport(_))));
    }
}
