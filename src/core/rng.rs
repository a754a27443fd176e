//! Deterministic random streams shared by both peers.
//!
//! ## Key Features
//!
//! - **Deterministic**: same seed material + round salt produce an identical
//!   sequence on both peers, so shuffles, tile bags and mine layouts are
//!   computed locally instead of transmitted
//! - **Per-round salting**: consecutive rounds never replay a prior sequence
//! - **Context streams**: independent sub-streams (e.g. auto-move picks) that
//!   do not advance the parent
//! - **Fingerprintable**: `state()` is compared against the authority's copy
//!   to detect call-order divergence
//!
//! ## Usage
//!
//! ```
//! use duel_sync::core::DeterministicStream;
//!
//! let mut host = DeterministicStream::derive("duel-42", 1);
//! let mut guest = DeterministicStream::derive("duel-42", 1);
//!
//! let mut deck_a: Vec<u32> = (0..52).collect();
//! let mut deck_b = deck_a.clone();
//! host.shuffle(&mut deck_a);
//! guest.shuffle(&mut deck_b);
//! assert_eq!(deck_a, deck_b);
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher24;
use std::hash::Hasher;

const ROUND_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Fixed SipHash keys; every peer must use the same pair.
const DIGEST_KEYS: (u64, u64) = (0x6475_656c_2d73_796e, 0x632d_7374_7265_616d);

/// 64-bit digest of byte chunks, identical on every platform.
///
/// Inputs are raw bytes (integers go in as little-endian), so word size
/// and endianness never change the result.
#[must_use]
pub fn digest(chunks: &[&[u8]]) -> u64 {
    let mut hasher = SipHasher24::new_with_keys(DIGEST_KEYS.0, DIGEST_KEYS.1);
    for chunk in chunks {
        hasher.write(chunk);
    }
    hasher.finish()
}

/// Stable 64-bit hash of seed material.
///
/// Hashes raw bytes so the value does not depend on `Hash` impl details
/// or the host's word size.
#[must_use]
pub fn seed_of(material: &str) -> u64 {
    digest(&[material.as_bytes()])
}

/// Seeded ChaCha8 stream keyed by `hash(seed_material) + round_salt`.
#[derive(Clone, Debug)]
pub struct DeterministicStream {
    inner: ChaCha8Rng,
    seed: u64,
}

impl DeterministicStream {
    /// Create a stream from a raw seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Derive the stream for `round_salt` from shared seed material
    /// (normally the duel id).
    #[must_use]
    pub fn derive(seed_material: &str, round_salt: u64) -> Self {
        let seed = seed_of(seed_material).wrapping_add(round_salt.wrapping_mul(ROUND_MIX));
        Self::new(seed)
    }

    /// The seed this stream was created from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Create an independent stream for a specific context.
    ///
    /// The same context always produces the same stream from the same seed,
    /// and the parent is not advanced.
    #[must_use]
    pub fn for_context(&self, context: &str) -> Self {
        Self::new(digest(&[&self.seed.to_le_bytes(), context.as_bytes()]))
    }

    /// Generate a random integer in the given range.
    pub fn gen_range(&mut self, range: std::ops::Range<i32>) -> i32 {
        self.inner.gen_range(range)
    }

    /// Generate a random usize in the given range.
    pub fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        self.inner.gen_range(range)
    }

    /// Generate a random boolean with given probability of true.
    pub fn gen_bool(&mut self, probability: f64) -> bool {
        self.inner.gen_bool(probability)
    }

    /// Shuffle a slice in place.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        use rand::seq::SliceRandom;
        slice.shuffle(&mut self.inner);
    }

    /// Choose a random element from a slice.
    #[must_use]
    pub fn choose<'a, T>(&mut self, slice: &'a [T]) -> Option<&'a T> {
        use rand::seq::SliceRandom;
        slice.choose(&mut self.inner)
    }

    /// Pick `amount` distinct elements (clamped to the slice length).
    pub fn sample<T: Clone>(&mut self, slice: &[T], amount: usize) -> Vec<T> {
        let amount = amount.min(slice.len());
        rand::seq::index::sample(&mut self.inner, slice.len(), amount)
            .into_iter()
            .map(|i| slice[i].clone())
            .collect()
    }

    /// Current position, used as the desync checksum.
    #[must_use]
    pub fn state(&self) -> StreamState {
        StreamState {
            seed: self.seed,
            word_pos: self.inner.get_word_pos(),
        }
    }

    /// Compact 64-bit digest of `state()` for logs and quick comparison.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let word_pos = self.inner.get_word_pos();
        digest(&[&self.seed.to_le_bytes(), &word_pos.to_le_bytes()])
    }

    /// Restore from a saved state.
    #[must_use]
    pub fn from_state(state: &StreamState) -> Self {
        let mut inner = ChaCha8Rng::seed_from_u64(state.seed);
        inner.set_word_pos(state.word_pos);
        Self {
            inner,
            seed: state.seed,
        }
    }
}

/// Serializable stream position.
///
/// Two peers with equal `StreamState` have drawn the same number of words
/// from the same seed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamState {
    /// Seed of the stream.
    pub seed: u64,
    /// ChaCha8 word position (128-bit counter), carried as a decimal string.
    #[serde(with = "word_pos_repr")]
    pub word_pos: u128,
}

mod word_pos_repr {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determinism() {
        let mut rng1 = DeterministicStream::derive("duel-7", 3);
        let mut rng2 = DeterministicStream::derive("duel-7", 3);

        for _ in 0..100 {
            assert_eq!(rng1.gen_range(0..1000), rng2.gen_range(0..1000));
        }
        assert_eq!(rng1.state(), rng2.state());
    }

    #[test]
    fn test_round_salt_changes_sequence() {
        let mut round1 = DeterministicStream::derive("duel-7", 1);
        let mut round2 = DeterministicStream::derive("duel-7", 2);

        let seq1: Vec<_> = (0..10).map(|_| round1.gen_range(0..1000)).collect();
        let seq2: Vec<_> = (0..10).map(|_| round2.gen_range(0..1000)).collect();

        assert_ne!(seq1, seq2);
    }

    #[test]
    fn test_different_material() {
        assert_ne!(seed_of("duel-1"), seed_of("duel-2"));
        assert_eq!(seed_of("duel-1"), seed_of("duel-1"));
    }

    #[test]
    fn test_context_does_not_advance_parent() {
        let rng = DeterministicStream::derive("duel-7", 1);
        let before = rng.state();
        let mut ctx = rng.for_context("auto");
        let _ = ctx.gen_range(0..10);
        assert_eq!(rng.state(), before);
    }

    #[test]
    fn test_context_is_deterministic() {
        let rng1 = DeterministicStream::new(42);
        let rng2 = DeterministicStream::new(42);

        let mut ctx1 = rng1.for_context("auto-1");
        let mut ctx2 = rng2.for_context("auto-1");
        let mut other = rng1.for_context("auto-2");

        let a: Vec<_> = (0..10).map(|_| ctx1.gen_range(0..1000)).collect();
        let b: Vec<_> = (0..10).map(|_| ctx2.gen_range(0..1000)).collect();
        let c: Vec<_> = (0..10).map(|_| other.gen_range(0..1000)).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_digest_is_fixed_width() {
        // Pinned so a 32-bit peer and a 64-bit peer agree on seeds.
        assert_eq!(seed_of("duel-42"), digest(&[b"duel-42"]));
        assert_eq!(digest(&[b"duel-", b"42"]), digest(&[b"duel-42"]));
        assert_ne!(seed_of("duel-42"), seed_of("duel-43"));

        let stream = DeterministicStream::new(7);
        let expected = DeterministicStream::new(digest(&[&7u64.to_le_bytes(), b"auto-1-0"]));
        assert_eq!(stream.for_context("auto-1-0").seed(), expected.seed());
    }

    #[test]
    fn test_fingerprint_tracks_position() {
        let mut a = DeterministicStream::derive("duel-7", 1);
        let b = DeterministicStream::derive("duel-7", 1);
        assert_eq!(a.fingerprint(), b.fingerprint());

        a.gen_bool(0.5);
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(DeterministicStream::from_state(&a.state()).fingerprint(), a.fingerprint());
    }

    #[test]
    fn test_shuffle_keeps_elements() {
        let mut rng = DeterministicStream::new(42);
        let mut data: Vec<u32> = (1..=10).collect();
        rng.shuffle(&mut data);

        data.sort_unstable();
        assert_eq!(data, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_sample_distinct_and_clamped() {
        let mut rng = DeterministicStream::new(9);
        let items = vec!["a", "b", "c", "d"];

        let mut picked = rng.sample(&items, 3);
        assert_eq!(picked.len(), 3);
        picked.sort_unstable();
        picked.dedup();
        assert_eq!(picked.len(), 3);

        assert_eq!(rng.sample(&items, 10).len(), 4);
    }

    #[test]
    fn test_choose() {
        let mut rng = DeterministicStream::new(42);
        let items = vec![1, 2, 3];
        assert!(items.contains(rng.choose(&items).unwrap()));

        let empty: Vec<i32> = vec![];
        assert!(rng.choose(&empty).is_none());
    }

    #[test]
    fn test_state_restore() {
        let mut rng = DeterministicStream::derive("duel-9", 2);
        for _ in 0..100 {
            rng.gen_range(0..1000);
        }

        let state = rng.state();
        let expected: Vec<_> = (0..10).map(|_| rng.gen_range(0..1000)).collect();

        let mut restored = DeterministicStream::from_state(&state);
        let actual: Vec<_> = (0..10).map(|_| restored.gen_range(0..1000)).collect();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_state_serde() {
        let state = StreamState {
            seed: 42,
            word_pos: u128::from(u64::MAX) + 7,
        };

        let json = serde_json::to_string(&state).unwrap();
        let back: StreamState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, back);
    }
}
