//! Wire encoding and state checksums.
//!
//! Messages travel as JSON, the shape the duel bus already carries.
//! Checksums hash the compact bincode encoding of the packed state, which
//! is the same byte sequence on both peers for equal states. The digest is
//! fixed-width, so 32-bit and 64-bit peers agree.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::message::DuelMessage;
use crate::core::rng::digest;
use crate::core::{DuelError, Result};

/// Encode a message for the bus.
pub fn encode<St: Serialize, A: Serialize>(msg: &DuelMessage<St, A>) -> Result<Vec<u8>> {
    serde_json::to_vec(msg).map_err(|e| DuelError::Codec(e.to_string()))
}

/// Decode a message from the bus.
pub fn decode<St: DeserializeOwned, A: DeserializeOwned>(
    bytes: &[u8],
) -> Result<DuelMessage<St, A>> {
    serde_json::from_slice(bytes).map_err(|e| DuelError::Codec(e.to_string()))
}

/// Checksum of a packed state.
pub fn state_checksum<St: Serialize>(state: &St) -> Result<u64> {
    let bytes = bincode::serialize(state).map_err(|e| DuelError::Codec(e.to_string()))?;
    Ok(digest(&[&bytes]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ParticipantId, Side};
    use crate::protocol::{ActionPayload, Snapshot};

    #[test]
    fn test_encode_decode() {
        let msg: DuelMessage<Vec<u8>, u8> = DuelMessage::new(
            ParticipantId::new("alice"),
            ActionPayload::State {
                snapshot: Snapshot::new(1, 1, Side::First, vec![1, 2, 3]),
            },
        );
        let bytes = encode(&msg).unwrap();
        let back: DuelMessage<Vec<u8>, u8> = decode(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode::<Vec<u8>, u8>(b"{not json").unwrap_err();
        assert!(matches!(err, DuelError::Codec(_)));
    }

    #[test]
    fn test_checksum_tracks_state() {
        let a = state_checksum(&vec![4u8, 4, 4, 4]).unwrap();
        let b = state_checksum(&vec![4u8, 4, 4, 4]).unwrap();
        let c = state_checksum(&vec![4u8, 4, 5, 4]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
