//! Duel wire protocol: messages, snapshots, codec.

pub mod message;
pub mod snapshot;
pub mod codec;

pub use message::{ActionPayload, DuelMessage};
pub use snapshot::{Snapshot, SnapshotBroadcaster};
pub use codec::{decode, encode, state_checksum};
