//! Participant identification and per-side data storage.
//!
//! ## ParticipantId
//!
//! Opaque, stable player identifier handed in by the matchmaking context.
//! Outcomes and wire messages are always keyed by `ParticipantId`, never by
//! "local"/"remote" labels.
//!
//! ## Side
//!
//! Seat index inside a duel (0 or 1). The roster order decides the seat:
//! participant 0 is the authority and the default starting side.
//!
//! ## SideMap
//!
//! Two-entry storage indexed by `Side`.

use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

use super::error::DuelError;

/// Opaque participant identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create a new participant ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier (treated as "absent").
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ParticipantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seat inside a duel.
///
/// Serialized as the bare index (`0` or `1`) so wire messages read
/// `{"kind": "turn", "turn": 1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    /// Participant 0 (authority).
    First,
    /// Participant 1.
    Second,
}

impl Side {
    /// Both sides in roster order.
    pub const BOTH: [Side; 2] = [Side::First, Side::Second];

    /// Get the side from a roster index.
    #[must_use]
    pub const fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Side::First),
            1 => Some(Side::Second),
            _ => None,
        }
    }

    /// Roster index (0 or 1).
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Side::First => 0,
            Side::Second => 1,
        }
    }

    /// The opposing side.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Side::First => Side::Second,
            Side::Second => Side::First,
        }
    }
}

impl From<Side> for u8 {
    fn from(side: Side) -> Self {
        side.index() as u8
    }
}

impl TryFrom<u8> for Side {
    type Error = DuelError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Side::from_index(value as usize).ok_or(DuelError::InvalidSide(value))
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "side {}", self.index())
    }
}

/// Per-side data storage with O(1) access.
///
/// ## Example
///
/// ```
/// use duel_sync::core::{Side, SideMap};
///
/// let mut score: SideMap<u32> = SideMap::with_value(0);
/// score[Side::Second] += 3;
/// assert_eq!(score[Side::First], 0);
/// assert_eq!(score[Side::Second], 3);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SideMap<T> {
    data: [T; 2],
}

impl<T> SideMap<T> {
    /// Create a new SideMap with values from a factory function.
    pub fn new(factory: impl Fn(Side) -> T) -> Self {
        Self {
            data: [factory(Side::First), factory(Side::Second)],
        }
    }

    /// Create a SideMap from explicit values in roster order.
    pub fn from_pair(first: T, second: T) -> Self {
        Self {
            data: [first, second],
        }
    }

    /// Create a new SideMap with both entries set to the same value.
    pub fn with_value(value: T) -> Self
    where
        T: Clone,
    {
        Self::new(|_| value.clone())
    }

    /// Create a new SideMap with default values.
    pub fn with_default() -> Self
    where
        T: Default,
    {
        Self::new(|_| T::default())
    }

    /// Get a reference to a side's data.
    #[must_use]
    pub fn get(&self, side: Side) -> &T {
        &self.data[side.index()]
    }

    /// Get a mutable reference to a side's data.
    pub fn get_mut(&mut self, side: Side) -> &mut T {
        &mut self.data[side.index()]
    }

    /// Iterate over (Side, &T) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        Side::BOTH.into_iter().zip(self.data.iter())
    }
}

impl<T> Index<Side> for SideMap<T> {
    type Output = T;

    fn index(&self, side: Side) -> &Self::Output {
        self.get(side)
    }
}

impl<T> IndexMut<Side> for SideMap<T> {
    fn index_mut(&mut self, side: Side) -> &mut Self::Output {
        self.get_mut(side)
    }
}
