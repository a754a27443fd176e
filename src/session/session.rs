//! Session resolution: who we are and who holds authority.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::{DuelError, ParticipantId, Result, Side};

/// Launch context handed in by the host scene.
///
/// Every field is optional; a context missing any of them runs offline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchContext {
    /// Duel channel id.
    pub duel_id: Option<String>,
    /// Roster in seat order.
    pub participants: Vec<ParticipantId>,
    /// Local player's id.
    pub local_player_id: Option<ParticipantId>,
    /// A duel message bus is available.
    pub has_transport: bool,
}

impl Default for MatchContext {
    fn default() -> Self {
        Self {
            duel_id: None,
            participants: Vec::new(),
            local_player_id: None,
            has_transport: true,
        }
    }
}

impl MatchContext {
    /// Networked context for two participants.
    pub fn duel(duel_id: impl Into<String>, participants: [&str; 2], local: &str) -> Self {
        Self {
            duel_id: Some(duel_id.into()),
            participants: participants.iter().map(|&id| ParticipantId::new(id)).collect(),
            local_player_id: Some(ParticipantId::new(local)),
            has_transport: true,
        }
    }

    /// Context with no network at all.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            has_transport: false,
            ..Self::default()
        }
    }
}

/// How the local index was found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The local id is in the roster verbatim.
    Exact,
    /// A roster id and the local id contain one another.
    Loose,
    /// No match; seat 0 assumed.
    Fallback,
}

/// Resolved session. Computed once at launch and never re-evaluated.
#[derive(Clone, Debug)]
pub struct DuelSession {
    duel_id: Option<String>,
    participants: Vec<ParticipantId>,
    local_id: Option<ParticipantId>,
    local_index: usize,
    resolution: Resolution,
    is_authority: bool,
    net_enabled: bool,
}

impl DuelSession {
    /// Resolve a launch context.
    ///
    /// Rosters longer than two are truncated to the first two seats.
    /// Fewer than two participants silently forces offline play.
    #[must_use]
    pub fn resolve(ctx: &MatchContext) -> Self {
        let mut participants = ctx.participants.clone();
        if participants.len() > 2 {
            warn!(count = participants.len(), "roster larger than a duel, keeping first two seats");
            participants.truncate(2);
        }

        let mut local_id = ctx.local_player_id.clone().filter(|id| !id.is_empty());
        let (local_index, resolution) = match &local_id {
            Some(local) => locate(&participants, local),
            None => (0, Resolution::Fallback),
        };
        // Loose matches speak under the roster spelling.
        if resolution == Resolution::Loose {
            local_id = participants.get(local_index).cloned();
        }

        let duel_id = ctx.duel_id.clone().filter(|id| !id.is_empty());
        // An unmatched local id stays offline.
        let net_enabled = ctx.has_transport
            && duel_id.is_some()
            && local_id.is_some()
            && participants.len() >= 2
            && resolution != Resolution::Fallback;
        let is_authority = local_index == 0;

        debug!(
            duel_id = ?duel_id,
            local_index,
            ?resolution,
            is_authority,
            net_enabled,
            "duel session resolved"
        );

        Self {
            duel_id,
            participants,
            local_id,
            local_index,
            resolution,
            is_authority,
            net_enabled,
        }
    }

    /// Like `resolve`, but an unmatched local id in an otherwise networked
    /// context is an error instead of a silent drop to offline play.
    pub fn resolve_strict(ctx: &MatchContext) -> Result<Self> {
        let session = Self::resolve(ctx);
        let networked = ctx.has_transport
            && session.duel_id.is_some()
            && session.local_id.is_some()
            && session.participants.len() >= 2;
        if session.resolution == Resolution::Fallback && networked {
            return Err(DuelError::ParticipantResolution {
                local_id: session.local_id.map(|id| id.to_string()).unwrap_or_default(),
            });
        }
        Ok(session)
    }

    /// Duel channel id.
    #[must_use]
    pub fn duel_id(&self) -> Option<&str> {
        self.duel_id.as_deref()
    }

    /// Roster in seat order (at most two).
    #[must_use]
    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    /// Local player's id.
    #[must_use]
    pub fn local_id(&self) -> Option<&ParticipantId> {
        self.local_id.as_ref()
    }

    /// Seat of the local player.
    #[must_use]
    pub fn local_index(&self) -> usize {
        self.local_index
    }

    /// How the local seat was found.
    #[must_use]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Participant 0 holds authority.
    #[must_use]
    pub fn is_authority(&self) -> bool {
        self.is_authority
    }

    /// Networked play is active.
    #[must_use]
    pub fn net_enabled(&self) -> bool {
        self.net_enabled
    }

    /// This peer runs the simulation (authority, or any peer offline).
    #[must_use]
    pub fn owns_simulation(&self) -> bool {
        self.is_authority || !self.net_enabled
    }

    /// Local seat.
    #[must_use]
    pub fn local_side(&self) -> Side {
        Side::from_index(self.local_index).unwrap_or(Side::First)
    }

    /// Opponent's seat.
    #[must_use]
    pub fn remote_side(&self) -> Side {
        self.local_side().other()
    }

    /// Opponent's id.
    #[must_use]
    pub fn remote_id(&self) -> Option<&ParticipantId> {
        self.participant(self.remote_side())
    }

    /// Participant seated at `side`.
    #[must_use]
    pub fn participant(&self, side: Side) -> Option<&ParticipantId> {
        self.participants.get(side.index())
    }

    /// Seat of a roster member.
    #[must_use]
    pub fn side_of(&self, id: &ParticipantId) -> Option<Side> {
        self.participants
            .iter()
            .position(|p| p == id)
            .and_then(Side::from_index)
    }
}

fn locate(participants: &[ParticipantId], local: &ParticipantId) -> (usize, Resolution) {
    if let Some(index) = participants.iter().position(|p| p == local) {
        return (index, Resolution::Exact);
    }
    let loose = participants.iter().position(|p| {
        !p.is_empty()
            && (p.as_str().contains(local.as_str()) || local.as_str().contains(p.as_str()))
    });
    match loose {
        Some(index) => {
            debug!(local = %local, index, "local id matched roster loosely");
            (index, Resolution::Loose)
        }
        None => {
            warn!(local = %local, "local id not in roster, assuming seat 0");
            (0, Resolution::Fallback)
        }
    }
}
