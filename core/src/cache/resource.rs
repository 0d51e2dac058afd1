use std::fmt;

use chrono::{DateTime, Utc};
use lootsync_types::{Balance, Player, PlayerAchievementStatus, PlayerId, RewardGrant};
use serde::{Deserialize, Serialize};

use crate::error::ClientError;

// ─────────────────────────────────────────────────────────────────────────────
// Keys
// ─────────────────────────────────────────────────────────────────────────────

/// The four server resources the client mirrors per player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKey {
    Player,
    Achievements,
    Rewards,
    Balance,
}

impl ResourceKey {
    pub const ALL: [ResourceKey; 4] = [
        ResourceKey::Player,
        ResourceKey::Achievements,
        ResourceKey::Rewards,
        ResourceKey::Balance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKey::Player => "player",
            ResourceKey::Achievements => "achievements",
            ResourceKey::Rewards => "rewards",
            ResourceKey::Balance => "balance",
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub resource: ResourceKey,
    pub player_id: PlayerId,
}

impl CacheKey {
    pub fn new(resource: ResourceKey, player_id: PlayerId) -> Self {
        Self {
            resource,
            player_id,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.player_id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Values
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceValue {
    Player(Player),
    Achievements(Vec<PlayerAchievementStatus>),
    Rewards(Vec<RewardGrant>),
    Balance(Balance),
}

impl ResourceValue {
    pub fn key(&self) -> ResourceKey {
        match self {
            ResourceValue::Player(_) => ResourceKey::Player,
            ResourceValue::Achievements(_) => ResourceKey::Achievements,
            ResourceValue::Rewards(_) => ResourceKey::Rewards,
            ResourceValue::Balance(_) => ResourceKey::Balance,
        }
    }

    pub fn as_player(&self) -> Option<&Player> {
        match self {
            ResourceValue::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_achievements(&self) -> Option<&[PlayerAchievementStatus]> {
        match self {
            ResourceValue::Achievements(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_rewards(&self) -> Option<&[RewardGrant]> {
        match self {
            ResourceValue::Rewards(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_balance(&self) -> Option<&Balance> {
        match self {
            ResourceValue::Balance(b) => Some(b),
            _ => None,
        }
    }
}

/// One cached resource as seen by readers.
///
/// A failed refetch sets `last_error` but keeps `last_value`; a successful
/// one clears the error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedResource {
    pub(super) value: Option<ResourceValue>,
    pub(super) error: Option<ClientError>,
    pub(super) stale: bool,
    pub(super) loading: bool,
    pub(super) fetched_at: Option<DateTime<Utc>>,
}

impl CachedResource {
    /// True once invalidated, until a refetch started after the
    /// invalidation succeeds.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_value(&self) -> Option<&ResourceValue> {
        self.value.as_ref()
    }

    pub fn last_error(&self) -> Option<&ClientError> {
        self.error.as_ref()
    }

    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.fetched_at
    }
}

/// Everything cached for one player. Used for delta baselines and for
/// asserting a failed action left the cache alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotSet {
    pub player: Option<Player>,
    pub achievements: Option<Vec<PlayerAchievementStatus>>,
    pub rewards: Option<Vec<RewardGrant>>,
    pub balance: Option<Balance>,
}
