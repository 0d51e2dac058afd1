use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Well-known keys in [`Player::action_counters`].
pub mod counters {
    pub const MONSTERS_KILLED: &str = "monstersKilled";
    pub const MINUTES_PLAYED: &str = "minutesPlayed";
}

/// Resolved player identity. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Returns `None` for empty or whitespace-only ids.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == id.len() {
            Some(Self(id))
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actions
// ─────────────────────────────────────────────────────────────────────────────

/// A discrete in-game event the player reports to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    MonsterKilled,
    TimePlayed,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MonsterKilled => "monster_killed",
            Self::TimePlayed => "time_played",
        }
    }

    /// The player counter this action advances.
    pub fn counter_name(&self) -> &'static str {
        match self {
            Self::MonsterKilled => counters::MONSTERS_KILLED,
            Self::TimePlayed => counters::MINUTES_PLAYED,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monster_killed" | "kill_enemy" | "monsters" => Ok(Self::MonsterKilled),
            "time_played" | "minutes_played" | "time" => Ok(Self::TimePlayed),
            other => Err(format!("unknown action type: {other}")),
        }
    }
}

/// Body of `POST /actions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub player_id: PlayerId,
    pub action_type: ActionType,
    pub magnitude: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Player
// ─────────────────────────────────────────────────────────────────────────────

/// Client-side projection of a backend player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub coin_balance: i64,
    pub experience_points: i64,
    pub level: u32,
    #[serde(default)]
    pub action_counters: BTreeMap<String, i64>,
}

impl Player {
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            username: String::new(),
            email: None,
            coin_balance: 0,
            experience_points: 0,
            level: 1,
            action_counters: BTreeMap::new(),
        }
    }

    /// Build a full projection from a (possibly partial) payload.
    /// Missing numeric fields fall back to a fresh player's values.
    pub fn from_patch(id: PlayerId, patch: &PlayerPatch) -> Self {
        let mut player = Self::new(id);
        player.apply(patch);
        player
    }

    /// Merge a partial payload. Fields absent from `patch` keep their value.
    pub fn apply(&mut self, patch: &PlayerPatch) {
        if let Some(username) = &patch.username {
            self.username = username.clone();
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(coins) = patch.coin_balance {
            self.coin_balance = coins;
        }
        if let Some(xp) = patch.experience_points {
            self.experience_points = xp;
        }
        if let Some(level) = patch.level {
            self.level = level;
        }
        for (name, value) in patch.counters() {
            self.action_counters.insert(name, value);
        }
    }

    pub fn counter(&self, name: &str) -> i64 {
        self.action_counters.get(name).copied().unwrap_or(0)
    }

    pub fn monsters_killed(&self) -> i64 {
        self.counter(counters::MONSTERS_KILLED)
    }

    pub fn minutes_played(&self) -> i64 {
        self.counter(counters::MINUTES_PLAYED)
    }
}

/// Partial player projection, as returned by the action endpoint.
///
/// Counters may arrive nested (`actionCounters: {monstersKilled: 5}`) or flat
/// (`monstersKilled: 5`). Flat integer fields that are not otherwise known are
/// treated as counters; nested values win on conflict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPatch {
    pub id: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "coins")]
    pub coin_balance: Option<i64>,
    #[serde(alias = "xp")]
    pub experience_points: Option<i64>,
    pub level: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub action_counters: BTreeMap<String, i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PlayerPatch {
    /// All counters carried by this patch, flat and nested.
    pub fn counters(&self) -> BTreeMap<String, i64> {
        let mut out: BTreeMap<String, i64> = self
            .extra
            .iter()
            .filter_map(|(k, v)| v.as_i64().map(|n| (k.clone(), n)))
            .collect();
        out.extend(self.action_counters.iter().map(|(k, v)| (k.clone(), *v)));
        out
    }
}

impl From<&Player> for PlayerPatch {
    fn from(player: &Player) -> Self {
        Self {
            id: Some(player.id.as_str().to_string()),
            username: Some(player.username.clone()),
            email: player.email.clone(),
            coin_balance: Some(player.coin_balance),
            experience_points: Some(player.experience_points),
            level: Some(player.level),
            action_counters: player.action_counters.clone(),
            extra: BTreeMap::new(),
        }
    }
}
