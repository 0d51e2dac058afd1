//! Boundary validation for backend payloads.
//!
//! Every response is decoded into a typed struct and then checked here, so a
//! malformed body becomes a `ValidationFailure` at the edge instead of a bad
//! value deep inside the cache.

use lootsync_types::{
    Balance, ClaimAllResponse, LeaderboardPlayer, Player, PlayerAchievementStatus, PlayerId,
    PlayerPatch, RewardGrant,
};
use serde::de::DeserializeOwned;

use crate::error::ClientError;

pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Decode a JSON body and validate it.
pub fn decode<T: DeserializeOwned + Validate>(body: &[u8]) -> Result<T, ClientError> {
    let value: T = serde_json::from_slice(body)
        .map_err(|e| ClientError::ValidationFailure(format!("malformed response: {e}")))?;
    value.validate().map_err(ClientError::ValidationFailure)?;
    Ok(value)
}

/// Build a player from a full profile payload, checking it belongs to
/// `expected`. Unlike an action response, a profile must carry
/// `coinBalance`, `experiencePoints` and `level`.
pub fn player_from_patch(expected: &PlayerId, patch: &PlayerPatch) -> Result<Player, ClientError> {
    patch.validate().map_err(ClientError::ValidationFailure)?;
    let missing: Vec<&str> = [
        ("coinBalance", patch.coin_balance.is_none()),
        ("experiencePoints", patch.experience_points.is_none()),
        ("level", patch.level.is_none()),
    ]
    .into_iter()
    .filter_map(|(field, absent)| absent.then_some(field))
    .collect();
    if !missing.is_empty() {
        return Err(ClientError::ValidationFailure(format!(
            "player profile missing {}",
            missing.join(", ")
        )));
    }
    if let Some(id) = patch.id.as_deref()
        && id != expected.as_str()
    {
        return Err(ClientError::ValidationFailure(format!(
            "asked for player {expected}, got {id}"
        )));
    }
    Ok(Player::from_patch(expected.clone(), patch))
}

fn non_negative(field: &str, value: i64) -> Result<(), String> {
    if value < 0 {
        Err(format!("{field} must not be negative (got {value})"))
    } else {
        Ok(())
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{field} must not be empty"))
    } else {
        Ok(())
    }
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), String> {
        for (i, item) in self.iter().enumerate() {
            item.validate().map_err(|e| format!("item {i}: {e}"))?;
        }
        Ok(())
    }
}

impl Validate for PlayerPatch {
    fn validate(&self) -> Result<(), String> {
        if let Some(coins) = self.coin_balance {
            non_negative("coinBalance", coins)?;
        }
        if let Some(xp) = self.experience_points {
            non_negative("experiencePoints", xp)?;
        }
        if self.level == Some(0) {
            return Err("level must be at least 1".to_string());
        }
        for (name, value) in self.counters() {
            non_negative(&name, value)?;
        }
        Ok(())
    }
}

impl Validate for PlayerAchievementStatus {
    fn validate(&self) -> Result<(), String> {
        non_empty("achievementId", &self.achievement_id)?;
        non_empty("code", &self.code)?;
        non_negative("requiredValue", self.required_value)?;
        non_negative("progress", self.progress)?;
        non_negative("rewardPoints", self.reward_points)
    }
}

impl Validate for RewardGrant {
    fn validate(&self) -> Result<(), String> {
        non_empty("id", &self.id)?;
        non_negative("rewardAmount", self.reward_amount)
    }
}

impl Validate for Balance {
    fn validate(&self) -> Result<(), String> {
        non_negative("totalCoins", self.total_coins)?;
        non_negative("totalPoints", self.total_points)
    }
}

impl Validate for ClaimAllResponse {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

impl Validate for LeaderboardPlayer {
    fn validate(&self) -> Result<(), String> {
        non_empty("id", &self.id)?;
        non_negative("monstersKilled", self.monsters_killed)?;
        non_negative("timePlayed", self.time_played)
    }
}
