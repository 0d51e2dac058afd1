use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardType {
    Coins,
    Points,
    Badge,
    Item,
}

impl RewardType {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Coins => "coins",
            Self::Points => "points",
            Self::Badge => "badge",
            Self::Item => "item",
        }
    }
}

/// A unit of currency or points issued to a player.
///
/// Grants may originate from achievements or directly from actions, so
/// `achievement_id` is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardGrant {
    pub id: String,
    pub player_id: String,
    #[serde(default)]
    pub achievement_id: Option<String>,
    pub reward_type: RewardType,
    pub reward_amount: i64,
    pub awarded_at: DateTime<Utc>,
    #[serde(default)]
    pub is_claimed: bool,
}

/// Aggregate totals for a player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    #[serde(default)]
    pub player_id: Option<String>,
    pub total_coins: i64,
    pub total_points: i64,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// Response of the claim-all endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimAllResponse {
    pub claimed: u32,
}
