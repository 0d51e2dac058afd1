use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::player::ActionType;

/// Immutable catalog entry, seeded by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub required_action: ActionType,
    pub required_value: i64,
    pub reward_points: i64,
}

/// Per-player progress toward one definition.
///
/// `unlocked_at` is `None` until the backend has evaluated the achievement
/// as complete. The client never writes this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerAchievementStatus {
    pub achievement_id: String,
    pub code: String,
    pub name: String,
    pub required_value: i64,
    pub progress: i64,
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reward_points: i64,
}

impl PlayerAchievementStatus {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }

    /// Progress as a whole percentage, clamped to 0..=100.
    pub fn progress_pct(&self) -> u8 {
        if self.required_value <= 0 {
            return if self.is_unlocked() { 100 } else { 0 };
        }
        let pct = self.progress.max(0) as f64 / self.required_value as f64 * 100.0;
        pct.clamp(0.0, 100.0).floor() as u8
    }
}

/// An achievement that transitioned to unlocked between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    pub achievement_id: String,
    pub code: String,
    pub name: String,
    pub reward_points: i64,
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockedAchievement {
    /// Returns `None` when the status is still locked.
    pub fn from_status(status: &PlayerAchievementStatus) -> Option<Self> {
        Some(Self {
            achievement_id: status.achievement_id.clone(),
            code: status.code.clone(),
            name: status.name.clone(),
            reward_points: status.reward_points,
            unlocked_at: status.unlocked_at?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        let json = r#"{
            "achievementId": "a1",
            "code": "KILL_5",
            "name": "Hunter",
            "requiredValue": 5,
            "progress": 5,
            "unlockedAt": "2024-01-01T00:00:00Z",
            "rewardPoints": 50
        }"#;
        let status: PlayerAchievementStatus = serde_json::from_str(json).unwrap();
        assert!(status.is_unlocked());
        assert_eq!(status.progress_pct(), 100);

        let unlocked = UnlockedAchievement::from_status(&status).unwrap();
        assert_eq!(unlocked.code, "KILL_5");
        assert_eq!(unlocked.reward_points, 50);
    }

    #[test]
    fn test_progress_pct_clamps() {
        let mut status = PlayerAchievementStatus {
            achievement_id: "a1".into(),
            code: "KILL_5".into(),
            name: "Hunter".into(),
            required_value: 5,
            progress: 4,
            unlocked_at: None,
            reward_points: 0,
        };
        assert_eq!(status.progress_pct(), 80);
        status.progress = 12;
        assert_eq!(status.progress_pct(), 100);
        status.required_value = 0;
        assert_eq!(status.progress_pct(), 0);
        assert!(UnlockedAchievement::from_status(&status).is_none());
    }
}
