//! Notification drafts emitted by the client's features.

use lootsync_types::{NotificationDraft, RewardGrant, UnlockedAchievement};

use crate::error::ClientError;

pub fn achievement_unlocked(achievement: &UnlockedAchievement) -> NotificationDraft {
    let message = if achievement.reward_points > 0 {
        format!(
            "Congratulations! You completed: {} (+{} pts)",
            achievement.name, achievement.reward_points
        )
    } else {
        format!("Congratulations! You completed: {}", achievement.name)
    };
    NotificationDraft::success(format!("Achievement Unlocked: {}", achievement.code), message)
        .with_icon("emoji_events")
}

pub fn action_failed(error: &ClientError) -> NotificationDraft {
    let message = match error {
        ClientError::MissingIdentity => "Sign in before recording actions".to_string(),
        other => other.to_string(),
    };
    NotificationDraft::error("Action Failed", message)
}

pub fn reward_claimed(grant: &RewardGrant) -> NotificationDraft {
    NotificationDraft::success(
        "Reward Claimed",
        format!("+{} {}", grant.reward_amount, grant.reward_type.label()),
    )
    .with_icon("redeem")
}

pub fn rewards_claimed(count: u32) -> NotificationDraft {
    if count == 0 {
        NotificationDraft::info("Nothing to Claim", "All rewards are already claimed")
    } else {
        NotificationDraft::success("Rewards Claimed", format!("{count} rewards claimed"))
            .with_icon("redeem")
    }
}

pub fn claim_failed(error: &ClientError) -> NotificationDraft {
    NotificationDraft::error("Claim Failed", error.to_string())
}

pub fn data_synced() -> NotificationDraft {
    NotificationDraft::info(
        "Data Synchronized",
        "Your progress has been saved successfully",
    )
    .with_icon("cloud_sync")
}
