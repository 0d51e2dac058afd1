//! Shared data model for the lootsync client.
//!
//! Everything here mirrors a backend payload or a client-side value object.
//! Wire names are camelCase; Rust names are snake_case.

pub mod achievement;
pub mod formatting;
pub mod leaderboard;
pub mod notification;
pub mod player;
pub mod reward;

pub use achievement::{AchievementDefinition, PlayerAchievementStatus, UnlockedAchievement};
pub use leaderboard::{LeaderboardPlayer, Metric};
pub use notification::{
    DismissReason, Notification, NotificationDraft, NotificationId, NotificationState, Severity,
};
pub use player::{ActionRequest, ActionType, Player, PlayerId, PlayerPatch, counters};
pub use reward::{Balance, ClaimAllResponse, RewardGrant, RewardType};
