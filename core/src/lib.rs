pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod coordinator;
pub mod delta;
pub mod error;
pub mod leaderboard;
pub mod notifications;
pub mod rewards;
pub mod scheduler;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

// Re-exports for convenience
pub use api::{GameApi, HttpGameApi};
pub use cache::{CachedResource, ResourceKey, ResourceValue, SnapshotCache, SnapshotSet};
pub use client::RewardsClient;
pub use config::{ClientConfig, ConfigError};
pub use coordinator::{EventCoordinator, SettlePolicy, UnlockBatch};
pub use delta::detect_newly_unlocked;
pub use error::ClientError;
pub use notifications::{NotificationSequencer, NotificationStore};
pub use rewards::RewardClaims;
pub use scheduler::{Scheduler, SharedScheduler, TokioScheduler};
pub use session::SessionStore;
