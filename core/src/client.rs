use std::sync::Arc;

use lootsync_types::{
    ActionType, LeaderboardPlayer, Metric, Notification, NotificationId, Player, PlayerId,
    RewardGrant,
};
use tokio::sync::{broadcast, watch};

use crate::api::{GameApi, HttpGameApi};
use crate::cache::{ResourceKey, SnapshotCache};
use crate::config::ClientConfig;
use crate::coordinator::{EventCoordinator, UnlockBatch};
use crate::error::ClientError;
use crate::leaderboard::Leaderboard;
use crate::notifications::{NotificationStore, presets};
use crate::rewards::RewardClaims;
use crate::scheduler::{SharedScheduler, TokioScheduler};
use crate::session::SessionStore;

// ─────────────────────────────────────────────────────────────────────────────
// Client Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Everything a front end needs, wired together once at startup.
///
/// Cheap to clone. All clones share one session, cache and notification
/// queue.
#[derive(Clone)]
pub struct RewardsClient {
    api: Arc<dyn GameApi>,
    session: SessionStore,
    cache: SnapshotCache,
    store: NotificationStore,
    coordinator: EventCoordinator,
    claims: RewardClaims,
    leaderboard: Leaderboard,
}

impl RewardsClient {
    pub fn new(config: &ClientConfig, api: Arc<dyn GameApi>, scheduler: SharedScheduler) -> Self {
        let session = SessionStore::new();
        let cache = SnapshotCache::new(api.clone(), scheduler.clone());
        let store = NotificationStore::new(scheduler.clone(), config.notification_lifetime());
        let coordinator = EventCoordinator::new(
            api.clone(),
            cache.clone(),
            session.clone(),
            store.clone(),
            scheduler,
            config,
        );
        let claims = RewardClaims::new(api.clone(), cache.clone(), session.clone(), store.clone());
        let leaderboard = Leaderboard::new(api.clone());

        Self {
            api,
            session,
            cache,
            store,
            coordinator,
            claims,
            leaderboard,
        }
    }

    /// Client against the real backend on the ambient tokio runtime.
    pub fn with_http(config: &ClientConfig) -> Result<Self, ClientError> {
        let api = Arc::new(HttpGameApi::new(config)?);
        Ok(Self::new(config, api, TokioScheduler::shared()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session
    // ─────────────────────────────────────────────────────────────────────────

    /// Load the player and warm the cache. A previous session is ended first.
    pub async fn sign_in(&self, player_id: PlayerId) -> Result<Player, ClientError> {
        if self.session.player_id().await.is_some() {
            self.sign_out().await;
        }

        let player = self.api.fetch_player(&player_id).await?;
        self.session.sign_in(player.clone()).await;

        if let Err(e) = self.cache.refetch(&player_id, &ResourceKey::ALL).await {
            tracing::warn!(player = %player_id, error = %e, "Initial load incomplete");
        }
        Ok(self.cache.player(&player_id).unwrap_or(player))
    }

    /// Forget the player, every cached resource, and all notifications.
    pub async fn sign_out(&self) {
        self.session.reset().await;
        self.cache.clear();
        self.store.clear();
    }

    pub async fn current_player(&self) -> Option<Player> {
        self.session.player().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn submit_action(&self, action: ActionType, magnitude: u32) -> Result<Player, ClientError> {
        let player_id = self.session.player_id().await;
        self.coordinator
            .submit_action(player_id.as_ref(), action, magnitude)
            .await
    }

    pub async fn claim_reward(&self, grant_id: &str) -> Result<RewardGrant, ClientError> {
        let player_id = self.session.player_id().await;
        self.claims.claim_reward(player_id.as_ref(), grant_id).await
    }

    pub async fn claim_all(&self) -> Result<u32, ClientError> {
        let player_id = self.session.player_id().await;
        self.claims.claim_all(player_id.as_ref()).await
    }

    pub async fn unclaimed_rewards(&self) -> Vec<RewardGrant> {
        match self.session.player_id().await {
            Some(id) => self.claims.unclaimed(&id),
            None => Vec::new(),
        }
    }

    pub async fn leaderboard(&self, metric: Metric) -> Result<Vec<LeaderboardPlayer>, ClientError> {
        self.leaderboard.fetch(metric).await
    }

    /// Refresh every resource for the signed-in player.
    ///
    /// Shows "Data Synchronized" only when all four refreshed. Failures are
    /// recorded on the resources and returned, not shown.
    pub async fn sync(&self) -> Result<(), ClientError> {
        let player_id = self
            .session
            .player_id()
            .await
            .ok_or(ClientError::MissingIdentity)?;

        self.cache.invalidate(&player_id, &ResourceKey::ALL);
        self.cache.refetch(&player_id, &ResourceKey::ALL).await?;
        self.store.enqueue(presets::data_synced());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────

    pub fn notifications(&self) -> Vec<Notification> {
        self.store.notifications()
    }

    pub fn subscribe_notifications(&self) -> watch::Receiver<Vec<Notification>> {
        self.store.subscribe()
    }

    pub fn dismiss(&self, id: NotificationId) -> bool {
        self.store.dismiss(id)
    }

    pub fn subscribe_unlocks(&self) -> broadcast::Receiver<UnlockBatch> {
        self.coordinator.subscribe_unlocks()
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn notification_store(&self) -> &NotificationStore {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lootsync_types::Severity;

    use super::*;
    use crate::test_support::{pid, seeded_api, status};

    fn client_for(api: Arc<crate::test_support::FakeApi>) -> RewardsClient {
        RewardsClient::new(&ClientConfig::default(), api, TokioScheduler::shared())
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_warms_every_resource() {
        let client = client_for(seeded_api("p1"));

        let player = client.sign_in(pid("p1")).await.unwrap();

        assert_eq!(player.coin_balance, 120);
        let snapshot = client.cache().snapshot(&pid("p1"));
        assert!(snapshot.achievements.is_some());
        assert!(snapshot.rewards.is_some());
        assert!(snapshot.balance.is_some());
        assert_eq!(client.unclaimed_rewards().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_unknown_player_keeps_session_empty() {
        let client = client_for(seeded_api("p1"));

        assert!(client.sign_in(pid("ghost")).await.is_err());
        assert!(client.current_player().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_before_sign_in_fails_locally() {
        let api = seeded_api("p1");
        let client = client_for(api.clone());

        let err = client
            .submit_action(ActionType::MonsterKilled, 1)
            .await
            .unwrap_err();

        assert_eq!(err, ClientError::MissingIdentity);
        assert_eq!(api.calls("submit"), 0);
        assert_eq!(client.notifications()[0].severity, Severity::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_unlock_through_handle() {
        let api = seeded_api("p1");
        api.after_submit(Duration::ZERO, |s| {
            s.achievements.insert(
                pid("p1"),
                vec![status("KILL_5", 5, 5, Some("2024-01-01T00:00:00Z"))],
            );
        });
        let client = client_for(api);
        client.sign_in(pid("p1")).await.unwrap();
        let mut visible = client.subscribe_notifications();

        let player = client.submit_action(ActionType::MonsterKilled, 1).await.unwrap();
        assert_eq!(player.monsters_killed(), 5);

        visible.wait_for(|list| !list.is_empty()).await.unwrap();
        let shown = client.notifications();
        assert_eq!(shown[0].title, "Achievement Unlocked: KILL_5");
        assert_eq!(shown[0].icon, "emoji_events");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_announces_only_full_success() {
        let api = seeded_api("p1");
        let client = client_for(api.clone());
        client.sign_in(pid("p1")).await.unwrap();

        client.sync().await.unwrap();
        assert_eq!(client.notifications().len(), 1);
        assert_eq!(client.notifications()[0].title, "Data Synchronized");

        api.fail(ResourceKey::Balance);
        assert!(client.sync().await.is_err());
        assert_eq!(client.notifications().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_clears_everything() {
        let client = client_for(seeded_api("p1"));
        client.sign_in(pid("p1")).await.unwrap();
        client.sync().await.unwrap();

        client.sign_out().await;

        assert!(client.current_player().await.is_none());
        assert_eq!(client.cache().snapshot(&pid("p1")), Default::default());
        assert!(client.notifications().is_empty());
    }
}
