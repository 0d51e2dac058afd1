//! Claiming issued rewards.
//!
//! A claim moves currency into the player's balance on the server, so every
//! claim is followed by a refresh of rewards, balance, and player.

use std::sync::Arc;

use lootsync_types::{PlayerId, PlayerPatch, RewardGrant};

use crate::api::GameApi;
use crate::cache::{ResourceKey, SnapshotCache};
use crate::error::ClientError;
use crate::notifications::{NotificationStore, presets};
use crate::session::SessionStore;

const CLAIM_REFRESH: [ResourceKey; 3] =
    [ResourceKey::Rewards, ResourceKey::Balance, ResourceKey::Player];

#[derive(Clone)]
pub struct RewardClaims {
    api: Arc<dyn GameApi>,
    cache: SnapshotCache,
    session: SessionStore,
    store: NotificationStore,
}

impl RewardClaims {
    pub fn new(
        api: Arc<dyn GameApi>,
        cache: SnapshotCache,
        session: SessionStore,
        store: NotificationStore,
    ) -> Self {
        Self {
            api,
            cache,
            session,
            store,
        }
    }

    /// Cached grants not yet claimed.
    pub fn unclaimed(&self, player_id: &PlayerId) -> Vec<RewardGrant> {
        self.cache
            .rewards(player_id)
            .unwrap_or_default()
            .into_iter()
            .filter(|g| !g.is_claimed)
            .collect()
    }

    pub async fn claim_reward(
        &self,
        player_id: Option<&PlayerId>,
        grant_id: &str,
    ) -> Result<RewardGrant, ClientError> {
        let Some(player_id) = player_id else {
            return Err(self.fail(ClientError::MissingIdentity));
        };
        if grant_id.trim().is_empty() {
            return Err(self.fail(ClientError::ValidationFailure(
                "reward id must not be empty".to_string(),
            )));
        }

        let grant = match self.api.claim_reward(grant_id).await {
            Ok(grant) => grant,
            Err(err) => {
                tracing::warn!(grant = grant_id, error = %err, "Claim failed");
                return Err(self.fail(err));
            }
        };
        tracing::info!(
            player = %player_id,
            grant = %grant.id,
            amount = grant.reward_amount,
            kind = grant.reward_type.label(),
            "Reward claimed"
        );

        self.refresh(player_id).await;
        self.store.enqueue(presets::reward_claimed(&grant));
        Ok(grant)
    }

    /// Claim every outstanding grant. Returns how many were claimed.
    pub async fn claim_all(&self, player_id: Option<&PlayerId>) -> Result<u32, ClientError> {
        let Some(player_id) = player_id else {
            return Err(self.fail(ClientError::MissingIdentity));
        };

        let response = match self.api.claim_all_rewards(player_id).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(player = %player_id, error = %err, "Claim-all failed");
                return Err(self.fail(err));
            }
        };
        tracing::info!(player = %player_id, claimed = response.claimed, "Rewards claimed");

        if response.claimed > 0 {
            self.refresh(player_id).await;
        }
        self.store.enqueue(presets::rewards_claimed(response.claimed));
        Ok(response.claimed)
    }

    fn fail(&self, err: ClientError) -> ClientError {
        self.store.enqueue(presets::claim_failed(&err));
        err
    }

    async fn refresh(&self, player_id: &PlayerId) {
        self.cache.invalidate(player_id, &CLAIM_REFRESH);
        if let Err(e) = self.cache.refetch(player_id, &CLAIM_REFRESH).await {
            tracing::warn!(player = %player_id, error = %e, "Refresh after claim incomplete");
        }
        if let Some(player) = self.cache.player(player_id) {
            self.session
                .merge(player_id, &PlayerPatch::from(&player))
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use lootsync_types::Severity;

    use super::*;
    use crate::scheduler::TokioScheduler;
    use crate::test_support::{FakeApi, pid, seeded_api};

    async fn claims_for(api: &Arc<FakeApi>) -> (RewardClaims, SnapshotCache, NotificationStore) {
        let scheduler = TokioScheduler::shared();
        let cache = SnapshotCache::new(api.clone(), scheduler.clone());
        let store = NotificationStore::new(scheduler, Duration::from_secs(5));
        let session = SessionStore::new();
        cache.refetch(&pid("p1"), &ResourceKey::ALL).await.unwrap();
        let claims = RewardClaims::new(api.clone(), cache.clone(), session, store.clone());
        (claims, cache, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_refreshes_balance_and_notifies() {
        let api = seeded_api("p1");
        let (claims, cache, store) = claims_for(&api).await;
        let id = pid("p1");
        assert_eq!(claims.unclaimed(&id).len(), 1);

        let grant = claims.claim_reward(Some(&id), "g1").await.unwrap();

        assert!(grant.is_claimed);
        assert_eq!(cache.balance(&id).unwrap().total_coins, 145);
        assert!(claims.unclaimed(&id).is_empty());
        let shown = store.notifications();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Reward Claimed");
        assert_eq!(shown[0].message, "+25 coins");
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_twice_reports_error_and_keeps_cache() {
        let api = seeded_api("p1");
        let (claims, cache, store) = claims_for(&api).await;
        let id = pid("p1");
        claims.claim_reward(Some(&id), "g1").await.unwrap();
        let before = cache.snapshot(&id);

        let err = claims.claim_reward(Some(&id), "g1").await.unwrap_err();

        assert!(matches!(err, ClientError::ValidationFailure(_)));
        assert_eq!(cache.snapshot(&id), before);
        let last = store.notifications().pop().unwrap();
        assert_eq!(last.severity, Severity::Error);
        assert_eq!(last.title, "Claim Failed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_all_counts_and_refreshes() {
        let api = seeded_api("p1");
        let (claims, cache, store) = claims_for(&api).await;
        let id = pid("p1");

        assert_eq!(claims.claim_all(Some(&id)).await.unwrap(), 1);
        assert_eq!(cache.balance(&id).unwrap().total_coins, 145);

        assert_eq!(claims.claim_all(Some(&id)).await.unwrap(), 0);
        let titles: Vec<_> = store.notifications().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["Rewards Claimed", "Nothing to Claim"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_network_failure_leaves_cache_untouched() {
        let api = seeded_api("p1");
        let (claims, cache, store) = claims_for(&api).await;
        let id = pid("p1");
        let before = cache.snapshot(&id);
        api.fail_claims(ClientError::NetworkFailure("reward service down".to_string()));

        let err = claims.claim_reward(Some(&id), "g1").await.unwrap_err();
        assert!(err.is_network());
        let err = claims.claim_all(Some(&id)).await.unwrap_err();
        assert!(err.is_network());

        assert_eq!(cache.snapshot(&id), before);
        assert_eq!(claims.unclaimed(&id).len(), 1);
        assert_eq!(api.calls("balance"), 1);
        let shown = store.notifications();
        assert_eq!(shown.len(), 2);
        assert!(shown.iter().all(|n| n.severity == Severity::Error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_claim_without_identity_makes_no_call() {
        let api = seeded_api("p1");
        let (claims, _cache, store) = claims_for(&api).await;

        assert_eq!(
            claims.claim_all(None).await.unwrap_err(),
            ClientError::MissingIdentity
        );
        assert_eq!(api.calls("claim_all"), 0);
        assert_eq!(store.notifications().len(), 1);
    }
}
