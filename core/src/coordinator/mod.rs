//! Action submission and unlock reconciliation.
//!
//! ```text
//!   submit_action
//!        │ capture pre-image (cached achievements)
//!        ▼
//!   POST /actions ──✗──► one error notification, nothing else touched
//!        │ ok
//!        ▼
//!   merge patch into session + cached player
//!        │
//!        ├──► invalidate all four resources ──► detached refetch
//!        │
//!        └──► detached reconcile:
//!                 settle wait ─► post-image ─► detect_newly_unlocked
//!                      ▲             │
//!                      └─ unchanged ─┘ (while retries remain)
//!                                    ▼
//!                      sequencer (staggered) + unlock broadcast
//! ```
//!
//! The caller gets the merged player back as soon as the submission is
//! acknowledged; everything after the merge runs detached.

mod settle;


pub use settle::SettlePolicy;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use lootsync_types::{
    ActionRequest, ActionType, Player, PlayerAchievementStatus, PlayerId, PlayerPatch,
    UnlockedAchievement,
};
use tokio::sync::{OwnedMutexGuard, broadcast};

use crate::api::GameApi;
use crate::cache::{ResourceKey, SnapshotCache};
use crate::config::ClientConfig;
use crate::delta::detect_newly_unlocked;
use crate::error::ClientError;
use crate::notifications::{NotificationSequencer, NotificationStore, presets};
use crate::scheduler::SharedScheduler;
use crate::session::SessionStore;

const UNLOCK_CHANNEL_CAPACITY: usize = 16;

/// Achievements unlocked by one action, for structured subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockBatch {
    pub player_id: PlayerId,
    pub action: ActionType,
    pub unlocked: Vec<UnlockedAchievement>,
}

type PlayerLocks = Mutex<HashMap<PlayerId, Arc<tokio::sync::Mutex<()>>>>;

struct CoordinatorInner {
    api: Arc<dyn GameApi>,
    cache: SnapshotCache,
    session: SessionStore,
    store: NotificationStore,
    sequencer: NotificationSequencer,
    scheduler: SharedScheduler,
    settle: SettlePolicy,
    unlocks: broadcast::Sender<UnlockBatch>,
    /// Present when submissions are serialized per player.
    player_locks: Option<PlayerLocks>,
}

#[derive(Clone)]
pub struct EventCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl EventCoordinator {
    pub fn new(
        api: Arc<dyn GameApi>,
        cache: SnapshotCache,
        session: SessionStore,
        store: NotificationStore,
        scheduler: SharedScheduler,
        config: &ClientConfig,
    ) -> Self {
        let sequencer = NotificationSequencer::new(store.clone(), scheduler.clone(), config.stagger());
        let (unlocks, _) = broadcast::channel(UNLOCK_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                api,
                cache,
                session,
                store,
                sequencer,
                scheduler,
                settle: SettlePolicy::from_config(config),
                unlocks,
                player_locks: config
                    .serialize_per_player
                    .then(|| Mutex::new(HashMap::new())),
            }),
        }
    }

    /// Unlocks detected by every subsequent action.
    pub fn subscribe_unlocks(&self) -> broadcast::Receiver<UnlockBatch> {
        self.inner.unlocks.subscribe()
    }

    pub fn settle_policy(&self) -> SettlePolicy {
        self.inner.settle
    }

    /// Submit one player action.
    ///
    /// Returns once the backend has acknowledged it and the returned fields
    /// are merged locally. Cache refresh and unlock detection continue in
    /// the background. On failure exactly one error notification is shown
    /// and no local state changes.
    pub async fn submit_action(
        &self,
        player_id: Option<&PlayerId>,
        action: ActionType,
        magnitude: u32,
    ) -> Result<Player, ClientError> {
        let Some(player_id) = player_id.cloned() else {
            return Err(self.fail(ClientError::MissingIdentity));
        };

        let serial = match self.player_lock(&player_id) {
            Some(lock) => Some(lock.lock_owned().await),
            None => None,
        };

        // Must be taken before the submission, or the delta is always empty.
        let pre_image = self.capture_pre_image(&player_id).await;

        let request = ActionRequest {
            player_id: player_id.clone(),
            action_type: action,
            magnitude,
        };
        tracing::info!(player = %player_id, %action, magnitude, "Submitting action");

        let patch = match self.inner.api.submit_action(&request).await {
            Ok(patch) => patch,
            Err(err) => {
                tracing::warn!(player = %player_id, %action, error = %err, "Action rejected");
                return Err(self.fail(err));
            }
        };

        let merged = self.merge(&player_id, &patch).await;

        self.inner.cache.invalidate(&player_id, &ResourceKey::ALL);
        self.spawn_refetch(player_id.clone());

        match pre_image {
            Some(pre) => self.spawn_reconcile(player_id, action, pre, serial),
            None => tracing::warn!(
                player = %player_id,
                "No achievement baseline, skipping unlock detection"
            ),
        }

        Ok(merged)
    }

    fn fail(&self, err: ClientError) -> ClientError {
        self.inner.store.enqueue(presets::action_failed(&err));
        err
    }

    fn player_lock(&self, player_id: &PlayerId) -> Option<Arc<tokio::sync::Mutex<()>>> {
        let locks = self.inner.player_locks.as_ref()?;
        let mut locks = locks.lock().unwrap_or_else(PoisonError::into_inner);
        Some(locks.entry(player_id.clone()).or_default().clone())
    }

    /// Cached achievements, or a direct read that bypasses the cache so a
    /// rejected submission leaves cached state as it was.
    async fn capture_pre_image(&self, player_id: &PlayerId) -> Option<Vec<PlayerAchievementStatus>> {
        if let Some(cached) = self.inner.cache.achievements(player_id) {
            return Some(cached);
        }
        match self.inner.api.fetch_achievements(player_id).await {
            Ok(fetched) => Some(fetched),
            Err(e) => {
                tracing::warn!(player = %player_id, error = %e, "Baseline fetch failed");
                None
            }
        }
    }

    /// Session first, then cache. Returns the session's view when the
    /// player is signed in.
    async fn merge(&self, player_id: &PlayerId, patch: &PlayerPatch) -> Player {
        let in_session = self.inner.session.merge(player_id, patch).await;
        let cached = self.inner.cache.merge_player(player_id, patch);
        in_session.unwrap_or(cached)
    }

    fn spawn_refetch(&self, player_id: PlayerId) {
        let cache = self.inner.cache.clone();
        let session = self.inner.session.clone();
        self.inner.scheduler.spawn(Box::pin(async move {
            if let Err(e) = cache.refetch(&player_id, &ResourceKey::ALL).await {
                tracing::warn!(player = %player_id, error = %e, "Background refresh incomplete");
            }
            if let Some(player) = cache.player(&player_id) {
                session.merge(&player_id, &PlayerPatch::from(&player)).await;
            }
        }));
    }

    fn spawn_reconcile(
        &self,
        player_id: PlayerId,
        action: ActionType,
        pre: Vec<PlayerAchievementStatus>,
        serial: Option<OwnedMutexGuard<()>>,
    ) {
        let this = self.clone();
        self.inner.scheduler.spawn(Box::pin(async move {
            this.reconcile(&player_id, action, &pre).await;
            drop(serial);
        }));
    }

    async fn reconcile(&self, player_id: &PlayerId, action: ActionType, pre: &[PlayerAchievementStatus]) {
        let Some(post) = self.read_post_image(player_id, pre).await else {
            return;
        };

        let unlocked = detect_newly_unlocked(pre, &post);
        if unlocked.is_empty() {
            tracing::debug!(player = %player_id, %action, "Nothing unlocked");
            return;
        }

        tracing::info!(
            player = %player_id,
            codes = %unlocked
                .iter()
                .map(|u| u.code.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            "Achievements unlocked"
        );
        self.inner
            .sequencer
            .present(unlocked.iter().map(presets::achievement_unlocked).collect());

        // No subscribers is fine.
        let _ = self.inner.unlocks.send(UnlockBatch {
            player_id: player_id.clone(),
            action,
            unlocked,
        });
    }

    /// Wait out the settle delay and read achievements. While retries
    /// remain, an image identical to `pre` is read again after a longer wait.
    async fn read_post_image(
        &self,
        player_id: &PlayerId,
        pre: &[PlayerAchievementStatus],
    ) -> Option<Vec<PlayerAchievementStatus>> {
        let settle = self.inner.settle;
        let mut attempt = 0;
        loop {
            self.inner.scheduler.sleep(settle.delay_for(attempt)).await;

            // Force a fresh read instead of joining the refetch issued at submit.
            self.inner.cache.invalidate(player_id, &[ResourceKey::Achievements]);
            let post = match self.inner.cache.refresh_achievements(player_id).await {
                Ok(post) => post,
                Err(e) => {
                    tracing::warn!(
                        player = %player_id,
                        error = %e,
                        "Post-image fetch failed, skipping unlock detection"
                    );
                    return None;
                }
            };

            if post.as_slice() != pre || attempt >= settle.retries {
                return Some(post);
            }
            attempt += 1;
            tracing::debug!(
                player = %player_id,
                attempt,
                retries = settle.retries,
                "Achievements unchanged, retrying"
            );
        }
    }
}
