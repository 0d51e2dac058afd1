//! Snapshot cache of server resources, keyed by (resource, player).
//!
//! ```text
//!   invalidate(keys) ──► slot.stale = true, slot.epoch += 1
//!
//!   refetch(keys) ──► join_all ─┬─► key A ─► leader? ─► GameApi ─► write slot ─► wake followers
//!                               ├─► key B ─► follower ─────────────────────────► wait for leader
//!                               └─► ...
//! ```
//!
//! At most one fetch per key is in flight. A refetch requested while one is
//! outstanding joins it, unless the key was invalidated since that fetch
//! started: then the older fetch is aborted and its waiters move over to
//! the new one.

mod resource;


pub use resource::{CacheKey, CachedResource, ResourceKey, ResourceValue, SnapshotSet};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{AbortHandle, AbortRegistration, Abortable, join_all};
use lootsync_types::{Balance, Player, PlayerAchievementStatus, PlayerId, PlayerPatch, RewardGrant};
use tokio::sync::watch;

use crate::api::GameApi;
use crate::error::ClientError;
use crate::scheduler::SharedScheduler;

type FetchOutcome = Option<Result<ResourceValue, ClientError>>;

struct Inflight {
    token: u64,
    epoch: u64,
    rx: watch::Receiver<FetchOutcome>,
    abort: AbortHandle,
}

#[derive(Default)]
struct Slot {
    resource: CachedResource,
    /// Bumped on every invalidation.
    epoch: u64,
    inflight: Option<Inflight>,
}

struct CacheShared {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    api: Arc<dyn GameApi>,
    scheduler: SharedScheduler,
    /// Bumped by `clear()` so fetches started before a logout are dropped.
    generation: AtomicU64,
    next_token: AtomicU64,
}

impl CacheShared {
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Role {
    Leader {
        tx: watch::Sender<FetchOutcome>,
        token: u64,
        epoch: u64,
        generation: u64,
        registration: AbortRegistration,
    },
    Follower(watch::Receiver<FetchOutcome>),
}

/// Clears the in-flight marker if the leading future is dropped mid-fetch,
/// so the next caller starts a fresh fetch instead of waiting forever.
struct InflightGuard {
    shared: Arc<CacheShared>,
    key: CacheKey,
    token: u64,
    armed: bool,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slots = self.shared.lock();
        if let Some(slot) = slots.get_mut(&self.key)
            && slot.inflight.as_ref().is_some_and(|i| i.token == self.token)
        {
            slot.inflight = None;
            slot.resource.loading = false;
        }
    }
}

#[derive(Clone)]
pub struct SnapshotCache {
    shared: Arc<CacheShared>,
}

impl SnapshotCache {
    pub fn new(api: Arc<dyn GameApi>, scheduler: SharedScheduler) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                slots: Mutex::new(HashMap::new()),
                api,
                scheduler,
                generation: AtomicU64::new(0),
                next_token: AtomicU64::new(1),
            }),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invalidate / Refetch
    // ─────────────────────────────────────────────────────────────────────────

    /// Mark resources stale. Values are kept until a refetch replaces them.
    pub fn invalidate(&self, player_id: &PlayerId, keys: &[ResourceKey]) {
        let mut slots = self.shared.lock();
        for &resource in keys {
            let slot = slots
                .entry(CacheKey::new(resource, player_id.clone()))
                .or_default();
            slot.resource.stale = true;
            slot.epoch += 1;
        }
        tracing::debug!(player = %player_id, ?keys, "invalidated");
    }

    /// Refetch resources concurrently.
    ///
    /// Each resource succeeds or fails on its own; the error lists the
    /// resources that failed. The others are updated regardless.
    pub async fn refetch(&self, player_id: &PlayerId, keys: &[ResourceKey]) -> Result<(), ClientError> {
        let results = join_all(
            keys.iter()
                .map(|&resource| self.refresh(resource, player_id)),
        )
        .await;

        let failed: Vec<ResourceKey> = keys
            .iter()
            .zip(&results)
            .filter(|(_, r)| r.is_err())
            .map(|(k, _)| *k)
            .collect();

        if failed.is_empty() {
            Ok(())
        } else {
            tracing::warn!(player = %player_id, ?failed, "Partial refresh failure");
            Err(ClientError::PartialRefreshFailure { failed })
        }
    }

    /// Refetch one resource and return the fresh value.
    pub async fn refresh(
        &self,
        resource: ResourceKey,
        player_id: &PlayerId,
    ) -> Result<ResourceValue, ClientError> {
        let key = CacheKey::new(resource, player_id.clone());
        loop {
            match self.join_or_lead(&key) {
                Role::Follower(mut rx) => {
                    let outcome = rx
                        .wait_for(Option::is_some)
                        .await
                        .ok()
                        .and_then(|v| v.clone());
                    if let Some(result) = outcome {
                        return result;
                    }
                    // Leader was dropped before finishing; take over.
                }
                Role::Leader {
                    tx,
                    token,
                    epoch,
                    generation,
                    registration,
                } => {
                    if let Some(result) = self
                        .lead(&key, tx, token, epoch, generation, registration)
                        .await
                    {
                        return result;
                    }
                    // Superseded by a newer fetch; wait on that one instead.
                }
            }
        }
    }

    fn join_or_lead(&self, key: &CacheKey) -> Role {
        let mut slots = self.shared.lock();
        let slot = slots.entry(key.clone()).or_default();
        if let Some(inflight) = &slot.inflight
            && inflight.epoch == slot.epoch
        {
            return Role::Follower(inflight.rx.clone());
        }

        if let Some(superseded) = slot.inflight.take() {
            tracing::debug!(key = %key, "aborting superseded fetch");
            superseded.abort.abort();
        }

        let (tx, rx) = watch::channel(None);
        let (abort, registration) = AbortHandle::new_pair();
        let token = self.shared.next_token.fetch_add(1, Ordering::Relaxed);
        slot.inflight = Some(Inflight {
            token,
            epoch: slot.epoch,
            rx,
            abort,
        });
        slot.resource.loading = true;
        Role::Leader {
            tx,
            token,
            epoch: slot.epoch,
            generation: self.shared.generation.load(Ordering::Acquire),
            registration,
        }
    }

    /// Run the fetch for `key`. Returns `None` when a newer fetch aborted
    /// this one; `tx` is dropped so followers re-join.
    async fn lead(
        &self,
        key: &CacheKey,
        tx: watch::Sender<FetchOutcome>,
        token: u64,
        epoch: u64,
        generation: u64,
        registration: AbortRegistration,
    ) -> Option<Result<ResourceValue, ClientError>> {
        let mut guard = InflightGuard {
            shared: self.shared.clone(),
            key: key.clone(),
            token,
            armed: true,
        };

        tracing::debug!(key = %key, "fetching");
        let result = Abortable::new(self.fetch(key), registration).await.ok()?;
        self.complete(key, token, epoch, generation, &result);
        guard.armed = false;

        tx.send_replace(Some(result.clone()));
        Some(result)
    }

    async fn fetch(&self, key: &CacheKey) -> Result<ResourceValue, ClientError> {
        let api = &self.shared.api;
        let id = &key.player_id;
        Ok(match key.resource {
            ResourceKey::Player => ResourceValue::Player(api.fetch_player(id).await?),
            ResourceKey::Achievements => {
                ResourceValue::Achievements(api.fetch_achievements(id).await?)
            }
            ResourceKey::Rewards => ResourceValue::Rewards(api.fetch_rewards(id).await?),
            ResourceKey::Balance => ResourceValue::Balance(api.fetch_balance(id).await?),
        })
    }

    fn complete(
        &self,
        key: &CacheKey,
        token: u64,
        epoch: u64,
        generation: u64,
        result: &Result<ResourceValue, ClientError>,
    ) {
        let mut slots = self.shared.lock();
        if self.shared.generation.load(Ordering::Acquire) != generation {
            tracing::debug!(key = %key, "dropping result fetched before clear");
            return;
        }
        let Some(slot) = slots.get_mut(key) else {
            return;
        };
        if !slot.inflight.as_ref().is_some_and(|i| i.token == token) {
            tracing::debug!(key = %key, "dropping superseded result");
            return;
        }

        slot.inflight = None;
        slot.resource.loading = false;
        match result {
            Ok(value) => {
                slot.resource.value = Some(value.clone());
                slot.resource.error = None;
                slot.resource.fetched_at = Some(self.shared.scheduler.wall_clock());
                slot.resource.stale = slot.epoch != epoch;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Refetch failed");
                slot.resource.error = Some(e.clone());
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Merge a partial player payload into the cached player.
    /// Fields absent from `patch` keep their cached value.
    pub fn merge_player(&self, player_id: &PlayerId, patch: &PlayerPatch) -> Player {
        let mut slots = self.shared.lock();
        let slot = slots
            .entry(CacheKey::new(ResourceKey::Player, player_id.clone()))
            .or_default();
        let merged = match slot.resource.value.as_ref().and_then(ResourceValue::as_player) {
            Some(cached) => {
                let mut player = cached.clone();
                player.apply(patch);
                player
            }
            None => Player::from_patch(player_id.clone(), patch),
        };
        slot.resource.value = Some(ResourceValue::Player(merged.clone()));
        merged
    }

    /// Drop every cached resource. In-flight fetches finish but are not
    /// written back.
    pub fn clear(&self) {
        let mut slots = self.shared.lock();
        self.shared.generation.fetch_add(1, Ordering::AcqRel);
        slots.clear();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn entry(&self, resource: ResourceKey, player_id: &PlayerId) -> CachedResource {
        self.shared
            .lock()
            .get(&CacheKey::new(resource, player_id.clone()))
            .map(|slot| slot.resource.clone())
            .unwrap_or_default()
    }

    fn read<T>(
        &self,
        resource: ResourceKey,
        player_id: &PlayerId,
        f: impl FnOnce(&ResourceValue) -> Option<T>,
    ) -> Option<T> {
        self.shared
            .lock()
            .get(&CacheKey::new(resource, player_id.clone()))
            .and_then(|slot| slot.resource.value.as_ref())
            .and_then(f)
    }

    pub fn player(&self, player_id: &PlayerId) -> Option<Player> {
        self.read(ResourceKey::Player, player_id, |v| v.as_player().cloned())
    }

    pub fn achievements(&self, player_id: &PlayerId) -> Option<Vec<PlayerAchievementStatus>> {
        self.read(ResourceKey::Achievements, player_id, |v| {
            v.as_achievements().map(<[_]>::to_vec)
        })
    }

    pub fn rewards(&self, player_id: &PlayerId) -> Option<Vec<RewardGrant>> {
        self.read(ResourceKey::Rewards, player_id, |v| {
            v.as_rewards().map(<[_]>::to_vec)
        })
    }

    pub fn balance(&self, player_id: &PlayerId) -> Option<Balance> {
        self.read(ResourceKey::Balance, player_id, |v| v.as_balance().cloned())
    }

    pub fn snapshot(&self, player_id: &PlayerId) -> SnapshotSet {
        SnapshotSet {
            player: self.player(player_id),
            achievements: self.achievements(player_id),
            rewards: self.rewards(player_id),
            balance: self.balance(player_id),
        }
    }

    /// Refetch and return the player's achievements.
    pub async fn refresh_achievements(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<PlayerAchievementStatus>, ClientError> {
        match self.refresh(ResourceKey::Achievements, player_id).await? {
            ResourceValue::Achievements(a) => Ok(a),
            other => Err(ClientError::ValidationFailure(format!(
                "expected achievements, got {}",
                other.key()
            ))),
        }
    }
}
