//! In-memory backend and fixtures shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lootsync_types::{
    ActionRequest, Balance, ClaimAllResponse, LeaderboardPlayer, Player, PlayerAchievementStatus,
    PlayerId, PlayerPatch, RewardGrant, RewardType,
};

use crate::api::GameApi;
use crate::cache::ResourceKey;
use crate::error::ClientError;

pub(crate) type Effect = Box<dyn FnOnce(&mut FakeState) + Send>;

/// What the fake backend currently "knows".
#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub players: HashMap<PlayerId, Player>,
    pub achievements: HashMap<PlayerId, Vec<PlayerAchievementStatus>>,
    pub rewards: HashMap<PlayerId, Vec<RewardGrant>>,
    pub balances: HashMap<PlayerId, Balance>,
    pub leaderboard: Vec<LeaderboardPlayer>,
}

#[derive(Default)]
struct Script {
    failing: HashSet<ResourceKey>,
    submit_error: Option<ClientError>,
    submit_response: Option<PlayerPatch>,
    claim_error: Option<ClientError>,
    on_submit: Vec<(Duration, Effect)>,
    fetch_delay: Duration,
    calls: HashMap<&'static str, usize>,
    completed: HashMap<&'static str, usize>,
}

/// Scriptable [`GameApi`]. Server-side effects of an action (achievement
/// evaluation, reward issuance) are queued with [`FakeApi::after_submit`]
/// and become visible after their delay.
pub(crate) struct FakeApi {
    state: Arc<Mutex<FakeState>>,
    script: Mutex<Script>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl FakeApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(Mutex::new(FakeState::default())),
            script: Mutex::new(Script::default()),
        })
    }

    pub fn with_state(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut lock(&self.state));
    }

    pub fn fail(&self, resource: ResourceKey) {
        lock(&self.script).failing.insert(resource);
    }

    pub fn recover(&self, resource: ResourceKey) {
        lock(&self.script).failing.remove(&resource);
    }

    pub fn fail_submit(&self, err: ClientError) {
        lock(&self.script).submit_error = Some(err);
    }

    pub fn fail_claims(&self, err: ClientError) {
        lock(&self.script).claim_error = Some(err);
    }

    /// Answer `POST /actions` with exactly this payload.
    pub fn respond_to_submit(&self, patch: PlayerPatch) {
        lock(&self.script).submit_response = Some(patch);
    }

    /// Apply `effect` `delay` after the next submission.
    pub fn after_submit(
        &self,
        delay: Duration,
        effect: impl FnOnce(&mut FakeState) + Send + 'static,
    ) {
        lock(&self.script).on_submit.push((delay, Box::new(effect)));
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        lock(&self.script).fetch_delay = delay;
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        lock(&self.script).calls.get(endpoint).copied().unwrap_or(0)
    }

    /// Fetches of `endpoint` that ran to the end instead of being dropped.
    pub fn completed(&self, endpoint: &str) -> usize {
        lock(&self.script).completed.get(endpoint).copied().unwrap_or(0)
    }

    fn record(&self, endpoint: &'static str) {
        *lock(&self.script).calls.entry(endpoint).or_default() += 1;
    }

    async fn begin_fetch(&self, resource: ResourceKey) -> Result<(), ClientError> {
        self.record(resource.as_str());
        let delay = lock(&self.script).fetch_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let mut script = lock(&self.script);
        *script.completed.entry(resource.as_str()).or_default() += 1;
        if script.failing.contains(&resource) {
            return Err(ClientError::NetworkFailure(format!(
                "{} service unavailable",
                resource
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl GameApi for FakeApi {
    async fn submit_action(&self, request: &ActionRequest) -> Result<PlayerPatch, ClientError> {
        self.record("submit");
        let (error, response, effects) = {
            let mut script = lock(&self.script);
            (
                script.submit_error.clone(),
                script.submit_response.clone(),
                std::mem::take(&mut script.on_submit),
            )
        };
        if let Some(err) = error {
            return Err(err);
        }

        let full = {
            let mut state = lock(&self.state);
            let player = state
                .players
                .entry(request.player_id.clone())
                .or_insert_with(|| Player::new(request.player_id.clone()));
            *player
                .action_counters
                .entry(request.action_type.counter_name().to_string())
                .or_default() += i64::from(request.magnitude);
            PlayerPatch::from(&*player)
        };

        for (delay, effect) in effects {
            if delay.is_zero() {
                effect(&mut lock(&self.state));
            } else {
                let state = self.state.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    effect(&mut lock(&state));
                });
            }
        }

        Ok(response.unwrap_or(full))
    }

    async fn fetch_player(&self, player_id: &PlayerId) -> Result<Player, ClientError> {
        self.begin_fetch(ResourceKey::Player).await?;
        lock(&self.state)
            .players
            .get(player_id)
            .cloned()
            .ok_or_else(|| ClientError::ValidationFailure("player not found".to_string()))
    }

    async fn fetch_achievements(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<PlayerAchievementStatus>, ClientError> {
        self.begin_fetch(ResourceKey::Achievements).await?;
        Ok(lock(&self.state)
            .achievements
            .get(player_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_rewards(&self, player_id: &PlayerId) -> Result<Vec<RewardGrant>, ClientError> {
        self.begin_fetch(ResourceKey::Rewards).await?;
        Ok(lock(&self.state)
            .rewards
            .get(player_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_balance(&self, player_id: &PlayerId) -> Result<Balance, ClientError> {
        self.begin_fetch(ResourceKey::Balance).await?;
        Ok(lock(&self.state)
            .balances
            .get(player_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn claim_reward(&self, grant_id: &str) -> Result<RewardGrant, ClientError> {
        self.record("claim");
        if let Some(err) = lock(&self.script).claim_error.clone() {
            return Err(err);
        }
        let mut state = lock(&self.state);
        let FakeState {
            rewards, balances, ..
        } = &mut *state;
        let (owner, grant) = rewards
            .iter_mut()
            .find_map(|(owner, grants)| {
                grants
                    .iter_mut()
                    .find(|g| g.id == grant_id)
                    .map(|g| (owner.clone(), g))
            })
            .ok_or_else(|| ClientError::ValidationFailure("reward not found".to_string()))?;
        if grant.is_claimed {
            return Err(ClientError::ValidationFailure(
                "reward already claimed".to_string(),
            ));
        }
        grant.is_claimed = true;
        credit(balances.entry(owner).or_default(), grant);
        Ok(grant.clone())
    }

    async fn claim_all_rewards(
        &self,
        player_id: &PlayerId,
    ) -> Result<ClaimAllResponse, ClientError> {
        self.record("claim_all");
        if let Some(err) = lock(&self.script).claim_error.clone() {
            return Err(err);
        }
        let mut state = lock(&self.state);
        let FakeState {
            rewards, balances, ..
        } = &mut *state;
        let balance = balances.entry(player_id.clone()).or_default();
        let mut claimed = 0;
        for grant in rewards
            .get_mut(player_id)
            .into_iter()
            .flatten()
            .filter(|g| !g.is_claimed)
        {
            grant.is_claimed = true;
            credit(balance, grant);
            claimed += 1;
        }
        Ok(ClaimAllResponse { claimed })
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardPlayer>, ClientError> {
        self.record("leaderboard");
        Ok(lock(&self.state).leaderboard.clone())
    }
}

fn credit(balance: &mut Balance, grant: &RewardGrant) {
    match grant.reward_type {
        RewardType::Coins => balance.total_coins += grant.reward_amount,
        RewardType::Points => balance.total_points += grant.reward_amount,
        RewardType::Badge | RewardType::Item => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixtures
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn pid(id: &str) -> PlayerId {
    PlayerId::new(id).expect("non-empty id")
}

pub(crate) fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

/// Achievement status with id `ach-{code}`.
pub(crate) fn status(
    code: &str,
    progress: i64,
    required: i64,
    unlocked_at: Option<&str>,
) -> PlayerAchievementStatus {
    PlayerAchievementStatus {
        achievement_id: format!("ach-{code}"),
        code: code.to_string(),
        name: format!("{code} name"),
        required_value: required,
        progress,
        unlocked_at: unlocked_at.map(ts),
        reward_points: 50,
    }
}

pub(crate) fn player(id: &str, coins: i64, monsters: i64) -> Player {
    let mut player = Player::new(pid(id));
    player.username = format!("{id}-name");
    player.coin_balance = coins;
    player
        .action_counters
        .insert(lootsync_types::counters::MONSTERS_KILLED.to_string(), monsters);
    player
}

pub(crate) fn grant(id: &str, player_id: &str, reward_type: RewardType, amount: i64) -> RewardGrant {
    RewardGrant {
        id: id.to_string(),
        player_id: player_id.to_string(),
        achievement_id: None,
        reward_type,
        reward_amount: amount,
        awarded_at: ts("2024-01-01T00:00:00Z"),
        is_claimed: false,
    }
}

/// A backend holding one player with a single achievement one kill short.
pub(crate) fn seeded_api(id: &str) -> Arc<FakeApi> {
    let api = FakeApi::new();
    let player_id = pid(id);
    api.with_state(|s| {
        s.players.insert(player_id.clone(), player(id, 120, 4));
        s.achievements
            .insert(player_id.clone(), vec![status("KILL_5", 4, 5, None)]);
        s.rewards.insert(
            player_id.clone(),
            vec![grant("g1", id, RewardType::Coins, 25)],
        );
        s.balances.insert(
            player_id.clone(),
            Balance {
                player_id: Some(id.to_string()),
                total_coins: 120,
                total_points: 300,
                last_updated: None,
            },
        );
    });
    api
}
