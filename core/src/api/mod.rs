//! Backend port.
//!
//! The client only ever talks to the player, achievement and reward services
//! through [`GameApi`]. [`HttpGameApi`] is the production adapter; tests plug
//! in an in-memory double.

mod http;
pub mod validate;

pub use http::HttpGameApi;

use async_trait::async_trait;
use lootsync_types::{
    ActionRequest, Balance, ClaimAllResponse, LeaderboardPlayer, Player, PlayerAchievementStatus,
    PlayerId, PlayerPatch, RewardGrant,
};

use crate::error::ClientError;

#[async_trait]
pub trait GameApi: Send + Sync {
    /// `POST /actions`. Returns the authoritative (possibly partial) player.
    async fn submit_action(&self, request: &ActionRequest) -> Result<PlayerPatch, ClientError>;

    async fn fetch_player(&self, player_id: &PlayerId) -> Result<Player, ClientError>;

    async fn fetch_achievements(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<PlayerAchievementStatus>, ClientError>;

    async fn fetch_rewards(&self, player_id: &PlayerId) -> Result<Vec<RewardGrant>, ClientError>;

    async fn fetch_balance(&self, player_id: &PlayerId) -> Result<Balance, ClientError>;

    async fn claim_reward(&self, grant_id: &str) -> Result<RewardGrant, ClientError>;

    async fn claim_all_rewards(&self, player_id: &PlayerId)
    -> Result<ClaimAllResponse, ClientError>;

    async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardPlayer>, ClientError>;
}
