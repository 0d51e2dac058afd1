use async_trait::async_trait;
use lootsync_types::{
    ActionRequest, Balance, ClaimAllResponse, LeaderboardPlayer, Player, PlayerAchievementStatus,
    PlayerId, PlayerPatch, RewardGrant,
};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;

use super::GameApi;
use super::validate::{Validate, decode, player_from_patch};
use crate::config::ClientConfig;
use crate::error::ClientError;

const USER_AGENT: &str = concat!("lootsync/", env!("CARGO_PKG_VERSION"));

/// reqwest adapter for the three backend services.
#[derive(Debug, Clone)]
pub struct HttpGameApi {
    client: Client,
    player_url: Url,
    achievement_url: Url,
    reward_url: Url,
}

impl HttpGameApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::NetworkFailure(format!("http client: {e}")))?;

        Ok(Self {
            client,
            player_url: parse_base(&config.player_service_url)?,
            achievement_url: parse_base(&config.achievement_service_url)?,
            reward_url: parse_base(&config.reward_service_url)?,
        })
    }

    /// Append path segments to a service base. Each segment is
    /// percent-encoded, so ids containing `/`, `?` or `#` stay one segment.
    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::NetworkFailure(format!("cannot append path to {base}")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send<T: DeserializeOwned + Validate>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;

        if let Some(err) = classify_status(status, &body) {
            tracing::debug!(%status, error = %err, "Request rejected");
            return Err(err);
        }
        decode(&body)
    }
}

fn parse_base(url: &str) -> Result<Url, ClientError> {
    Url::parse(url).map_err(|e| ClientError::NetworkFailure(format!("invalid service url {url}: {e}")))
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::NetworkFailure("request timed out".to_string())
    } else {
        ClientError::NetworkFailure(e.to_string())
    }
}

/// Map a non-success status to an error. 4xx means the backend rejected
/// what we sent; everything else is treated as the network failing us.
pub(crate) fn classify_status(status: StatusCode, body: &[u8]) -> Option<ClientError> {
    if status.is_success() {
        return None;
    }
    let detail = server_message(body).unwrap_or_else(|| status.to_string());
    if status.is_client_error() {
        Some(ClientError::ValidationFailure(detail))
    } else {
        Some(ClientError::NetworkFailure(detail))
    }
}

/// Pull `error` or `message` out of a JSON error body.
fn server_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|k| value.get(k).and_then(|v| v.as_str()))
        .map(str::to_string)
}

#[async_trait]
impl GameApi for HttpGameApi {
    async fn submit_action(&self, request: &ActionRequest) -> Result<PlayerPatch, ClientError> {
        let url = Self::endpoint(&self.player_url, &["actions"])?;
        self.send(self.client.post(url).json(request)).await
    }

    async fn fetch_player(&self, player_id: &PlayerId) -> Result<Player, ClientError> {
        let url = Self::endpoint(&self.player_url, &["players", player_id.as_str()])?;
        let patch: PlayerPatch = self.send(self.client.get(url)).await?;
        player_from_patch(player_id, &patch)
    }

    async fn fetch_achievements(
        &self,
        player_id: &PlayerId,
    ) -> Result<Vec<PlayerAchievementStatus>, ClientError> {
        let url = Self::endpoint(
            &self.achievement_url,
            &["players", player_id.as_str(), "achievements"],
        )?;
        self.send(self.client.get(url)).await
    }

    async fn fetch_rewards(&self, player_id: &PlayerId) -> Result<Vec<RewardGrant>, ClientError> {
        let url = Self::endpoint(&self.reward_url, &["players", player_id.as_str(), "rewards"])?;
        self.send(self.client.get(url)).await
    }

    async fn fetch_balance(&self, player_id: &PlayerId) -> Result<Balance, ClientError> {
        let url = Self::endpoint(&self.reward_url, &["players", player_id.as_str(), "balance"])?;
        self.send(self.client.get(url)).await
    }

    async fn claim_reward(&self, grant_id: &str) -> Result<RewardGrant, ClientError> {
        let url = Self::endpoint(&self.reward_url, &["rewards", grant_id, "claim"])?;
        self.send(self.client.post(url)).await
    }

    async fn claim_all_rewards(
        &self,
        player_id: &PlayerId,
    ) -> Result<ClaimAllResponse, ClientError> {
        let url = Self::endpoint(
            &self.reward_url,
            &["players", player_id.as_str(), "rewards", "claim-all"],
        )?;
        self.send(self.client.post(url)).await
    }

    async fn fetch_leaderboard(&self) -> Result<Vec<LeaderboardPlayer>, ClientError> {
        let url = Self::endpoint(&self.player_url, &["players"])?;
        self.send(self.client.get(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK, b""), None);
        assert_eq!(
            classify_status(StatusCode::BAD_REQUEST, br#"{"error": "magnitude must be positive"}"#),
            Some(ClientError::ValidationFailure(
                "magnitude must be positive".to_string()
            ))
        );
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, b"down"),
            Some(ClientError::NetworkFailure(_))
        ));
    }

    #[test]
    fn test_trailing_slash_on_base_is_ignored() {
        let config = ClientConfig {
            player_service_url: "http://localhost:3001/".to_string(),
            ..ClientConfig::default()
        };
        let api = HttpGameApi::new(&config).unwrap();
        let url = HttpGameApi::endpoint(&api.player_url, &["players"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3001/players");
    }

    #[test]
    fn test_ids_are_encoded_as_single_segments() {
        let config = ClientConfig {
            achievement_service_url: "http://localhost:3002/api".to_string(),
            ..ClientConfig::default()
        };
        let api = HttpGameApi::new(&config).unwrap();
        let id = PlayerId::new("a/b?c#d").unwrap();

        let url = HttpGameApi::endpoint(
            &api.achievement_url,
            &["players", id.as_str(), "achievements"],
        )
        .unwrap();
        let request = api.client.get(url).build().unwrap();

        assert_eq!(
            request.url().as_str(),
            "http://localhost:3002/api/players/a%2Fb%3Fc%23d/achievements"
        );
        assert_eq!(request.url().path_segments().unwrap().count(), 4);
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let config = ClientConfig {
            reward_service_url: "not a url".to_string(),
            ..ClientConfig::default()
        };
        assert!(HttpGameApi::new(&config).is_err());
    }
}
