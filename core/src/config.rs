//! Client configuration, persisted with confy under the `lootsync` app name.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_NAME: &str = "lootsync";

pub const ENV_PLAYER_URL: &str = "LOOTSYNC_PLAYER_URL";
pub const ENV_ACHIEVEMENT_URL: &str = "LOOTSYNC_ACHIEVEMENT_URL";
pub const ENV_REWARD_URL: &str = "LOOTSYNC_REWARD_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read or write configuration: {0}")]
    Confy(#[from] confy::ConfyError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub player_service_url: String,
    pub achievement_service_url: String,
    pub reward_service_url: String,
    /// Applied to every HTTP call. Exceeding it is a network failure.
    pub request_timeout_ms: u64,
    /// Wait between an accepted action and the achievement re-read.
    pub settle_delay_ms: u64,
    /// Extra re-reads when the post-image shows no change at all.
    /// Each retry doubles the previous delay. `0` keeps a single fixed wait.
    pub settle_retries: u32,
    /// Gap between consecutive notifications of one batch.
    pub stagger_ms: u64,
    pub notification_lifetime_ms: u64,
    /// Run one submission pipeline at a time per player.
    pub serialize_per_player: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            player_service_url: "http://localhost:3001".to_string(),
            achievement_service_url: "http://localhost:3002".to_string(),
            reward_service_url: "http://localhost:3003".to_string(),
            request_timeout_ms: 10_000,
            settle_delay_ms: 200,
            settle_retries: 0,
            stagger_ms: 1_600,
            notification_lifetime_ms: 5_000,
            serialize_per_player: false,
        }
    }
}

impl ClientConfig {
    /// Load from disk (creating defaults on first run), then apply
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config: Self = confy::load(APP_NAME, None)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, None, self)?;
        Ok(())
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(confy::get_configuration_file_path(APP_NAME, None)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(url) = non_empty(ENV_PLAYER_URL) {
            self.player_service_url = url;
        }
        if let Some(url) = non_empty(ENV_ACHIEVEMENT_URL) {
            self.achievement_service_url = url;
        }
        if let Some(url) = non_empty(ENV_REWARD_URL) {
            self.reward_service_url = url;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }

    pub fn notification_lifetime(&self) -> Duration {
        Duration::from_millis(self.notification_lifetime_ms)
    }
}
