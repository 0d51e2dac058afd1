use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A player row as returned by the player listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPlayer {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub monsters_killed: i64,
    /// Minutes.
    #[serde(default)]
    pub time_played: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Ranking metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    #[default]
    Monsters,
    Time,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Monsters => f.write_str("monsters"),
            Self::Time => f.write_str("time"),
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monsters" | "kills" => Ok(Self::Monsters),
            "time" | "minutes" => Ok(Self::Time),
            other => Err(format!("unknown metric: {other}")),
        }
    }
}
