//! Player rankings.

use std::sync::Arc;

use lootsync_types::formatting::{format_minutes, format_thousands};
use lootsync_types::{LeaderboardPlayer, Metric};

use crate::api::GameApi;
use crate::error::ClientError;

pub fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Monsters => "Monsters Killed",
        Metric::Time => "Time Played (min)",
    }
}

pub fn metric_value(player: &LeaderboardPlayer, metric: Metric) -> i64 {
    match metric {
        Metric::Monsters => player.monsters_killed,
        Metric::Time => player.time_played,
    }
}

pub fn format_metric_value(player: &LeaderboardPlayer, metric: Metric) -> String {
    match metric {
        Metric::Monsters => format_thousands(metric_value(player, metric), false),
        Metric::Time => format_minutes(metric_value(player, metric)),
    }
}

/// Active players, best first. Ties keep their server order.
pub fn rank_players(players: &[LeaderboardPlayer], metric: Metric) -> Vec<LeaderboardPlayer> {
    let mut ranked: Vec<LeaderboardPlayer> =
        players.iter().filter(|p| p.is_active).cloned().collect();
    ranked.sort_by_key(|p| std::cmp::Reverse(metric_value(p, metric)));
    ranked
}

/// 1-based position of the player with `email`, compared case-insensitively.
pub fn rank_of(ranked: &[LeaderboardPlayer], email: &str) -> Option<usize> {
    ranked
        .iter()
        .position(|p| p.email.eq_ignore_ascii_case(email))
        .map(|i| i + 1)
}

#[derive(Clone)]
pub struct Leaderboard {
    api: Arc<dyn GameApi>,
}

impl Leaderboard {
    pub fn new(api: Arc<dyn GameApi>) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, metric: Metric) -> Result<Vec<LeaderboardPlayer>, ClientError> {
        let players = self.api.fetch_leaderboard().await?;
        tracing::debug!(players = players.len(), %metric, "Ranking leaderboard");
        Ok(rank_players(&players, metric))
    }
}
