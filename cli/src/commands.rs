use std::collections::HashSet;
use std::time::Duration;

use lootsync_core::leaderboard::{format_metric_value, metric_label, rank_of};
use lootsync_core::{ClientConfig, RewardsClient, SettlePolicy};
use lootsync_types::formatting::{
    format_compact, format_minutes, format_pct_ratio, format_thousands,
};
use lootsync_types::{ActionType, Metric, Notification, NotificationId, Player, PlayerId, Severity};
use tokio::sync::watch;
use tokio::time::Instant;

/// Slack after the last expected reveal before the process exits.
const GRACE: Duration = Duration::from_millis(300);

// ─────────────────────────────────────────────────────────────────────────────
// Notification output
// ─────────────────────────────────────────────────────────────────────────────

/// Prints each notification once, the first time it becomes visible.
struct NotificationFeed {
    rx: watch::Receiver<Vec<Notification>>,
    printed: HashSet<NotificationId>,
}

impl NotificationFeed {
    fn new(client: &RewardsClient) -> Self {
        Self {
            rx: client.subscribe_notifications(),
            printed: HashSet::new(),
        }
    }

    fn print_new(&mut self) {
        let visible = self.rx.borrow_and_update().clone();
        for n in visible {
            if self.printed.insert(n.id) {
                println!("[{}] {}: {}", severity_tag(n.severity), n.title, n.message);
            }
        }
    }
}

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Success => "ok",
        Severity::Info => "info",
        Severity::Error => "error",
    }
}

/// Worst-case time from an accepted action to the final post-image read.
fn settle_window(config: &ClientConfig) -> Duration {
    let policy = SettlePolicy::from_config(config);
    (0..=policy.retries).map(|n| policy.delay_for(n)).sum()
}

async fn connect(config: &ClientConfig, player: &str) -> Result<(RewardsClient, PlayerId), String> {
    let player_id = PlayerId::new(player).ok_or("player id must not be empty")?;
    let client = RewardsClient::with_http(config).map_err(|e| e.to_string())?;
    client
        .sign_in(player_id.clone())
        .await
        .map_err(|e| format!("Could not load player {player_id}: {e}"))?;
    Ok((client, player_id))
}

fn print_player(player: &Player) {
    println!(
        "{} (level {}): {} coins, {} xp, {} monsters, {} played",
        if player.username.is_empty() {
            player.id.as_str()
        } else {
            player.username.as_str()
        },
        player.level,
        format_thousands(player.coin_balance, false),
        format_thousands(player.experience_points, false),
        format_thousands(player.monsters_killed(), false),
        format_minutes(player.minutes_played()),
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

pub async fn submit(
    config: &ClientConfig,
    player: &str,
    action: ActionType,
    magnitude: u32,
) -> Result<(), String> {
    let (client, _) = connect(config, player).await?;
    let mut feed = NotificationFeed::new(&client);
    let mut unlocks = client.subscribe_unlocks();

    let player = match client.submit_action(action, magnitude).await {
        Ok(player) => player,
        Err(e) => {
            feed.print_new();
            return Err(e.to_string());
        }
    };
    print_player(&player);

    // Unlocks arrive after the settle wait and are revealed one stagger apart.
    let mut deadline = Instant::now() + settle_window(config) + GRACE;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => break,
            changed = feed.rx.changed() => {
                if changed.is_err() {
                    break;
                }
                feed.print_new();
            }
            Ok(batch) = unlocks.recv() => {
                let reveal = config.stagger() * batch.unlocked.len() as u32;
                deadline = deadline.max(Instant::now() + reveal + GRACE);
            }
        }
    }
    feed.print_new();
    Ok(())
}

pub async fn claim(config: &ClientConfig, player: &str, grant: Option<&str>) -> Result<(), String> {
    let (client, player_id) = connect(config, player).await?;
    let mut feed = NotificationFeed::new(&client);

    let result = match grant {
        Some(grant_id) => client.claim_reward(grant_id).await.map(|_| ()),
        None => client.claim_all().await.map(|_| ()),
    };
    feed.print_new();
    result.map_err(|e| e.to_string())?;

    if let Some(balance) = client.cache().balance(&player_id) {
        println!(
            "Balance: {} coins, {} points",
            format_thousands(balance.total_coins, false),
            format_compact(balance.total_points, false)
        );
    }
    Ok(())
}

pub async fn sync(config: &ClientConfig, player: &str) -> Result<(), String> {
    let (client, player_id) = connect(config, player).await?;
    let mut feed = NotificationFeed::new(&client);

    let result = client.sync().await;
    feed.print_new();
    if let Err(e) = result {
        // Whatever did refresh is still worth showing.
        eprintln!("warning: {e}");
    }

    let snapshot = client.cache().snapshot(&player_id);
    if let Some(player) = &snapshot.player {
        print_player(player);
    }
    if let Some(achievements) = &snapshot.achievements {
        let unlocked = achievements.iter().filter(|s| s.is_unlocked()).count() as i64;
        println!(
            "Achievements: {unlocked}/{} unlocked ({})",
            achievements.len(),
            format_pct_ratio(unlocked, achievements.len() as i64, false)
        );
    }
    for status in snapshot.achievements.iter().flatten() {
        let mark = if status.is_unlocked() { "x" } else { " " };
        println!(
            "  [{}] {:<16} {:>3}%  {}/{}",
            mark,
            status.code,
            status.progress_pct(),
            status.progress,
            status.required_value
        );
    }
    let unclaimed = client.unclaimed_rewards().await;
    if !unclaimed.is_empty() {
        println!("{} unclaimed rewards:", unclaimed.len());
        for grant in unclaimed {
            println!(
                "  {}  +{} {}",
                grant.id,
                grant.reward_amount,
                grant.reward_type.label()
            );
        }
    }
    Ok(())
}

pub async fn leaderboard(
    config: &ClientConfig,
    metric: Metric,
    email: Option<&str>,
) -> Result<(), String> {
    let client = RewardsClient::with_http(config).map_err(|e| e.to_string())?;
    let ranked = client.leaderboard(metric).await.map_err(|e| e.to_string())?;

    println!("{:>4}  {:<20} {}", "#", "Player", metric_label(metric));
    for (i, p) in ranked.iter().enumerate() {
        let you = email.is_some_and(|e| p.email.eq_ignore_ascii_case(e));
        println!(
            "{:>4}  {:<20} {}{}",
            i + 1,
            p.username,
            format_metric_value(p, metric),
            if you { "  <- you" } else { "" }
        );
    }

    if let Some(email) = email {
        match rank_of(&ranked, email) {
            Some(rank) => println!("Your rank: {rank} of {}", ranked.len()),
            None => println!("{email} is not on the leaderboard"),
        }
    }
    Ok(())
}

pub fn show_config(mut config: ClientConfig, reset: bool) -> Result<(), String> {
    if reset {
        ClientConfig::default().save().map_err(|e| e.to_string())?;
        config = ClientConfig::default();
    }
    let path = ClientConfig::path().map_err(|e| e.to_string())?;
    let body = toml::to_string_pretty(&config).map_err(|e| e.to_string())?;
    println!("# {}", path.display());
    print!("{body}");
    Ok(())
}
