mod commands;

use clap::{Parser, Subcommand};
use lootsync_core::ClientConfig;
use lootsync_types::{ActionType, Metric};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const ENV_LOG_DIR: &str = "LOOTSYNC_LOG_DIR";

#[derive(Parser)]
#[command(version, about = "Record player actions and watch rewards roll in")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an action and print any achievements it unlocks
    Submit {
        #[arg(short, long)]
        player: String,
        /// monster_killed or time_played
        #[arg(short, long)]
        action: ActionType,
        #[arg(short, long, default_value_t = 1)]
        magnitude: u32,
    },
    /// Claim one reward, or every outstanding reward when no grant is given
    Claim {
        #[arg(short, long)]
        player: String,
        #[arg(short, long)]
        grant: Option<String>,
    },
    /// Refresh everything cached for a player
    Sync {
        #[arg(short, long)]
        player: String,
    },
    /// Rank all players by a metric
    Leaderboard {
        #[arg(short, long, default_value_t = Metric::Monsters)]
        metric: Metric,
        /// Highlight this player's rank
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Print the config file location and effective settings
    Config {
        /// Overwrite the config file with defaults first
        #[arg(long)]
        reset: bool,
    },
}

/// Log to a daily file under `LOOTSYNC_LOG_DIR` when set, otherwise stderr.
fn init_logging() -> Option<WorkerGuard> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::WARN.into())
        .from_env_lossy();

    if let Ok(dir) = std::env::var(ENV_LOG_DIR) {
        let appender = tracing_appender::rolling::daily(dir, "lootsync.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_ansi(false)
            .with_writer(writer)
            .init();
        return Some(guard);
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    None
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let _log_guard = init_logging();
    let cli = Cli::parse();

    let config = ClientConfig::load().map_err(|e| e.to_string())?;
    tracing::debug!("Loaded config: {:?}", config);

    match cli.command {
        Commands::Submit {
            player,
            action,
            magnitude,
        } => commands::submit(&config, &player, action, magnitude).await,
        Commands::Claim { player, grant } => {
            commands::claim(&config, &player, grant.as_deref()).await
        }
        Commands::Sync { player } => commands::sync(&config, &player).await,
        Commands::Leaderboard { metric, email } => {
            commands::leaderboard(&config, metric, email.as_deref()).await
        }
        Commands::Config { reset } => commands::show_config(config, reset),
    }
}
