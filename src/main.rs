//! Caze bot CLI - main entry point
//!
//! Replies with an image to every tweet mentioning the bot.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use caze_bot::dispatch::EventErrorPolicy;
use caze_bot::{commands, metrics, Config};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "caze_bot")]
#[command(about = "Replies to @caze_bot mentions with an image", long_about = None)]
#[command(version)]
struct Cli {
    /// Address to expose Prometheus metrics (e.g., 0.0.0.0:9898)
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<String>,

    /// Path to the YAML config file (default: config.yml, then ../config.yml)
    #[arg(long, env = "CAZE_BOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen for mentions and reply to each one (default)
    Run {
        /// Image attached to every reply
        #[arg(long)]
        asset: Option<PathBuf>,

        /// Phrase to track; repeat for several (default: @caze_bot)
        #[arg(long)]
        track: Vec<String>,

        /// What to do when a single reply fails (default: abort)
        #[arg(long, value_enum)]
        on_event_error: Option<EventErrorPolicy>,

        /// Reuse one upload across replies until it is about to expire
        #[arg(long, default_value_t = false)]
        media_cache: bool,
    },

    /// Verify the credentials and print the account
    Verify,

    /// Upload the image once and print the media id
    Upload {
        /// Image to upload (default: configured asset)
        #[arg(long)]
        asset: Option<PathBuf>,
    },
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Run { .. } => "run",
            Commands::Verify => "verify",
            Commands::Upload { .. } => "upload",
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load_from_file(path)?),
        None => Ok(Config::new()),
    }
}

async fn execute_command(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            asset,
            track,
            on_event_error,
            media_cache,
        } => {
            let mut config = config;
            if let Some(asset) = asset {
                config.asset_path = asset;
            }
            if !track.is_empty() {
                config.track = track;
            }
            if let Some(policy) = on_event_error {
                config.on_event_error = policy;
            }
            if media_cache {
                config.cache_media = true;
            }
            commands::run_bot(config).await?;
        }
        Commands::Verify => {
            let user = commands::verify_run(&config).await?;
            info!(screen_name = %user.screen_name, id = user.id, "Credentials are valid");
        }
        Commands::Upload { asset } => {
            let media = commands::upload_run(&config, asset.as_deref()).await?;
            println!("{}", media.media_id_string);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for local development
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("caze_bot=info".parse()?))
        .init();

    let cli = Cli::parse();

    if let Some(addr) = cli.metrics_addr.as_deref() {
        match addr.parse::<SocketAddr>() {
            Ok(socket) => metrics::spawn_metrics_server(socket),
            Err(err) => warn!(%addr, "Invalid metrics address: {}", err),
        }
    }

    let config = load_config(cli.config.as_ref())?;
    let command = cli.command.unwrap_or(Commands::Run {
        asset: None,
        track: Vec::new(),
        on_event_error: None,
        media_cache: false,
    });

    let command_name = command.name();
    metrics::record_command_start(command_name);
    let start = Instant::now();

    let result = execute_command(command, config).await;

    metrics::record_command_result(command_name, start.elapsed(), result.is_ok());

    result
}
