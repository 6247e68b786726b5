use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scout_app::{client_factory, discover, server};
use scout_engine::{DiscoverySettings, Orchestrator, ScoutConfig};
use scout_logging::{scout_info, LevelFilter, LogDestination, DEFAULT_LOG_FILE};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "channel-scout", about = "Keyword search across Telegram channels")]
struct Cli {
    /// Session file created by an interactive login (overrides SCOUT_SESSION_FILE)
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web page and the streaming /scrape endpoint
    Serve {
        #[arg(long, env = "PORT", default_value_t = 8080)]
        port: u16,
    },
    /// Search all public channels for keywords and write a CSV report
    Discover {
        /// Keyword to search for; may be repeated
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// File with one keyword per line
        #[arg(long)]
        keywords_file: Option<PathBuf>,
        /// Messages to inspect per keyword
        #[arg(long, default_value_t = 10)]
        limit: u32,
        /// Pause between keywords
        #[arg(long, default_value_t = 5)]
        delay_secs: u64,
        #[arg(long, default_value = discover::DEFAULT_REPORT_FILE)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    scout_logging::initialize(
        LogDestination::Both(PathBuf::from(DEFAULT_LOG_FILE)),
        LevelFilter::Info,
    );

    let mut config = ScoutConfig::from_env();
    if let Some(session) = cli.session {
        config.session_path = session;
    }
    config.log_summary();

    match cli.command {
        Command::Serve { port } => {
            scout_info!("Starting channel-scout server");
            let orchestrator = Orchestrator::new(Arc::new(config), client_factory());
            server::serve(orchestrator, port).await
        }
        Command::Discover {
            keywords,
            keywords_file,
            limit,
            delay_secs,
            output,
        } => {
            let settings = DiscoverySettings {
                keywords: discover::collect_keywords(&keywords, keywords_file.as_deref())?,
                limit_per_keyword: limit,
                politeness_delay: Duration::from_secs(delay_secs),
                ..DiscoverySettings::default()
            };
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    scout_info!("Interrupted, finishing the current keyword...");
                    interrupt.cancel();
                }
            });
            let factory = client_factory();
            discover::run(factory.as_ref(), &config, &settings, &output, &cancel).await?;
            Ok(())
        }
    }
}
