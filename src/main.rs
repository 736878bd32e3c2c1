use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};

use presswatch::monitor::MonitorOptions;
use presswatch::{Config, Database, Result, WebServer};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "presswatch", version, about = "HPP news dashboard backend")]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the account API
    Serve,
    /// Refresh the feed artifacts once
    FetchFeeds,
    /// Search the mailbox and send a digest of new matches
    Monitor {
        /// Only authorize (refresh and store the token), then exit
        #[arg(long)]
        auth: bool,
        /// Print the digest instead of sending it; keep the stored timestamp
        #[arg(long)]
        dry_run: bool,
        /// Search from this epoch instead of the stored timestamp
        #[arg(long, value_name = "EPOCH")]
        since: Option<i64>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::load_with_env(path),
        None => {
            if PathBuf::from(DEFAULT_CONFIG).exists() {
                Config::load_with_env(DEFAULT_CONFIG)
            } else {
                eprintln!("{DEFAULT_CONFIG} not found, using default configuration.");
                let mut config = Config::default();
                config.apply_env_overrides();
                Ok(config)
            }
        }
    }
}

async fn execute(command: Command, config: Config) -> Result<()> {
    match command {
        Command::Serve => {
            config.validate_web()?;
            let db = Database::open(&config.database.path).await?;
            let server = WebServer::new(&config.web, db)?;
            server.run().await
        }
        Command::FetchFeeds => {
            config.validate_feeds()?;
            let report = presswatch::feed::run(&config.feeds).await?;
            info!(
                articles = report.articles,
                feeds_ok = report.feeds_ok,
                feeds_failed = report.feeds_failed,
                "Feed refresh complete"
            );
            Ok(())
        }
        Command::Monitor {
            auth,
            dry_run,
            since,
        } => {
            let options = MonitorOptions {
                auth_only: auth,
                dry_run,
                since,
            };
            let report = presswatch::monitor::run(&config.monitor, options).await?;
            if let Some(digest) = report.dry_run_digest {
                println!("{digest}");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = presswatch::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        presswatch::logging::init_console_only(&config.logging.level);
    }

    match execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
