//! Hostwatch CLI
//!
//! Command-line interface for the Hostwatch monitoring engine.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::info;

use hostwatch::db::Database;
use hostwatch::Config;

/// Hostwatch - infrastructure metrics and alerting engine
#[derive(Parser)]
#[command(name = "hostwatch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Hostwatch server
    Serve {
        /// HTTP API port (overrides HOSTWATCH_PORT)
        #[arg(long, env = "HOSTWATCH_PORT")]
        port: Option<u16>,
    },

    /// Run database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let mut config = Config::from_env();

    let default_level = if cli.verbose { "debug" } else { &config.logging.level };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let result = match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            run_serve(config).await
        }
        Commands::Migrate => run_migrate(config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_serve(config: Config) -> anyhow::Result<()> {
    info!(
        addr = config.server.bind_addr(),
        cache_capacity = config.cache.capacity,
        batch_interval_ms = config.persistence.batch_interval_ms,
        retention_days = config.retention.days,
        "Starting Hostwatch"
    );

    let server = hostwatch::api::Server::new(config).await?;
    server.serve().await?;
    Ok(())
}

async fn run_migrate(config: Config) -> anyhow::Result<()> {
    let db = Database::new(&config).await?;
    db.migrate().await?;
    info!("Migrations complete");
    Ok(())
}
