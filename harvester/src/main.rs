//! Chaos Harvester Main Binary
//!
//! Wires the service together:
//! - Storage: SQLite event table
//! - Extraction: text-generation client and signal extractor
//! - API: ingestion endpoint, dashboard and health check

use anyhow::{Context, Result};
use chaos_harvester_api::prelude::*;
use chaos_harvester_core::config::Config;
use chaos_harvester_extraction::{ExtractionSettings, OpenAiClient, SignalExtractor};
use chaos_harvester_storage::SqliteEventStore;
use clap::{Parser, Subcommand};
use std::{path::PathBuf, sync::Arc};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Chaos Harvester CLI arguments
#[derive(Debug, Parser)]
#[clap(name = "harvester", version, about = "Ingest chaos, extract signals, show the damage")]
struct Cli {
    /// Configuration file path
    #[clap(short, long, default_value = "config/harvester.yaml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[clap(long, env = "HARVESTER_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Enable JSON logging
    #[clap(long, env = "HARVESTER_LOG_JSON", global = true)]
    log_json: bool,

    /// Load and validate configuration, then exit
    #[clap(long, global = true)]
    dry_run: bool,

    #[clap(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Start the harvester service (default if no subcommand given)
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    info!("Starting Chaos Harvester v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(Commands::Serve) | None => run_serve_command(&cli).await,
    }
}

async fn run_serve_command(cli: &Cli) -> Result<()> {
    info!("Loading configuration from: {:?}", cli.config);

    let config = Config::load(&cli.config).context("Failed to load configuration")?;

    info!(
        database = %config.storage.database_path,
        model = %config.llm.model,
        "Configuration loaded successfully"
    );

    let api_config = ApiConfig::from_config(&config).context("Invalid server configuration")?;

    if cli.dry_run {
        info!("Dry run mode - configuration validated, exiting");
        return Ok(());
    }

    let store = Arc::new(
        SqliteEventStore::open(&config.storage.database_path)
            .context("Failed to initialize event store")?,
    );

    let client = OpenAiClient::new(&config.llm).context("Failed to build text-generation client")?;
    let extractor = Arc::new(SignalExtractor::new(
        Arc::new(client),
        ExtractionSettings::from(&config.llm),
    ));

    let states = AppStates::new(
        store,
        extractor,
        config.dashboard.escape_html,
        env!("CARGO_PKG_VERSION"),
    );

    ApiServer::new(api_config, states)
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Chaos Harvester stopped");

    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("Received Ctrl+C, shutting down..."); },
        _ = terminate => { info!("Received SIGTERM, shutting down..."); },
    }
}

/// Initialize logging based on CLI arguments
fn init_logging(cli: &Cli) -> Result<()> {
    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .context("Invalid log level")?;

    if cli.log_json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_line_number(true),
            )
            .with(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(log_level.into()),
            )
            .init();
    }

    info!("Logging initialized at level: {}", log_level);

    Ok(())
}
