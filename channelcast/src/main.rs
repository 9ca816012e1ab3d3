mod http;
mod migrations;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::info;

use channelcast_core::{logging, supervisor::ChannelSupervisor, Config};

use server::ChannelCastServer;

#[derive(Parser)]
#[command(name = "channelcast", about = "Linear channel broadcast orchestrator")]
struct Cli {
    /// Path to a YAML config file; CHANNELCAST_* env vars always take priority.
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load configuration")?;
    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("invalid configuration: {}", errors.join("; ")))?;

    let _log_guard = logging::init_logging(&config.logging)?;
    info!("ChannelCast starting...");
    info!(http_address = %config.http_address(), "HTTP address configured");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(config.database.connect_timeout_seconds))
        .idle_timeout(Duration::from_secs(config.database.idle_timeout_seconds))
        .connect(config.database_url())
        .await
        .context("failed to connect to database")?;

    migrations::run_migrations(&pool).await?;

    let supervisor = std::sync::Arc::new(ChannelSupervisor::new(
        pool.clone(),
        config.playlist.clone(),
        config.encoder.clone(),
    ));

    let server = ChannelCastServer::new(config, supervisor, pool);
    server.start().await?;

    Ok(())
}
