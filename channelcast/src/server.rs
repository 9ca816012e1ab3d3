//! Server lifecycle management
//!
//! Manages startup and graceful shutdown of the two components that make
//! up a running instance: the Channel Supervisor (one playback task per
//! enabled channel) and the HTTP status/control surface.

use std::sync::Arc;

use channelcast_core::{supervisor::ChannelSupervisor, Config};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::http;

/// Running server instance - owns the supervisor, the pool, and the HTTP
/// listener task.
pub struct ChannelCastServer {
    config: Config,
    supervisor: Arc<ChannelSupervisor>,
    pool: PgPool,
    http_handle: Option<JoinHandle<()>>,
}

impl ChannelCastServer {
    #[must_use]
    pub const fn new(config: Config, supervisor: Arc<ChannelSupervisor>, pool: PgPool) -> Self {
        Self {
            config,
            supervisor,
            pool,
            http_handle: None,
        }
    }

    /// Start all enabled channels and the HTTP surface, then block until a
    /// shutdown signal arrives.
    pub async fn start(mut self) -> anyhow::Result<()> {
        info!("Starting ChannelCast server...");

        self.supervisor
            .start_enabled_channels()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to start enabled channels: {e}"))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let http_handle = self.start_http_server(shutdown_rx).await?;
        self.http_handle = Some(http_handle);

        info!("ChannelCast server started successfully");

        let http_handle = self
            .http_handle
            .take()
            .ok_or_else(|| anyhow::anyhow!("HTTP server handle missing after startup"))?;

        tokio::select! {
            _ = http_handle => {
                error!("HTTP server stopped unexpectedly");
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        let _ = shutdown_tx.send(true);
        self.shutdown().await;

        Ok(())
    }

    async fn shutdown(&self) {
        info!("Shutting down ChannelCast server...");

        self.supervisor.shutdown_all().await;

        info!("Closing database connection pool...");
        self.pool.close().await;
        info!("ChannelCast server shut down complete");
    }

    async fn start_http_server(&self, shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<JoinHandle<()>> {
        let http_address = self.config.http_address();
        let state = http::AppState {
            supervisor: self.supervisor.clone(),
        };
        let router = http::create_router(state);

        let handle = tokio::spawn(async move {
            let http_addr: std::net::SocketAddr = match http_address.parse() {
                Ok(addr) => addr,
                Err(e) => {
                    error!("Invalid HTTP address '{}': {}", http_address, e);
                    return;
                }
            };

            let listener = match tokio::net::TcpListener::bind(http_addr).await {
                Ok(listener) => listener,
                Err(e) => {
                    error!("Failed to bind HTTP address {}: {}", http_addr, e);
                    return;
                }
            };

            info!("HTTP server listening on {}", http_addr);

            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(listener, router).with_graceful_shutdown(graceful).await {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        });

        Ok(handle)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C).
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM signal");
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
