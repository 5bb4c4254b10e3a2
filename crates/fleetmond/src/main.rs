//! fleetmond — the fleetmon daemon.
//!
//! Single binary that assembles the sidecar:
//! - Shared metrics store (redb)
//! - Inventory client for the node manager
//! - Collector loop
//! - Expired-record purge task
//! - Read API
//!
//! # Usage
//!
//! ```text
//! NODE_MANAGER_URL=http://localhost:7000 fleetmond --store-url memory://
//! ```

mod config;

use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use fleetmon_api::ApiState;
use fleetmon_collector::{Collector, InventoryClient, Publisher};
use fleetmon_state::MetricsStore;

use crate::config::{Cli, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is the normal case.
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fleetmond=debug,fleetmon=debug".into()),
        )
        .init();

    if let Ok(path) = dotenv {
        info!(path = %path.display(), "loaded environment file");
    }

    let config = Config::from_cli(Cli::parse())?;
    run(config).await
}

async fn run(config: Config) -> anyhow::Result<()> {
    info!(listen = %config.listen, "fleetmon daemon starting");

    // ── Initialize resources ───────────────────────────────────

    config.prepare_store_dir()?;
    let store = MetricsStore::open_url(&config.store_url)?;
    info!(url = %config.store_url, backend = store.kind(), "metrics store opened");

    let inventory = InventoryClient::new(&config.node_manager_url)?;
    info!(url = %inventory.list_uri(), "inventory client initialized");

    let collector = Arc::new(
        Collector::new(inventory, Publisher::new(store.clone()))
            .with_interval(config.poll_interval),
    );
    info!(interval = config.poll_interval.as_secs(), "collector initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collector_shutdown = shutdown_rx.clone();
    let purge_shutdown = shutdown_rx;

    // ── Start background tasks ─────────────────────────────────

    let collector_handle = {
        let collector = Arc::clone(&collector);
        tokio::spawn(async move {
            collector.run(collector_shutdown).await;
        })
    };

    // Expired-record purge.
    let purge_store = store.clone();
    let purge_interval = config.purge_interval;
    let purge_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(purge_interval);
        let mut shutdown = purge_shutdown;
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match purge_store.purge_expired() {
                        Ok(purged) if purged > 0 => {
                            info!(purged, "purged expired node metrics");
                        }
                        Err(e) => {
                            warn!(error = %e, "expired metric purge failed");
                        }
                        _ => {}
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    });

    // ── Start API server ───────────────────────────────────────

    let api_state = ApiState::new(store.clone()).with_collector_state(collector.subscribe());
    let router = fleetmon_api::router(api_state);
    let listener = tokio::net::TcpListener::bind(config.listen).await?;
    info!(addr = %config.listen, "API server starting");

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    let served = server.await;

    // Wait for background tasks before releasing the store.
    let _ = collector_handle.await;
    let _ = purge_handle.await;
    drop(collector);
    drop(store);

    served?;
    info!("fleetmon daemon stopped");
    Ok(())
}

/// Resolve on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
