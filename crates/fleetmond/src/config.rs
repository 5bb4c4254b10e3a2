//! Daemon configuration.
//!
//! Every flag can also be supplied through the environment; a `.env` file
//! in the working directory is loaded before parsing.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;

use fleetmon_state::store::{MEMORY_URL, REDB_URL_PREFIX};

#[derive(Parser, Debug)]
#[command(name = "fleetmond", about = "fleetmon metrics aggregation sidecar", version)]
pub struct Cli {
    /// Address the read API listens on.
    #[arg(long, env = "FLEETMON_LISTEN", default_value = "0.0.0.0:9000")]
    pub listen: SocketAddr,

    /// Base URL of the node manager serving `/node/list`.
    #[arg(long, env = "NODE_MANAGER_URL", default_value = "http://localhost:7000")]
    pub node_manager_url: String,

    /// Shared store: `memory://` or `redb:///path/to/file.redb`.
    #[arg(
        long,
        env = "STORE_URL",
        default_value = "redb:///var/lib/fleetmon/fleetmon.redb"
    )]
    pub store_url: String,

    /// Seconds between collector ticks.
    #[arg(long, env = "METRICS_POLL_INTERVAL", default_value = "1")]
    pub poll_interval: u64,

    /// Seconds between purges of expired records.
    #[arg(long, env = "FLEETMON_PURGE_INTERVAL", default_value = "15")]
    pub purge_interval: u64,
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub node_manager_url: String,
    pub store_url: String,
    pub poll_interval: Duration,
    pub purge_interval: Duration,
}

impl Config {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        if cli.poll_interval == 0 {
            bail!("poll interval must be at least 1 second");
        }
        if cli.purge_interval == 0 {
            bail!("purge interval must be at least 1 second");
        }
        if cli.store_url != MEMORY_URL && !cli.store_url.starts_with(REDB_URL_PREFIX) {
            bail!(
                "unsupported store url {:?} (expected {MEMORY_URL} or {REDB_URL_PREFIX}<path>)",
                cli.store_url
            );
        }
        Ok(Self {
            listen: cli.listen,
            node_manager_url: cli.node_manager_url,
            store_url: cli.store_url,
            poll_interval: Duration::from_secs(cli.poll_interval),
            purge_interval: Duration::from_secs(cli.purge_interval),
        })
    }

    /// On-disk location of the store, if it has one.
    pub fn store_path(&self) -> Option<PathBuf> {
        self.store_url
            .strip_prefix(REDB_URL_PREFIX)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }

    /// Create the parent directory of an on-disk store.
    pub fn prepare_store_dir(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.store_path().as_deref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create store directory {}", parent.display()))?;
            }
        }
        Ok(())
    }
}
