//! Collector loop — the scheduling driver.
//!
//! ```text
//! Idle (warm-up) ──▶ Polling ⇄ Sleeping
//!        │                         │
//!        └────────▶ Stopped ◀──────┘
//! ```
//!
//! Shutdown is only observed while idling or sleeping. A tick that has
//! started runs to completion; once shutdown is seen no further store
//! writes happen.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info};

use fleetmon_state::StoreResult;

use crate::constants::{DEFAULT_POLL_INTERVAL, WARMUP_DELAY};
use crate::inventory::InventorySource;
use crate::publisher::Publisher;
use crate::transform::transform;

/// Where the collector loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorState {
    /// Waiting out the warm-up delay.
    Idle,
    /// Running a tick.
    Polling,
    /// Waiting for the next tick.
    Sleeping,
    /// Terminated by shutdown.
    Stopped,
}

impl CollectorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorState::Idle => "idle",
            CollectorState::Polling => "polling",
            CollectorState::Sleeping => "sleeping",
            CollectorState::Stopped => "stopped",
        }
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Nodes reported by the inventory source.
    pub fetched: usize,
    /// Nodes written to the store.
    pub published: usize,
    /// `last_updated` stamped on every record in this tick.
    pub now: u64,
}

/// Periodically pulls the inventory and publishes derived metrics.
pub struct Collector<S> {
    source: S,
    publisher: Publisher,
    warmup: Duration,
    interval: Duration,
    state: watch::Sender<CollectorState>,
}

impl<S: InventorySource> Collector<S> {
    /// Create a collector with the standard warm-up and a 1s poll interval.
    pub fn new(source: S, publisher: Publisher) -> Self {
        let (state, _) = watch::channel(CollectorState::Idle);
        Self {
            source,
            publisher,
            warmup: WARMUP_DELAY,
            interval: DEFAULT_POLL_INTERVAL,
            state,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<CollectorState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CollectorState {
        *self.state.borrow()
    }

    /// Run one fetch → transform → publish cycle.
    ///
    /// A store failure aborts the remainder of the tick and is returned.
    pub async fn tick(&self) -> StoreResult<TickReport> {
        let inventory = self.source.fetch().await;
        let now = self.publisher.store().clock().now_secs();

        let mut report = TickReport {
            fetched: inventory.len(),
            published: 0,
            now,
        };
        for record in inventory.values() {
            let metric = transform(record, now);
            self.publisher.publish(&metric)?;
            report.published += 1;
        }
        Ok(report)
    }

    /// Run the collector loop until shutdown signal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            warmup_ms = self.warmup.as_millis() as u64,
            interval_secs = self.interval.as_secs(),
            "collector started"
        );

        self.state.send_replace(CollectorState::Idle);
        tokio::select! {
            _ = tokio::time::sleep(self.warmup) => {}
            _ = shutdown.changed() => {
                self.stop();
                return;
            }
        }

        loop {
            self.state.send_replace(CollectorState::Polling);
            match self.tick().await {
                Ok(report) => debug!(
                    fetched = report.fetched,
                    published = report.published,
                    "collector tick"
                ),
                Err(e) => error!(error = %e, "collector tick aborted by store failure"),
            }

            self.state.send_replace(CollectorState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        self.stop();
    }

    fn stop(&self) {
        self.state.send_replace(CollectorState::Stopped);
        info!("collector stopped");
    }
}
