//! fleetmon-api — read side of fleetmon.
//!
//! Reconstructs the current fleet from the membership index and per-node
//! records, and serves it over a small read-only JSON API. Reads never
//! coordinate with the collector; they only touch the shared store.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/monitoring/nodes` | All live nodes, enriched |
//! | GET | `/monitoring/{tenant_id}` | One node, or `{"error": "Tenant not found"}` |
//! | GET | `/monitoring/redis/{tenant_id}` | Alias of the above for gateway clients |
//! | GET | `/health` | Liveness, store backend and collector state |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;
pub mod reader;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use fleetmon_collector::CollectorState;
use fleetmon_state::MetricsStore;
use tokio::sync::watch;

pub use reader::{NodeDetail, NodeSummary, Reader};

/// Bound on a single store read issued by a request handler.
pub const STORE_READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub reader: Reader,
    pub read_timeout: Duration,
    /// Collector loop state reported by `/health`, when one runs in-process.
    pub collector: Option<watch::Receiver<CollectorState>>,
}

impl ApiState {
    pub fn new(store: MetricsStore) -> Self {
        Self {
            reader: Reader::new(store),
            read_timeout: STORE_READ_TIMEOUT,
            collector: None,
        }
    }

    pub fn with_collector_state(mut self, collector: watch::Receiver<CollectorState>) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Build the complete read API router.
pub fn build_router(store: MetricsStore) -> Router {
    router(ApiState::new(store))
}

/// Build the router around an already configured state.
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/monitoring/nodes", get(handlers::list_nodes))
        .route("/monitoring/{tenant_id}", get(handlers::get_node))
        .route("/monitoring/redis/{tenant_id}", get(handlers::get_node))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::prometheus_metrics))
        .with_state(state)
}
