//! Reader — rebuilds the fleet view from the shared store.
//!
//! Human-friendly fields are derived here at read time and never stored,
//! so formatting cannot drift from the stored byte counts.

use serde::Serialize;
use tracing::{trace, warn};

use fleetmon_collector::constants::{BYTES_PER_MB, MEMORY_LIMIT_BYTES};
use fleetmon_state::{MetricsStore, StoreResult, StoredMetric};

/// One entry of the fleet listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeSummary {
    #[serde(flatten)]
    pub metric: StoredMetric,
    pub memory_used_mb: f64,
    pub memory_limit_mb: u64,
    pub memory_used_human: String,
}

impl From<StoredMetric> for NodeSummary {
    fn from(metric: StoredMetric) -> Self {
        let memory_used_mb = bytes_to_mb(metric.memory_bytes);
        Self {
            memory_used_mb,
            memory_limit_mb: MEMORY_LIMIT_BYTES / BYTES_PER_MB,
            memory_used_human: human_memory(metric.memory_bytes),
            metric,
        }
    }
}

/// Single-node view.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeDetail {
    #[serde(flatten)]
    pub metric: StoredMetric,
    pub connected: bool,
    pub used_memory_human: String,
}

impl From<StoredMetric> for NodeDetail {
    fn from(metric: StoredMetric) -> Self {
        Self {
            connected: metric.status.is_running(),
            used_memory_human: human_memory(metric.memory_bytes),
            metric,
        }
    }
}

/// Read-only access to the published fleet.
#[derive(Clone)]
pub struct Reader {
    store: MetricsStore,
}

impl Reader {
    pub fn new(store: MetricsStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    /// Every member of the index that still has a live record.
    ///
    /// Members whose record has expired or cannot be read are skipped, so
    /// one bad record shrinks the listing instead of failing it. Only a
    /// failure to read the index itself is returned.
    pub fn live_metrics(&self) -> StoreResult<Vec<StoredMetric>> {
        let members = self.store.members()?;
        let mut live = Vec::with_capacity(members.len());
        for tenant_id in &members {
            match self.store.get_metric(tenant_id) {
                Ok(Some(metric)) => live.push(metric),
                Ok(None) => trace!(%tenant_id, "indexed tenant has no live record"),
                Err(e) => warn!(%tenant_id, error = %e, "skipping unreadable node record"),
            }
        }
        Ok(live)
    }

    /// The whole live fleet with listing fields added.
    pub fn list_all(&self) -> StoreResult<Vec<NodeSummary>> {
        Ok(self
            .live_metrics()?
            .into_iter()
            .map(NodeSummary::from)
            .collect())
    }

    /// One node with detail fields added, or `None` when it is not live.
    pub fn get_one(&self, tenant_id: &str) -> StoreResult<Option<NodeDetail>> {
        Ok(self.store.get_metric(tenant_id)?.map(NodeDetail::from))
    }
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

/// `"{mb:.2} MB"`.
pub fn human_memory(bytes: u64) -> String {
    format!("{:.2} MB", bytes_to_mb(bytes))
}
