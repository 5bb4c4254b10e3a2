//! Publisher — writes derived metrics into the shared store.

use tracing::trace;

use fleetmon_state::{MetricsStore, StoreResult, StoredMetric};

use crate::constants::METRIC_TTL;

/// Writes per-node records, refreshes their TTL, and maintains the
/// membership index.
///
/// Every record gets the fixed `METRIC_TTL`.
#[derive(Clone)]
pub struct Publisher {
    store: MetricsStore,
}

impl Publisher {
    pub fn new(store: MetricsStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &MetricsStore {
        &self.store
    }

    /// Publish one node's metric, keyed by `metric.tenant_id`.
    ///
    /// Three separate store operations, in order: overwrite the record,
    /// refresh its TTL, add the tenant to the membership index. They are
    /// not atomic as a group; the next tick repairs any gap left by a
    /// failure between them.
    pub fn publish(&self, metric: &StoredMetric) -> StoreResult<()> {
        let tenant_id = metric.tenant_id.as_str();
        self.store.put_metric(metric)?;
        self.store.expire(tenant_id, METRIC_TTL)?;
        self.store.add_member(tenant_id)?;
        trace!(%tenant_id, memory_bytes = metric.memory_bytes, "node metric published");
        Ok(())
    }
}
