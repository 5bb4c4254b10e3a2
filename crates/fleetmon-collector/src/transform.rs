//! Metrics transformer — raw inventory record to stored metric.

use fleetmon_state::{NodeRecord, NodeStatus, StoredMetric};

use crate::constants::{CONNECTED_CLIENTS_PLACEHOLDER, MEMORY_LIMIT_BYTES};

/// Derive the stored metric for one node.
///
/// `now` is captured once per tick so every node in a batch carries the
/// same `last_updated`.
pub fn transform(record: &NodeRecord, now: u64) -> StoredMetric {
    StoredMetric {
        tenant_id: record.tenant_id.clone(),
        status: record.status.clone().unwrap_or(NodeStatus::Stopped),
        memory_bytes: record.memory_used,
        memory_usage_percent: memory_usage_percent(record.memory_used),
        key_count: record.key_count,
        connected_clients: CONNECTED_CLIENTS_PLACEHOLDER,
        last_updated: now,
    }
}

fn memory_usage_percent(memory_used: u64) -> f64 {
    if memory_used == 0 {
        return 0.0;
    }
    memory_used as f64 / MEMORY_LIMIT_BYTES as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tenant_id: &str, memory_used: u64) -> NodeRecord {
        NodeRecord {
            tenant_id: tenant_id.to_string(),
            status: Some(NodeStatus::Running),
            memory_used,
            key_count: 10,
        }
    }

    #[test]
    fn percent_is_fraction_of_limit() {
        let metric = transform(&record("t1", 4 * 1024 * 1024), 1000);
        assert!((metric.memory_usage_percent - 10.0).abs() < 1e-9);
        assert_eq!(metric.memory_bytes, 4_194_304);
        assert_eq!(metric.key_count, 10);
        assert_eq!(metric.status, NodeStatus::Running);
        assert_eq!(metric.last_updated, 1000);
    }

    #[test]
    fn percent_is_zero_without_memory() {
        let metric = transform(&record("t1", 0), 1000);
        assert_eq!(metric.memory_usage_percent, 0.0);
    }

    #[test]
    fn percent_exceeds_hundred_over_limit() {
        let metric = transform(&record("t1", MEMORY_LIMIT_BYTES * 3 / 2), 1000);
        assert!((metric.memory_usage_percent - 150.0).abs() < 1e-9);
    }

    #[test]
    fn percent_matches_formula_across_sizes() {
        for used in [1u64, 512, 1 << 20, 39 * 1024 * 1024, u32::MAX as u64] {
            let metric = transform(&record("t", used), 0);
            let expected = used as f64 / MEMORY_LIMIT_BYTES as f64 * 100.0;
            assert_eq!(metric.memory_usage_percent, expected, "used={used}");
        }
    }

    #[test]
    fn missing_status_defaults_to_stopped() {
        let mut rec = record("t1", 0);
        rec.status = None;
        assert_eq!(transform(&rec, 1000).status, NodeStatus::Stopped);
    }

    #[test]
    fn connected_clients_is_placeholder() {
        assert_eq!(transform(&record("t1", 1), 1000).connected_clients, 1);
    }
}
