//! redb table definitions for the metrics store.
//!
//! Every table is keyed by the bare `tenant_id`.

use redb::TableDefinition;

/// Latest derived metrics per node, JSON-serialized `StoredMetric`.
pub const METRICS: TableDefinition<&str, &[u8]> = TableDefinition::new("node_metrics");

/// Expiry deadline (unix seconds) per node record. A record without an
/// entry here never expires.
pub const EXPIRIES: TableDefinition<&str, u64> = TableDefinition::new("node_expiries");

/// Membership index: every tenant ID ever published, with the unix second
/// it was first seen.
pub const MEMBERS: TableDefinition<&str, u64> = TableDefinition::new("node_members");
