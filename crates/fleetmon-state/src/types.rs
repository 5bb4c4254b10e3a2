//! Domain types for fleetmon.
//!
//! `NodeRecord` is what the inventory service reports for one node;
//! `StoredMetric` is what the collector derives from it and publishes.
//! Upstream records are loosely typed, so `NodeRecord` deserializes
//! leniently: numeric fields accept numbers, numeric strings, booleans and
//! nulls, and anything unusable collapses to `0`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Unique identifier for a node (tenant) in the fleet.
pub type TenantId = String;

// ── Status ────────────────────────────────────────────────────────

/// Lifecycle status reported by the inventory service.
///
/// Unknown values are preserved verbatim so readers see exactly what
/// upstream reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NodeStatus {
    Running,
    Stopped,
    Other(String),
}

impl NodeStatus {
    pub fn as_str(&self) -> &str {
        match self {
            NodeStatus::Running => "running",
            NodeStatus::Stopped => "stopped",
            NodeStatus::Other(s) => s,
        }
    }

    pub fn is_running(&self) -> bool {
        *self == NodeStatus::Running
    }
}

impl From<String> for NodeStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "running" => NodeStatus::Running,
            "stopped" => NodeStatus::Stopped,
            _ => NodeStatus::Other(s),
        }
    }
}

impl From<&str> for NodeStatus {
    fn from(s: &str) -> Self {
        NodeStatus::from(s.to_string())
    }
}

impl From<NodeStatus> for String {
    fn from(status: NodeStatus) -> Self {
        match status {
            NodeStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Inventory record ──────────────────────────────────────────────

/// One node as reported by the inventory service's `/node/list`.
///
/// Only `tenant_id` is required. Entries without it fail to deserialize
/// and are dropped by the inventory client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(deserialize_with = "lenient_tenant_id")]
    pub tenant_id: TenantId,
    /// `None` when upstream omitted the field or sent something unusable.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<NodeStatus>,
    /// Bytes of memory in use.
    #[serde(default, deserialize_with = "lenient_count")]
    pub memory_used: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub key_count: u64,
}

impl NodeRecord {
    /// Parse a single inventory entry. Returns `None` for anything that is
    /// not an object carrying a usable `tenant_id`.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

// ── Stored metric ─────────────────────────────────────────────────

/// Derived metrics for one node, overwritten wholesale every tick the node
/// is observed. Expiry is tracked by the store, not in this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMetric {
    pub tenant_id: TenantId,
    pub status: NodeStatus,
    pub memory_bytes: u64,
    /// Percentage of the per-node memory limit; exceeds 100 when over.
    pub memory_usage_percent: f64,
    pub key_count: u64,
    /// Always 1; real connection accounting is not wired up.
    pub connected_clients: u32,
    /// Unix timestamp (seconds) of the tick that produced this record.
    pub last_updated: u64,
}

// ── Lenient field decoding ────────────────────────────────────────

/// Coerce a loosely typed JSON value into a non-negative integer.
///
/// Floats truncate toward zero; negatives, NaN, objects and unparseable
/// strings become `0`.
pub fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u
            } else if n.is_i64() {
                0
            } else {
                n.as_f64().map(float_to_count).unwrap_or(0)
            }
        }
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(float_to_count))
                .unwrap_or(0)
        }
        Value::Bool(b) => u64::from(*b),
        _ => 0,
    }
}

fn float_to_count(f: f64) -> u64 {
    if f.is_finite() && f > 0.0 {
        f.trunc() as u64
    } else {
        0
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(coerce_count(&value))
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<NodeStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.is_empty() => Some(NodeStatus::from(s)),
        Value::Number(n) => Some(NodeStatus::from(n.to_string())),
        Value::Bool(b) => Some(NodeStatus::from(b.to_string())),
        _ => None,
    })
}

fn lenient_tenant_id<'de, D>(deserializer: D) -> Result<TenantId, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "unusable tenant_id: {other}"
        ))),
    }
}
