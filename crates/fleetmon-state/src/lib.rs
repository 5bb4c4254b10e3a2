//! fleetmon-state — the shared metrics store for fleetmon.
//!
//! Backed by [redb](https://docs.rs/redb), provides a small Redis-like
//! surface: per-node metric records that expire after a TTL, and a
//! membership index of every tenant ID seen so far.
//!
//! # Architecture
//!
//! ```text
//! MetricsStore
//!   ├── node_metrics   tenant_id → StoredMetric (JSON)
//!   ├── node_expiries  tenant_id → expires_at (unix seconds)
//!   └── node_members   tenant_id → first_seen (unix seconds)
//! ```
//!
//! Expiry is lazy: a record whose expiry has passed is reported as absent
//! by every read, and is physically removed by `purge_expired()`.
//!
//! The `MetricsStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared between the collector and any number of readers.

pub mod clock;
pub mod error;
pub mod store;
pub mod tables;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{StoreError, StoreResult};
pub use store::MetricsStore;
pub use types::*;
