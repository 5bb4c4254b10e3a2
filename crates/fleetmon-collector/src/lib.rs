//! fleetmon-collector — the collector/publisher loop.
//!
//! Pulls the fleet inventory from the upstream node manager, derives a
//! handful of health/usage metrics per node, and publishes them into the
//! shared store with a TTL so stale nodes age out on their own.
//!
//! # Architecture
//!
//! ```text
//! Collector::run()               ← warm-up, then one tick per poll interval
//!   └── tick()
//!       ├── InventorySource::fetch()  → Inventory (empty on any failure)
//!       ├── transform()               → StoredMetric (pure)
//!       └── Publisher::publish()      → record, TTL, membership index
//!
//! Prometheus exposition
//!   └── render_prometheus() → text/plain for /metrics endpoint
//! ```

pub mod collector;
pub mod constants;
pub mod inventory;
pub mod prometheus;
pub mod publisher;
pub mod transform;

pub use collector::{Collector, CollectorState, TickReport};
pub use inventory::{FetchError, Inventory, InventoryClient, InventorySource};
pub use prometheus::render_prometheus;
pub use publisher::Publisher;
pub use transform::transform;
