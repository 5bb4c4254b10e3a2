//! Fixed process-wide constants.

use std::time::Duration;

/// Memory limit each node is measured against (40 MiB).
pub const MEMORY_LIMIT_BYTES: u64 = 40 * 1024 * 1024;

/// Bytes per mebibyte, for read-side formatting.
pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// TTL applied to every per-node record on publish.
pub const METRIC_TTL: Duration = Duration::from_secs(60);

/// Delay before the first poll so dependent services can come up.
pub const WARMUP_DELAY: Duration = Duration::from_secs(2);

/// Upper bound on one whole inventory fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(3);

/// Per-phase bound on the upstream transport (connect, headers, body).
pub const TRANSPORT_TIMEOUT: Duration = Duration::from_secs(2);

/// Default interval between ticks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Value published for `connected_clients` until real accounting exists.
pub const CONNECTED_CLIENTS_PLACEHOLDER: u32 = 1;
