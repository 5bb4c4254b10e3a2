//! MetricsStore — redb-backed TTL store for per-node metrics.
//!
//! Each public operation is its own redb transaction, so single-key
//! operations are atomic but sequences of them are not. Expired records
//! are invisible to reads immediately and are removed physically by
//! `purge_expired()`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use redb::backends::InMemoryBackend;
use redb::{Database, ReadableDatabase, ReadableTable, StorageBackend};
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{StoreError, StoreResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// URL scheme selecting the in-memory backend.
pub const MEMORY_URL: &str = "memory://";

/// URL scheme prefix selecting an on-disk redb file.
pub const REDB_URL_PREFIX: &str = "redb://";

/// Thread-safe metrics store backed by redb.
#[derive(Clone)]
pub struct MetricsStore {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl MetricsStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self::from_database(db);
        store.ensure_tables()?;
        debug!(?path, "metrics store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        let store = Self::open_with_backend(InMemoryBackend::new())?;
        debug!("in-memory metrics store opened");
        Ok(store)
    }

    /// Create a store on top of an arbitrary redb storage backend.
    pub fn open_with_backend(backend: impl StorageBackend) -> StoreResult<Self> {
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self::from_database(db);
        store.ensure_tables()?;
        Ok(store)
    }

    /// Open a store from a connection URL: `memory://` or `redb:///path/to/file.redb`.
    pub fn open_url(url: &str) -> StoreResult<Self> {
        if url == MEMORY_URL {
            return Self::open_in_memory();
        }
        match url.strip_prefix(REDB_URL_PREFIX) {
            Some(path) if !path.is_empty() => Self::open(Path::new(path)),
            _ => Err(StoreError::InvalidUrl(url.to_string())),
        }
    }

    fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(db),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source used for TTL bookkeeping.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The time source this store measures expiry against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Backend name reported to health checks.
    pub fn kind(&self) -> &'static str {
        "redb"
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(METRICS).map_err(map_err!(Table))?;
        txn.open_table(EXPIRIES).map_err(map_err!(Table))?;
        txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Per-node records ───────────────────────────────────────────

    /// Overwrite a node's record with every field of `metric`.
    ///
    /// An existing, unexpired TTL is left untouched. Writing over a record
    /// whose TTL has already elapsed recreates it without a TTL.
    pub fn put_metric(&self, metric: &StoredMetric) -> StoreResult<()> {
        let key = metric.tenant_id.as_str();
        let value = serde_json::to_vec(metric).map_err(map_err!(Serialize))?;
        let now = self.clock.now_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut metrics = txn.open_table(METRICS).map_err(map_err!(Table))?;
            let mut expiries = txn.open_table(EXPIRIES).map_err(map_err!(Table))?;
            let stale = expiries
                .get(key)
                .map_err(map_err!(Read))?
                .is_some_and(|guard| guard.value() <= now);
            if stale {
                expiries.remove(key).map_err(map_err!(Write))?;
            }
            metrics
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(tenant_id = %key, "node metric stored");
        Ok(())
    }

    /// Set or refresh a node record's TTL to `now + ttl`.
    ///
    /// Returns `false` (and writes nothing) when there is no live record.
    pub fn expire(&self, tenant_id: &str, ttl: Duration) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let live;
        {
            let metrics = txn.open_table(METRICS).map_err(map_err!(Table))?;
            let mut expiries = txn.open_table(EXPIRIES).map_err(map_err!(Table))?;
            let exists = metrics.get(tenant_id).map_err(map_err!(Read))?.is_some();
            let expired = expiries
                .get(tenant_id)
                .map_err(map_err!(Read))?
                .is_some_and(|guard| guard.value() <= now);
            live = exists && !expired;
            if live {
                expiries
                    .insert(tenant_id, now + ttl.as_secs())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(live)
    }

    /// Get a node's record, or `None` if it was never written or has expired.
    pub fn get_metric(&self, tenant_id: &str) -> StoreResult<Option<StoredMetric>> {
        let now = self.clock.now_secs();
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let expiries = txn.open_table(EXPIRIES).map_err(map_err!(Table))?;
        let expired = expiries
            .get(tenant_id)
            .map_err(map_err!(Read))?
            .is_some_and(|guard| guard.value() <= now);
        if expired {
            return Ok(None);
        }

        let metrics = txn.open_table(METRICS).map_err(map_err!(Table))?;
        match metrics.get(tenant_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let metric: StoredMetric =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(metric))
            }
            None => Ok(None),
        }
    }

    /// Remaining lifetime of a node's record.
    ///
    /// `None` when the record is absent, expired, or has no TTL.
    pub fn ttl(&self, tenant_id: &str) -> StoreResult<Option<Duration>> {
        let now = self.clock.now_secs();
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let metrics = txn.open_table(METRICS).map_err(map_err!(Table))?;
        if metrics.get(tenant_id).map_err(map_err!(Read))?.is_none() {
            return Ok(None);
        }
        let expiries = txn.open_table(EXPIRIES).map_err(map_err!(Table))?;
        let remaining = expiries
            .get(tenant_id)
            .map_err(map_err!(Read))?
            .map(|guard| guard.value())
            .filter(|&expires_at| expires_at > now)
            .map(|expires_at| Duration::from_secs(expires_at - now));
        Ok(remaining)
    }

    // ── Membership index ───────────────────────────────────────────

    /// Add a tenant to the membership index. Returns `true` if it was new.
    pub fn add_member(&self, tenant_id: &str) -> StoreResult<bool> {
        let now = self.clock.now_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let added;
        {
            let mut members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
            added = members.get(tenant_id).map_err(map_err!(Read))?.is_none();
            if added {
                members.insert(tenant_id, now).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if added {
            debug!(%tenant_id, "tenant added to membership index");
        }
        Ok(added)
    }

    /// Every tenant ID in the membership index, in key order.
    ///
    /// Entries outlive their records; callers must treat a member without
    /// a live record as absent.
    pub fn members(&self) -> StoreResult<Vec<TenantId>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let members = txn.open_table(MEMBERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in members.iter().map_err(map_err!(Read))? {
            let (key, _) = entry.map_err(map_err!(Read))?;
            results.push(key.value().to_string());
        }
        Ok(results)
    }

    // ── Housekeeping ───────────────────────────────────────────────

    /// Physically remove every expired record and its expiry entry.
    ///
    /// The membership index is never touched. Returns the number of
    /// records removed.
    pub fn purge_expired(&self) -> StoreResult<u32> {
        let now = self.clock.now_secs();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut purged = 0u32;
        {
            let mut metrics = txn.open_table(METRICS).map_err(map_err!(Table))?;
            let mut expiries = txn.open_table(EXPIRIES).map_err(map_err!(Table))?;

            // Collect keys first; the iterator borrows the table.
            let mut expired = Vec::new();
            for entry in expiries.iter().map_err(map_err!(Read))? {
                let (key, expires_at) = entry.map_err(map_err!(Read))?;
                if expires_at.value() <= now {
                    expired.push(key.value().to_string());
                }
            }

            for key in &expired {
                expiries.remove(key.as_str()).map_err(map_err!(Write))?;
                if metrics.remove(key.as_str()).map_err(map_err!(Write))?.is_some() {
                    purged += 1;
                }
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        if purged > 0 {
            debug!(purged, "expired node metrics purged");
        }
        Ok(purged)
    }
}
