//! Inventory client — pulls the current node list from the node manager.
//!
//! One bounded request per tick against `GET {base_url}/node/list`. Any
//! failure (connect error, timeout, non-200, malformed body) is logged and
//! turned into an empty inventory; the caller never sees an error.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use http::{header, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use fleetmon_state::{NodeRecord, TenantId};

use crate::constants::{FETCH_TIMEOUT, TRANSPORT_TIMEOUT};

/// Current fleet as reported upstream, keyed by tenant ID.
pub type Inventory = BTreeMap<TenantId, NodeRecord>;

const USER_AGENT: &str = "fleetmon-collector/0.1";

/// Anything that can produce the fleet inventory for a tick.
///
/// Implementations absorb their own failures and return an empty
/// inventory instead.
pub trait InventorySource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Inventory> + Send;
}

/// Why an inventory fetch produced nothing.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid inventory url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("unexpected status {0}")]
    Status(StatusCode),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("malformed body: {0}")]
    Decode(String),
}

/// HTTP client for the node manager's inventory endpoint.
#[derive(Clone)]
pub struct InventoryClient {
    client: Client<HttpConnector, Empty<Bytes>>,
    list_uri: Uri,
    /// Bound on the whole fetch.
    fetch_timeout: Duration,
    /// Bound on each transport phase: connect, response head, body.
    transport_timeout: Duration,
}

impl InventoryClient {
    /// Create a client for the node manager at `base_url` (plain `http://`).
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let list_url = format!("{}/node/list", base_url.trim_end_matches('/'));
        let list_uri: Uri = list_url
            .parse()
            .map_err(|e| FetchError::InvalidUrl(format!("{list_url}: {e}")))?;
        if list_uri.scheme_str() != Some("http") || list_uri.authority().is_none() {
            return Err(FetchError::InvalidUrl(list_url));
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(TRANSPORT_TIMEOUT));
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(30))
            .build(connector);

        Ok(Self {
            client,
            list_uri,
            fetch_timeout: FETCH_TIMEOUT,
            transport_timeout: TRANSPORT_TIMEOUT,
        })
    }

    /// Override the fetch and per-phase transport timeouts.
    pub fn with_timeouts(mut self, fetch: Duration, transport: Duration) -> Self {
        self.fetch_timeout = fetch;
        self.transport_timeout = transport;
        self
    }

    /// The fully resolved `/node/list` URI.
    pub fn list_uri(&self) -> &Uri {
        &self.list_uri
    }

    /// Fetch the inventory, surfacing the failure reason.
    pub async fn try_fetch(&self) -> Result<Inventory, FetchError> {
        let limit = self.fetch_timeout;
        tokio::time::timeout(limit, self.fetch_once())
            .await
            .map_err(|_| FetchError::Timeout(limit))?
    }

    async fn fetch_once(&self) -> Result<Inventory, FetchError> {
        let req = Request::get(self.list_uri.clone())
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let phase = self.transport_timeout;
        let resp = tokio::time::timeout(phase, self.client.request(req))
            .await
            .map_err(|_| FetchError::Timeout(phase))?
            .map_err(|e| FetchError::Request(e.to_string()))?;

        if resp.status() != StatusCode::OK {
            return Err(FetchError::Status(resp.status()));
        }

        let body = tokio::time::timeout(phase, resp.into_body().collect())
            .await
            .map_err(|_| FetchError::Timeout(phase))?
            .map_err(|e| FetchError::Body(e.to_string()))?
            .to_bytes();

        parse_inventory(&body)
    }
}

impl InventorySource for InventoryClient {
    async fn fetch(&self) -> Inventory {
        match self.try_fetch().await {
            Ok(inventory) => inventory,
            Err(e) => {
                warn!(url = %self.list_uri, error = %e, "inventory fetch failed");
                Inventory::new()
            }
        }
    }
}

/// Parse a `/node/list` body: a JSON array of node objects.
///
/// Entries that are not objects or lack a usable `tenant_id` are skipped.
/// When a tenant appears twice the later entry wins.
pub fn parse_inventory(body: &[u8]) -> Result<Inventory, FetchError> {
    let entries: Vec<Value> =
        serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))?;
    let total = entries.len();

    let inventory: Inventory = entries
        .into_iter()
        .filter_map(NodeRecord::from_value)
        .map(|record| (record.tenant_id.clone(), record))
        .collect();

    if inventory.len() < total {
        debug!(
            total,
            kept = inventory.len(),
            "dropped malformed or duplicate inventory entries"
        );
    }
    Ok(inventory)
}
