//! HTTP handlers for the read API.
//!
//! Store reads are blocking redb transactions, so each one runs on the
//! blocking pool under `ApiState::read_timeout`.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use fleetmon_state::{StoreError, StoreResult};

use crate::reader::Reader;
use crate::ApiState;

/// Payload returned with status 200 for an unknown tenant. Gateway
/// clients match on it byte for byte.
pub const TENANT_NOT_FOUND: &str = "Tenant not found";

/// Why a store read issued by a handler failed.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("store read timed out after {0:?}")]
    Timeout(Duration),

    #[error("store read task failed: {0}")]
    Join(String),
}

impl ReadError {
    fn status(&self) -> StatusCode {
        match self {
            ReadError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            ReadError::Store(_) | ReadError::Join(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ReadError {
    fn into_response(self) -> axum::response::Response {
        warn!(error = %self, "store read failed");
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Run a blocking store read under the configured timeout.
async fn read_store<T, F>(state: &ApiState, op: F) -> Result<T, ReadError>
where
    F: FnOnce(Reader) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let reader = state.reader.clone();
    let task = tokio::task::spawn_blocking(move || op(reader));
    match tokio::time::timeout(state.read_timeout, task).await {
        Err(_) => Err(ReadError::Timeout(state.read_timeout)),
        Ok(Err(e)) => Err(ReadError::Join(e.to_string())),
        Ok(Ok(result)) => Ok(result?),
    }
}

// ── Fleet ──────────────────────────────────────────────────────

/// GET /monitoring/nodes
pub async fn list_nodes(State(state): State<ApiState>) -> impl IntoResponse {
    match read_store(&state, |reader| reader.list_all()).await {
        Ok(nodes) => Json(nodes).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /monitoring/{tenant_id}
pub async fn get_node(
    State(state): State<ApiState>,
    Path(tenant_id): Path<String>,
) -> impl IntoResponse {
    match read_store(&state, move |reader| reader.get_one(&tenant_id)).await {
        Ok(Some(node)) => Json(node).into_response(),
        Ok(None) => Json(json!({ "error": TENANT_NOT_FOUND })).into_response(),
        Err(e) => e.into_response(),
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /health
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let mut body = json!({
        "status": "ok",
        "backend": state.reader.store().kind(),
    });
    if let Some(collector) = &state.collector {
        body["collector"] = json!(collector.borrow().as_str());
    }
    Json(body)
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match read_store(&state, |reader| reader.live_metrics()).await {
        Ok(metrics) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            fleetmon_collector::render_prometheus(&metrics),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}
