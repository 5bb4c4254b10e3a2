//! HTTP surface tests.
//!
//! Drives the full router with `oneshot` against an in-memory store that
//! the collector side publishes into.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use fleetmon_api::build_router;
use fleetmon_collector::constants::METRIC_TTL;
use fleetmon_collector::inventory::parse_inventory;
use fleetmon_collector::{transform, Publisher};
use fleetmon_state::{tables, ManualClock, MetricsStore};

fn test_store() -> (MetricsStore, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let store = MetricsStore::open_in_memory()
        .unwrap()
        .with_clock(clock.clone());
    (store, clock)
}

/// Publish an upstream `/node/list` body the way one collector tick would.
fn publish_tick(store: &MetricsStore, body: &str) {
    let publisher = Publisher::new(store.clone());
    let now = store.clock().now_secs();
    for record in parse_inventory(body.as_bytes()).unwrap().values() {
        publisher.publish(&transform(record, now)).unwrap();
    }
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(router: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(router, uri).await;
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn health_reports_backend() {
    let (store, _) = test_store();
    let router = build_router(store);

    let (status, json) = get_json(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, serde_json::json!({"status": "ok", "backend": "redb"}));
}

#[tokio::test]
async fn unknown_tenant_is_200_error_payload() {
    let (store, _) = test_store();
    let router = build_router(store);

    let (status, body) = get(&router, "/monitoring/ghost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"error":"Tenant not found"}"#);

    let (status, body) = get(&router, "/monitoring/redis/ghost").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, br#"{"error":"Tenant not found"}"#);
}

#[tokio::test]
async fn nodes_listing_is_enriched() {
    let (store, _) = test_store();
    publish_tick(
        &store,
        r#"[{"tenant_id":"t1","status":"running","memory_used":4194304,"key_count":10}]"#,
    );
    let router = build_router(store);

    let (status, json) = get_json(&router, "/monitoring/nodes").await;
    assert_eq!(status, StatusCode::OK);
    let nodes = json.as_array().unwrap();
    assert_eq!(nodes.len(), 1);

    let node = &nodes[0];
    assert_eq!(node["tenant_id"], "t1");
    assert_eq!(node["status"], "running");
    assert_eq!(node["memory_bytes"], 4_194_304);
    assert!((node["memory_usage_percent"].as_f64().unwrap() - 10.0).abs() < 1e-9);
    assert!((node["memory_used_mb"].as_f64().unwrap() - 4.0).abs() < 1e-9);
    assert_eq!(node["memory_limit_mb"], 40);
    assert_eq!(node["memory_used_human"], "4.00 MB");
    assert_eq!(node["key_count"], 10);
    assert_eq!(node["connected_clients"], 1);
    assert_eq!(node["last_updated"], 1_700_000_000u64);
}

#[tokio::test]
async fn single_node_detail() {
    let (store, _) = test_store();
    publish_tick(
        &store,
        r#"[{"tenant_id":"t1","status":"running","memory_used":4194304,"key_count":10},
            {"tenant_id":"t2","memory_used":0}]"#,
    );
    let router = build_router(store);

    let (status, t1) = get_json(&router, "/monitoring/t1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t1["connected"], true);
    assert_eq!(t1["used_memory_human"], "4.00 MB");

    let (_, t2) = get_json(&router, "/monitoring/redis/t2").await;
    assert_eq!(t2["status"], "stopped");
    assert_eq!(t2["connected"], false);
    assert_eq!(t2["used_memory_human"], "0.00 MB");
}

#[tokio::test]
async fn nodes_route_wins_over_tenant_route() {
    let (store, _) = test_store();
    let router = build_router(store);

    let (status, json) = get_json(&router, "/monitoring/nodes").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stale_nodes_vanish_after_ttl() {
    let (store, clock) = test_store();
    publish_tick(&store, r#"[{"tenant_id":"a"},{"tenant_id":"b"}]"#);

    clock.advance(40);
    publish_tick(&store, r#"[{"tenant_id":"b"}]"#);

    clock.advance(METRIC_TTL.as_secs() - 30);
    let router = build_router(store);

    let (_, json) = get_json(&router, "/monitoring/nodes").await;
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["tenant_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["b"]);

    let (_, a) = get_json(&router, "/monitoring/a").await;
    assert_eq!(a["error"], "Tenant not found");
}

#[tokio::test]
async fn empty_tick_leaves_previous_records_readable() {
    let (store, clock) = test_store();
    publish_tick(&store, r#"[{"tenant_id":"t1","status":"running"}]"#);
    clock.advance(10);
    publish_tick(&store, "[]");
    let router = build_router(store);

    let (_, json) = get_json(&router, "/monitoring/nodes").await;
    assert_eq!(json.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn metrics_endpoint_exposes_fleet() {
    let (store, _) = test_store();
    publish_tick(
        &store,
        r#"[{"tenant_id":"t1","status":"running","memory_used":4194304,"key_count":10}]"#,
    );
    let router = build_router(store);

    let (status, body) = get(&router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    assert!(text.contains("fleetmon_nodes_total 1"));
    assert!(text.contains("fleetmon_node_memory_bytes{tenant=\"t1\"} 4194304"));
}

/// A persistent store holding one record in a format the current build
/// cannot decode, indexed like any other member.
fn store_with_legacy_record(dir: &tempfile::TempDir) -> MetricsStore {
    let path = dir.path().join("fleetmon.redb");
    {
        let db = redb::Database::create(&path).unwrap();
        let txn = db.begin_write().unwrap();
        {
            let mut metrics = txn.open_table(tables::METRICS).unwrap();
            metrics
                .insert("legacy", br#"{"tenant_id":"legacy","old_schema":true}"#.as_slice())
                .unwrap();
            let mut members = txn.open_table(tables::MEMBERS).unwrap();
            members.insert("legacy", 1_700_000_000u64).unwrap();
        }
        txn.commit().unwrap();
    }
    MetricsStore::open(&path).unwrap()
}

#[tokio::test]
async fn undecodable_record_only_hides_itself() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_with_legacy_record(&dir);
    publish_tick(&store, r#"[{"tenant_id":"good","status":"running"}]"#);
    let router = build_router(store);

    let (status, json) = get_json(&router, "/monitoring/nodes").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["tenant_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["good"]);

    let (status, body) = get(&router, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("fleetmon_nodes_total 1"));
}

#[tokio::test]
async fn store_read_error_is_500_json() {
    let dir = tempfile::tempdir().unwrap();
    let router = build_router(store_with_legacy_record(&dir));

    let (status, json) = get_json(&router, "/monitoring/legacy").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"]
        .as_str()
        .unwrap()
        .starts_with("deserialization error"));

    let (status, _) = get_json(&router, "/monitoring/redis/legacy").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}
