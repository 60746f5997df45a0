//! Internal server tests (/health, /metrics, /config)

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::*;

/// /health reports the active algorithm
#[tokio::test]
async fn test_health_endpoint() {
    let server = TestServer::start().await;

    let resp = server.internal_get("/health").await;
    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "application/json");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["algorithm"], "fixed");
    assert_eq!(body["simulatorRunning"], false);
    assert!(body["uptimeSecs"].is_u64());
}

/// /health follows algorithm switches
#[tokio::test]
async fn test_health_after_switch() {
    let server = TestServer::start().await;
    server
        .post_json("/api/algorithm", &json!({ "algorithm": "token" }))
        .await;

    let body: Value = server.internal_get("/health").await.json().await.unwrap();
    assert_eq!(body["algorithm"], "token");
}

/// /metrics returns Prometheus text with admission counters
#[tokio::test]
async fn test_metrics_endpoint() {
    let server = TestServer::start().await;
    server.hit(6).await;
    server
        .post_json("/api/algorithm", &json!({ "algorithm": "leaky" }))
        .await;

    let resp = server.internal_get("/metrics").await;
    assert_status(&resp, StatusCode::OK);
    assert_header_starts_with(&resp, "content-type", "text/plain");

    let body = resp.text().await.unwrap();
    assert!(body.contains("ratevis_admissions_total{algorithm=\"fixed\",decision=\"allow\"} 5"));
    assert!(body.contains("ratevis_admissions_total{algorithm=\"fixed\",decision=\"deny\"} 1"));
    assert!(body.contains("ratevis_algorithm_switches_total{algorithm=\"leaky\"} 1"));
    assert!(body.contains("ratevis_http_requests_total"));
    assert!(body.contains("ratevis_process_uptime_seconds"));
}

/// /config shows the effective configuration with bound addresses
#[tokio::test]
async fn test_config_endpoint() {
    let server = TestServer::start().await;

    let resp = server.internal_get("/config").await;
    assert_status(&resp, StatusCode::OK);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["algorithm"], "fixed");
    assert_eq!(body["limit"], 5);
    assert_eq!(body["partitionBy"], "global");
    assert_eq!(
        body["listenAddr"].as_str().unwrap(),
        server.base_url.trim_start_matches("http://")
    );
    assert_eq!(
        body["simulatorTarget"].as_str().unwrap(),
        server.url("/simulated")
    );
}

/// Unknown internal paths are 404
#[tokio::test]
async fn test_internal_not_found() {
    let server = TestServer::start().await;

    let resp = server.internal_get("/nope").await;
    assert_status(&resp, StatusCode::NOT_FOUND);
}

/// Internal endpoints do not consume admission capacity
#[tokio::test]
async fn test_internal_not_limited() {
    let server = TestServer::start().await;
    for _ in 0..10 {
        assert_status(&server.internal_get("/health").await, StatusCode::OK);
    }
    assert_eq!(server.get_json("/api/stats").await["allowed"], 0);
}
