//! Traffic simulator tests

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::*;

async fn total(server: &TestServer) -> u64 {
    let stats = server.get_json("/api/stats").await;
    stats["allowed"].as_u64().unwrap() + stats["denied"].as_u64().unwrap()
}

/// Started traffic reaches the admission path, and stops on request
#[tokio::test]
async fn test_start_and_stop() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/simulator", &json!({ "action": "start", "rps": 20 }))
        .await;
    assert_status(&resp, StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["started"], true);
    assert_eq!(body["rps"], 20.0);

    let health: Value = server.internal_get("/health").await.json().await.unwrap();
    assert_eq!(health["simulatorRunning"], true);

    let mut seen = 0;
    for _ in 0..50 {
        seen = total(&server).await;
        if seen >= 6 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(seen >= 6, "simulator produced only {} requests", seen);

    // past the limit of 5, some of them were denied
    let stats = server.get_json("/api/stats").await;
    assert_eq!(stats["allowed"], 5);
    assert!(stats["denied"].as_u64().unwrap() >= 1);

    let resp = server
        .post_json("/api/simulator", &json!({ "action": "stop" }))
        .await;
    assert_status(&resp, StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["stopped"], true);

    // let requests already in flight land
    tokio::time::sleep(Duration::from_millis(200)).await;
    let after_stop = total(&server).await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(total(&server).await, after_stop);

    let health: Value = server.internal_get("/health").await.json().await.unwrap();
    assert_eq!(health["simulatorRunning"], false);
}

/// Stopping an idle simulator is fine
#[tokio::test]
async fn test_stop_when_idle() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/simulator", &json!({ "action": "stop" }))
        .await;
    assert_status(&resp, StatusCode::OK);
}

/// Unknown actions are rejected
#[tokio::test]
async fn test_unknown_action() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/simulator", &json!({ "action": "pause" }))
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unknown action");
}

/// Non-positive rates are rejected and nothing starts
#[tokio::test]
async fn test_invalid_rps() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/simulator", &json!({ "action": "start", "rps": 0 }))
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid rps");

    assert!(!server.state.simulator.is_running());
}

/// Rates whose tick period is zero or overflows are rejected up front
#[tokio::test]
async fn test_extreme_rps() {
    let server = TestServer::start().await;

    for rps in [1e12, 1e-300] {
        let resp = server
            .post_json("/api/simulator", &json!({ "action": "start", "rps": rps }))
            .await;
        assert_status(&resp, StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid rps");
    }

    assert!(!server.state.simulator.is_running());
}
