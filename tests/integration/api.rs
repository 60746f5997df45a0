//! Control API tests: state, stats, algorithm switching and error bodies

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::*;

/// `/api/state` describes the active algorithm, its config and state
#[tokio::test]
async fn test_state_shape() {
    let server = TestServer::start().await;

    let state = server.get_json("/api/state").await;
    assert_eq!(state["algorithm"], "fixed");
    assert_eq!(state["config"]["limit"], 5);
    assert_eq!(state["config"]["windowSizeMs"], 10_000);
    assert_eq!(state["partition"], "global");
    assert_eq!(state["state"]["kind"], "fixedWindow");
    assert_eq!(state["state"]["count"], 0);
    assert!(state["takenAtMs"].as_u64().unwrap() > 0);
}

/// `/api/stats` starts empty
#[tokio::test]
async fn test_stats_shape() {
    let server = TestServer::start().await;

    let stats = server.get_json("/api/stats").await;
    assert_eq!(stats["allowed"], 0);
    assert_eq!(stats["denied"], 0);
    assert!(stats["history"].as_array().unwrap().is_empty());
}

/// A switch installs the new algorithm and clears the counters
#[tokio::test]
async fn test_switch_algorithm() {
    let server = TestServer::start().await;
    server.hit(3).await;
    assert_eq!(server.get_json("/api/stats").await["allowed"], 3);

    let resp = server
        .post_json("/api/algorithm", &json!({ "algorithm": "token", "rpsLimit": 8 }))
        .await;
    assert_status(&resp, StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["algorithm"], "token");
    assert_eq!(body["config"]["limit"], 8);
    assert_eq!(body["config"]["maxTokens"], 8);

    let state = server.get_json("/api/state").await;
    assert_eq!(state["algorithm"], "token");
    assert_eq!(state["state"]["kind"], "tokenBucket");
    assert_eq!(state["state"]["tokens"], 8.0);

    let stats = server.get_json("/api/stats").await;
    assert_eq!(stats["allowed"], 0);
    assert_eq!(stats["denied"], 0);
}

/// Without `rpsLimit` the current limit is kept
#[tokio::test]
async fn test_switch_keeps_limit() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/algorithm", &json!({ "algorithm": "sliding-counter" }))
        .await;
    assert_status(&resp, StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["config"]["limit"], 5);
    assert_eq!(body["config"]["bucketSizeMs"], 100);
}

/// camelCase algorithm names are accepted
#[tokio::test]
async fn test_switch_accepts_alias() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/algorithm", &json!({ "algorithm": "leakyBucket" }))
        .await;
    assert_status(&resp, StatusCode::OK);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["algorithm"], "leaky");
}

/// An unknown name is rejected and the previous limiter stays active
#[tokio::test]
async fn test_unknown_algorithm() {
    let server = TestServer::start().await;
    server.hit(2).await;

    let resp = server
        .post_json("/api/algorithm", &json!({ "algorithm": "gcra", "rpsLimit": 0 }))
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Unknown algorithm");

    let state = server.get_json("/api/state").await;
    assert_eq!(state["algorithm"], "fixed");
    assert_eq!(state["state"]["count"], 2);
    assert_eq!(server.get_json("/api/stats").await["allowed"], 2);
}

/// A limit below one is rejected
#[tokio::test]
async fn test_invalid_limit() {
    let server = TestServer::start().await;

    let resp = server
        .post_json("/api/algorithm", &json!({ "algorithm": "token", "rpsLimit": 0 }))
        .await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid config");
    assert!(body["detail"].as_str().unwrap().contains("rpsLimit"));

    assert_eq!(server.get_json("/api/state").await["algorithm"], "fixed");
}

/// Fractional and oversized limits are rejected rather than rounded
#[tokio::test]
async fn test_non_integral_limit() {
    let server = TestServer::start().await;

    for rps in [json!(2.9), json!(1e300)] {
        let resp = server
            .post_json("/api/algorithm", &json!({ "algorithm": "token", "rpsLimit": rps }))
            .await;
        assert_status(&resp, StatusCode::BAD_REQUEST);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "Invalid config");
    }

    let state = server.get_json("/api/state").await;
    assert_eq!(state["algorithm"], "fixed");
    assert_eq!(state["config"]["limit"], 5);
}

/// Malformed JSON gets a 400 with a reason
#[tokio::test]
async fn test_malformed_body() {
    let server = TestServer::start().await;

    let resp = server.post_raw("/api/algorithm", "{not json").await;
    assert_status(&resp, StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Invalid request body");
    assert!(body["detail"].is_string());
}

/// Unknown routes are 404
#[tokio::test]
async fn test_not_found() {
    let server = TestServer::start().await;

    let resp = server.get("/api/nope").await;
    assert_status(&resp, StatusCode::NOT_FOUND);

    // wrong method on a known path
    let resp = server.get("/api/algorithm").await;
    assert_status(&resp, StatusCode::NOT_FOUND);
}

/// Preflight requests are answered by the CORS layer
#[tokio::test]
async fn test_cors_preflight() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .request(reqwest::Method::OPTIONS, server.url("/api/algorithm"))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_header(&resp, "access-control-allow-origin", "*");
    assert_has_header(&resp, "access-control-allow-methods");
}

/// Regular responses carry CORS and request id headers
#[tokio::test]
async fn test_common_headers() {
    let server = TestServer::start().await;

    let resp = server.get("/api/state").await;
    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "access-control-allow-origin", "*");
    assert_header_starts_with(&resp, "content-type", "application/json");
    assert_has_header(&resp, "x-request-id");
}

/// A caller supplied request id is echoed back
#[tokio::test]
async fn test_request_id_propagated() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(server.url("/api/state"))
        .header("X-Request-ID", "abc-123")
        .send()
        .await
        .unwrap();
    assert_header(&resp, "x-request-id", "abc-123");
}
