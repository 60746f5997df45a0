//! Admission tests
//!
//! The test server allows 5 requests per 10 second window on one global
//! partition, so a burst of 7 always yields 5 allowed and 2 denied.

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::helpers::*;

/// Requests beyond the limit get 429
#[tokio::test]
async fn test_fixed_window_denies_over_limit() {
    let server = TestServer::start().await;

    let statuses = server.hit(7).await;
    assert_eq!(&statuses[..5], &[StatusCode::OK; 5]);
    assert_eq!(&statuses[5..], &[StatusCode::TOO_MANY_REQUESTS; 2]);
}

/// A denial carries the window's Retry-After, the algorithm and rate limit headers
#[tokio::test]
async fn test_denied_response() {
    let server = TestServer::start().await;
    server.hit(5).await;

    let resp = server.get("/api/test").await;
    assert_status(&resp, StatusCode::TOO_MANY_REQUESTS);
    // the window opened with the first hit, so the wait is just under 10s
    let retry_after: u64 = resp
        .headers()
        .get("retry-after")
        .expect("retry-after")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((9..=10).contains(&retry_after), "retry-after {}", retry_after);
    assert_header(&resp, "x-ratelimit-algorithm", "fixed");
    assert_header(&resp, "x-ratelimit-limit", "5");
    assert_header(&resp, "access-control-allow-origin", "*");

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Too Many Requests");
    assert_eq!(body["algorithm"], "fixed");
}

/// Allowed responses also report the active algorithm
#[tokio::test]
async fn test_allowed_response_headers() {
    let server = TestServer::start().await;

    let resp = server.get("/simulated").await;
    assert_status(&resp, StatusCode::OK);
    assert_header(&resp, "x-ratelimit-algorithm", "fixed");
    assert_header(&resp, "x-ratelimit-limit", "5");
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], true);
}

/// Every decision lands in the stats exactly once
#[tokio::test]
async fn test_stats_count_decisions() {
    let server = TestServer::start().await;
    server.hit(7).await;

    let stats = server.get_json("/api/stats").await;
    assert_eq!(stats["allowed"], 5);
    assert_eq!(stats["denied"], 2);

    let history = stats["history"].as_array().unwrap();
    assert!(!history.is_empty());
    let allowed: u64 = history.iter().map(|e| e["allowed"].as_u64().unwrap()).sum();
    let denied: u64 = history.iter().map(|e| e["denied"].as_u64().unwrap()).sum();
    assert_eq!((allowed, denied), (5, 2));
}

/// Control endpoints are never subject to admission
#[tokio::test]
async fn test_control_endpoints_not_limited() {
    let server = TestServer::start().await;
    server.hit(6).await;

    for _ in 0..10 {
        let resp = server.get("/api/state").await;
        assert_status(&resp, StatusCode::OK);
        assert!(resp.headers().get("x-ratelimit-algorithm").is_none());
    }
    let stats = server.get_json("/api/stats").await;
    assert_eq!(stats["allowed"], 5);
    assert_eq!(stats["denied"], 1);
}

/// The guarded state reflects admitted requests
#[tokio::test]
async fn test_state_tracks_admissions() {
    let server = TestServer::start().await;
    server.hit(3).await;

    let state = server.get_json("/api/state").await;
    assert_eq!(state["state"]["count"], 3);
}

/// Switching gives a fresh limiter with the new capacity
#[tokio::test]
async fn test_switch_resets_capacity() {
    let server = TestServer::start().await;
    assert_eq!(count(&server.hit(6).await, StatusCode::TOO_MANY_REQUESTS), 1);

    let resp = server
        .post_json("/api/algorithm", &json!({ "algorithm": "sliding-log", "rpsLimit": 3 }))
        .await;
    assert_status(&resp, StatusCode::OK);

    let statuses = server.hit(5).await;
    assert_eq!(count(&statuses, StatusCode::OK), 3);
    assert_eq!(count(&statuses, StatusCode::TOO_MANY_REQUESTS), 2);

    let resp = server.get("/api/test").await;
    assert_header(&resp, "x-ratelimit-algorithm", "sliding-log");
    assert_header(&resp, "x-ratelimit-limit", "3");
}

/// Each algorithm admits a burst up to its capacity
#[tokio::test]
async fn test_every_algorithm_caps_burst() {
    let server = TestServer::start().await;

    for algorithm in ["fixed", "sliding-log", "sliding-counter", "token", "leaky"] {
        let resp = server
            .post_json("/api/algorithm", &json!({ "algorithm": algorithm, "rpsLimit": 4 }))
            .await;
        assert_status(&resp, StatusCode::OK);

        // 4 per 10s means at most one unit of refill or drain during the burst
        let statuses = server.hit(8).await;
        let allowed = count(&statuses, StatusCode::OK);
        assert!(
            (4..=5).contains(&allowed),
            "{} allowed {} of 8",
            algorithm,
            allowed
        );
        assert_eq!(statuses[0], StatusCode::OK, "{} denied first request", algorithm);
        assert_eq!(
            statuses[7],
            StatusCode::TOO_MANY_REQUESTS,
            "{} allowed last request",
            algorithm
        );
    }
}
