//! Client mirror tests against a live server

use std::sync::atomic::Ordering;
use std::time::Duration;

use ratevis::client::ApiClient;
use ratevis::limiter::{AlgorithmKind, Decision, LimiterState};
use ratevis::mirror::MirrorSession;

use crate::helpers::*;

/// A run of 7 splits 5/2 and the mirror predicts every verdict
#[tokio::test]
async fn test_run_matches_server() {
    let server = TestServer::start().await;
    let mut session = MirrorSession::connect(ApiClient::new(&server.base_url))
        .await
        .unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..7 {
        outcomes.push(session.send().await.unwrap());
    }
    assert!(outcomes.iter().all(|o| o.matched()), "{:?}", outcomes);
    assert_eq!(outcomes[4].decision, Decision::Allow);
    assert_eq!(outcomes[5].decision, Decision::Deny);

    let local = session.stats();
    assert_eq!((local.allowed, local.denied), (5, 2));

    let remote = session.client().get_stats().await.unwrap();
    assert_eq!((remote.allowed, remote.denied), (5, 2));
}

/// test_run resets local stats but not the server's
#[tokio::test]
async fn test_run_resets_local_stats() {
    let server = TestServer::start().await;
    let mut session = MirrorSession::connect(ApiClient::new(&server.base_url))
        .await
        .unwrap();

    let stats = session.test_run(3, Duration::ZERO).await.unwrap();
    assert_eq!((stats.allowed, stats.denied), (3, 0));

    let stats = session.test_run(3, Duration::ZERO).await.unwrap();
    assert_eq!((stats.allowed, stats.denied), (2, 1));

    let remote = session.client().get_stats().await.unwrap();
    assert_eq!((remote.allowed, remote.denied), (5, 1));
}

/// Switching through the session rebuilds the mirror from the server
#[tokio::test]
async fn test_switch_through_session() {
    let server = TestServer::start().await;
    let mut session = MirrorSession::connect(ApiClient::new(&server.base_url))
        .await
        .unwrap();

    session.switch_algorithm("token", Some(3)).await.unwrap();
    {
        let mirror = session.mirror();
        assert_eq!(mirror.kind(), AlgorithmKind::TokenBucket);
        assert_eq!(mirror.config().max_tokens, 3);
    }

    let stats = session.test_run(4, Duration::ZERO).await.unwrap();
    assert_eq!((stats.allowed, stats.denied), (3, 1));
}

/// A switch made behind the session's back is picked up by reconciliation
#[tokio::test]
async fn test_refresh_detects_drift() {
    let server = TestServer::start().await;
    let session = MirrorSession::connect(ApiClient::new(&server.base_url))
        .await
        .unwrap();

    // another client changes the algorithm
    ApiClient::new(&server.base_url)
        .switch_algorithm("leaky", Some(2))
        .await
        .unwrap();
    server.hit(1).await;

    assert!(session.refresh().await.unwrap());
    assert_eq!(session.mirror().kind(), AlgorithmKind::LeakyBucket);
    assert_eq!(session.mirror().used(), 1.0);
    // nothing changed since
    assert!(!session.refresh().await.unwrap());
}

/// The background poller reconciles on its own
#[tokio::test]
async fn test_poller_reconciles() {
    let server = TestServer::start().await;
    let session = MirrorSession::connect(ApiClient::new(&server.base_url))
        .await
        .unwrap();
    let mut poller = session.start_polling(Duration::from_millis(50));

    // consume capacity without going through the session
    server.hit(4).await;

    let mut synced = false;
    for _ in 0..40 {
        if let LimiterState::FixedWindow(s) = session.mirror().state() {
            if s.count == 4 {
                synced = true;
            }
        }
        if synced {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    assert!(synced, "mirror never caught up");
    assert!(poller.counters().polls.load(Ordering::Relaxed) >= 1);
    assert!(poller.counters().drifts.load(Ordering::Relaxed) >= 1);

    poller.stop();
    assert!(!poller.is_running());
}
