//! Periodic reconciliation of a mirror against `GET /api/state`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::SharedMirror;
use crate::client::{ApiClient, ClientError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Counters kept by a running poller.
#[derive(Debug, Default)]
pub struct PollCounters {
    pub polls: AtomicU64,
    pub failures: AtomicU64,
    pub drifts: AtomicU64,
}

pub struct SnapshotPoller {
    handle: Option<JoinHandle<()>>,
    counters: Arc<PollCounters>,
}

impl SnapshotPoller {
    /// Start polling every `interval`. Must be called inside a tokio runtime.
    pub fn spawn(client: ApiClient, mirror: SharedMirror, interval: Duration) -> Self {
        let counters = Arc::new(PollCounters::default());
        let task_counters = Arc::clone(&counters);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                task_counters.polls.fetch_add(1, Ordering::Relaxed);
                match Self::poll_once(&client, &mirror).await {
                    Ok(true) => {
                        task_counters.drifts.fetch_add(1, Ordering::Relaxed);
                        debug!("Mirror corrected from server snapshot");
                    }
                    Ok(false) => {}
                    Err(e) => {
                        // the mirror keeps its last known state
                        task_counters.failures.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "State poll failed");
                    }
                }
            }
        });

        Self {
            handle: Some(handle),
            counters,
        }
    }

    /// Fetch one snapshot and reconcile. Returns whether the mirror drifted.
    pub async fn poll_once(client: &ApiClient, mirror: &SharedMirror) -> Result<bool, ClientError> {
        let snapshot = client.get_state().await?;
        let mut mirror = mirror.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(mirror.reconcile(&snapshot))
    }

    pub fn counters(&self) -> &PollCounters {
        &self.counters
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Abort the polling task. No reconcile runs after this returns.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("State poller stopped");
        }
    }
}

impl Drop for SnapshotPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
