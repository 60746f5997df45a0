//! A client driving the server while keeping its own mirror and stats.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::debug;

use super::{Mirror, SharedMirror, SnapshotPoller};
use crate::client::{ApiClient, ClientError};
use crate::limiter::{Clock, Decision, SystemClock};
use crate::stats::{Stats, StatsAggregator};

/// Server verdict for one request, next to what the mirror expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub decision: Decision,
    pub predicted: Decision,
}

impl Outcome {
    pub fn matched(&self) -> bool {
        self.decision == self.predicted
    }
}

pub struct MirrorSession {
    client: ApiClient,
    mirror: SharedMirror,
    stats: StatsAggregator,
    clock: Arc<dyn Clock>,
}

impl MirrorSession {
    /// Seed a session from the server's current state.
    pub async fn connect(client: ApiClient) -> Result<Self, ClientError> {
        Self::connect_with_clock(client, Arc::new(SystemClock)).await
    }

    pub async fn connect_with_clock(
        client: ApiClient,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ClientError> {
        let snapshot = client.get_state().await?;
        Ok(Self {
            client,
            mirror: Arc::new(Mutex::new(Mirror::from_snapshot(&snapshot))),
            stats: StatsAggregator::new(),
            clock,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn mirror(&self) -> MutexGuard<'_, Mirror> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locally observed stats; independent of the server's.
    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    /// Send one admission request and feed the verdict to the mirror.
    pub async fn send(&mut self) -> Result<Outcome, ClientError> {
        let predicted = self.mirror().predict(self.clock.now_millis());
        let decision = self.client.admit().await?;

        let now = self.clock.now_millis();
        self.stats.record(decision, now);
        self.mirror().observe(decision, now);

        let outcome = Outcome {
            decision,
            predicted,
        };
        if !outcome.matched() {
            debug!(%decision, %predicted, "Mirror prediction missed");
        }
        Ok(outcome)
    }

    /// Reset local state, then send `count` requests spaced by `pause`.
    pub async fn test_run(&mut self, count: usize, pause: Duration) -> Result<Stats, ClientError> {
        self.stats.reset();
        self.mirror().reset(self.clock.now_millis());

        for i in 0..count {
            self.send().await?;
            if i + 1 < count && !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
        Ok(self.stats())
    }

    /// Switch the server's algorithm and rebuild the mirror from its answer.
    pub async fn switch_algorithm(
        &mut self,
        algorithm: &str,
        rps_limit: Option<u64>,
    ) -> Result<(), ClientError> {
        self.client.switch_algorithm(algorithm, rps_limit).await?;
        // the switch response has no state, so seed from a fresh snapshot
        let snapshot = self.client.get_state().await?;
        self.mirror().reconcile(&snapshot);
        self.stats.reset();
        Ok(())
    }

    /// Reconcile against the server now.
    pub async fn refresh(&self) -> Result<bool, ClientError> {
        SnapshotPoller::poll_once(&self.client, &self.mirror).await
    }

    /// Start background reconciliation sharing this session's mirror.
    pub fn start_polling(&self, interval: Duration) -> SnapshotPoller {
        SnapshotPoller::spawn(self.client.clone(), Arc::clone(&self.mirror), interval)
    }
}

impl std::fmt::Debug for MirrorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorSession")
            .field("client", &self.client)
            .field("stats", &self.stats)
            .finish()
    }
}
