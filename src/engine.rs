//! Shared admission state.
//!
//! One lock covers the registry and the stats, so purge+consume+record and
//! switch+reset are each a single step for every other request.

use std::net::IpAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use crate::limiter::{
    AlgorithmConfig, AlgorithmKind, Clock, Decision, LimiterError, SystemClock,
};
use crate::registry::{LimiterRegistry, PartitionKey, PartitionMode, Snapshot};
use crate::stats::{Stats, StatsAggregator};

pub(crate) struct EngineState {
    pub registry: LimiterRegistry,
    pub stats: StatsAggregator,
}

impl EngineState {
    /// Decide one request and count it. Only the admission middleware calls this.
    pub fn admit(&mut self, key: &PartitionKey, now: u64) -> Decision {
        let decision = self.registry.admit(key, now);
        self.stats.record(decision, now);
        decision
    }
}

pub struct Engine {
    inner: Mutex<EngineState>,
    clock: Arc<dyn Clock>,
    partition_mode: PartitionMode,
}

impl Engine {
    pub fn new(
        kind: AlgorithmKind,
        config: AlgorithmConfig,
        partition_mode: PartitionMode,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LimiterError> {
        let registry = LimiterRegistry::new(kind, config)?;
        Ok(Self {
            inner: Mutex::new(EngineState {
                registry,
                stats: StatsAggregator::new(),
            }),
            clock,
            partition_mode,
        })
    }

    /// Engine driven by wall-clock time.
    pub fn with_system_clock(
        kind: AlgorithmKind,
        config: AlgorithmConfig,
        partition_mode: PartitionMode,
    ) -> Result<Self, LimiterError> {
        Self::new(kind, config, partition_mode, Arc::new(SystemClock))
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, EngineState> {
        // State is consistent between calls, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    pub fn partition_mode(&self) -> PartitionMode {
        self.partition_mode
    }

    pub fn partition_for(&self, ip: IpAddr) -> PartitionKey {
        self.partition_mode.key_for(ip)
    }

    /// Active algorithm and a copy of its config.
    pub fn active(&self) -> (AlgorithmKind, AlgorithmConfig) {
        let state = self.lock();
        let (kind, config) = state.registry.active();
        (kind, config.clone())
    }

    /// Switch to `name`, optionally replacing the limit, and clear stats.
    ///
    /// Without a limit the current one is kept. The dependent rates are
    /// re-derived from the limit either way.
    pub fn switch_to(&self, name: &str, limit: Option<u64>) -> Result<Snapshot, LimiterError> {
        let mut state = self.lock();
        let current = state.registry.config().clone();
        let limit = limit.unwrap_or(current.limit);
        let config = current.with_limit(limit);

        let snapshot = state.registry.switch_to(name, config, self.now())?;
        state.stats.reset();
        info!(
            algorithm = %snapshot.algorithm,
            limit = snapshot.config.limit,
            window_ms = snapshot.config.window_size_ms,
            "Rate limiting algorithm switched"
        );
        Ok(snapshot)
    }

    pub fn snapshot(&self, key: &PartitionKey) -> Snapshot {
        let now = self.now();
        self.lock().registry.snapshot(key, now)
    }

    pub fn stats(&self) -> Stats {
        self.lock().stats.snapshot()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("partition_mode", &self.partition_mode)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
