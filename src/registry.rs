//! Limiter registry: the active algorithm plus one state machine per partition.
//!
//! The registry is an explicit value, not module-level state, so tests (and
//! multiple engines in one process) can each own an independent store.
//! Switching algorithms is all-or-nothing: the name and config are validated
//! before any existing partition state is discarded.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::limiter::{
    Algorithm, AlgorithmConfig, AlgorithmKind, Decision, Limiter, LimiterError, LimiterState,
};

const GLOBAL_KEY: &str = "global";

/// Lower bound on the interval between idle-partition sweeps.
const MIN_SWEEP_INTERVAL_MS: u64 = 1_000;

/// Identifies whose state a limiter belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PartitionKey(Arc<str>);

impl PartitionKey {
    /// Single shared partition.
    pub fn global() -> Self {
        PartitionKey(Arc::from(GLOBAL_KEY))
    }

    pub fn new(key: impl AsRef<str>) -> Self {
        PartitionKey(Arc::from(key.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<IpAddr> for PartitionKey {
    fn from(ip: IpAddr) -> Self {
        PartitionKey(Arc::from(ip.to_string()))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How requests are mapped to partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PartitionMode {
    /// Every caller shares one partition.
    Global,
    /// One partition per client IP address.
    #[default]
    PerClient,
}

impl PartitionMode {
    pub fn key_for(self, ip: IpAddr) -> PartitionKey {
        match self {
            PartitionMode::Global => PartitionKey::global(),
            PartitionMode::PerClient => PartitionKey::from(ip),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            PartitionMode::Global => "global",
            PartitionMode::PerClient => "ip",
        }
    }
}

/// Read-only view of one partition's limiter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub algorithm: AlgorithmKind,
    pub config: AlgorithmConfig,
    pub partition: String,
    pub state: LimiterState,
    pub taken_at_ms: u64,
}

/// Store of limiters keyed by partition, all sharing the active algorithm.
#[derive(Debug)]
pub struct LimiterRegistry {
    kind: AlgorithmKind,
    config: AlgorithmConfig,
    partitions: HashMap<PartitionKey, Limiter>,
    last_sweep_ms: Option<u64>,
}

impl LimiterRegistry {
    pub fn new(kind: AlgorithmKind, config: AlgorithmConfig) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self {
            kind,
            config,
            partitions: HashMap::new(),
            last_sweep_ms: None,
        })
    }

    /// Active algorithm and its config.
    pub fn active(&self) -> (AlgorithmKind, &AlgorithmConfig) {
        (self.kind, &self.config)
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    /// Number of partitions holding state.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Install a fresh limiter for `name`, discarding every partition's state.
    ///
    /// On error the previously active limiter is left untouched.
    pub fn switch_to(
        &mut self,
        name: &str,
        config: AlgorithmConfig,
        now: u64,
    ) -> Result<Snapshot, LimiterError> {
        let kind: AlgorithmKind = name.parse()?;
        config.validate()?;

        self.kind = kind;
        self.config = config;
        self.partitions.clear();
        self.last_sweep_ms = None;

        Ok(self.snapshot(&PartitionKey::global(), now))
    }

    /// Limiter for `key`, created on first use.
    pub fn get_active(&mut self, key: &PartitionKey, now: u64) -> &mut Limiter {
        let (kind, config) = (self.kind, &self.config);
        self.partitions
            .entry(key.clone())
            .or_insert_with(|| Limiter::build(kind, config.clone(), now))
    }

    /// Admit one request for `key`.
    ///
    /// At most once per window, partitions that have drifted back to an
    /// unused state are dropped first so the map tracks only active callers.
    pub fn admit(&mut self, key: &PartitionKey, now: u64) -> Decision {
        self.maybe_evict_idle(now);
        self.get_active(key, now).admit(now)
    }

    /// Milliseconds until `key` could next be admitted, zero if it has
    /// spare capacity now.
    pub fn retry_after_ms(&mut self, key: &PartitionKey, now: u64) -> u64 {
        match self.partitions.get_mut(key) {
            Some(limiter) => {
                limiter.tick(now);
                limiter.snapshot().retry_after_ms(&self.config, now)
            }
            None => 0,
        }
    }

    /// Drop every partition whose state is unused at `now`.
    ///
    /// A dropped partition is rebuilt fresh on its next request, which is
    /// equivalent to the state it was evicted in. Returns how many were
    /// dropped.
    pub fn evict_idle(&mut self, now: u64) -> usize {
        let before = self.partitions.len();
        let max_tokens = self.config.max_tokens;
        self.partitions.retain(|_, limiter| {
            limiter.tick(now);
            !limiter.snapshot().is_idle(max_tokens)
        });
        self.last_sweep_ms = Some(now);
        before - self.partitions.len()
    }

    fn maybe_evict_idle(&mut self, now: u64) {
        let interval = self.config.window_size_ms.max(MIN_SWEEP_INTERVAL_MS);
        match self.last_sweep_ms {
            None => self.last_sweep_ms = Some(now),
            Some(last) if now.saturating_sub(last) >= interval => {
                let evicted = self.evict_idle(now);
                if evicted > 0 {
                    tracing::debug!(
                        evicted,
                        remaining = self.partitions.len(),
                        "evicted idle partitions"
                    );
                }
            }
            Some(_) => {}
        }
    }

    /// Snapshot of `key` after advancing its bookkeeping to `now`.
    ///
    /// A partition with no state yet reports a fresh limiter without
    /// allocating one.
    pub fn snapshot(&mut self, key: &PartitionKey, now: u64) -> Snapshot {
        let state = match self.partitions.get_mut(key) {
            Some(limiter) => {
                limiter.tick(now);
                limiter.snapshot()
            }
            None => Limiter::build(self.kind, self.config.clone(), now).snapshot(),
        };

        Snapshot {
            algorithm: self.kind,
            config: self.config.clone(),
            partition: key.to_string(),
            state,
            taken_at_ms: now,
        }
    }

    /// Reset every partition to its initial state.
    pub fn reset(&mut self) {
        for limiter in self.partitions.values_mut() {
            limiter.reset();
        }
    }
}
