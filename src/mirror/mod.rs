//! Client-side mirror of the server's limiter.
//!
//! The mirror is a predictive re-implementation driven by two inputs:
//! outcomes the client observes for its own requests, and authoritative
//! snapshots polled from the server. A snapshot always wins. Nothing in
//! here decides admission; it exists to render the limiter between polls.
//!
//! ```
//! use ratevis::limiter::{AlgorithmConfig, AlgorithmKind, Decision};
//! use ratevis::mirror::Mirror;
//!
//! let mut mirror = Mirror::new(AlgorithmKind::TokenBucket, AlgorithmConfig::new(2, 1_000), 0)?;
//! mirror.observe(Decision::Allow, 0);
//! mirror.observe(Decision::Allow, 0);
//! assert_eq!(mirror.predict(0), Decision::Deny);
//! assert_eq!(mirror.predict(500), Decision::Allow);
//! # Ok::<(), ratevis::limiter::LimiterError>(())
//! ```

mod poller;
mod session;

pub use poller::{PollCounters, SnapshotPoller, DEFAULT_POLL_INTERVAL};
pub use session::{MirrorSession, Outcome};

use std::sync::{Arc, Mutex};

use crate::limiter::{
    units_elapsed, AlgorithmConfig, AlgorithmKind, CounterBucket, Decision, FixedWindowState,
    LeakyBucketState, LimiterError, LimiterState, SlidingCounterState, SlidingLogState,
    TokenBucketState,
};
use crate::registry::Snapshot;

/// Mirror shared between a session and its poller.
pub type SharedMirror = Arc<Mutex<Mirror>>;

#[derive(Clone, Debug, PartialEq)]
pub struct Mirror {
    kind: AlgorithmKind,
    config: AlgorithmConfig,
    state: LimiterState,
}

impl Mirror {
    pub fn new(kind: AlgorithmKind, config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        let state = initial_state(kind, &config, now);
        Ok(Self {
            kind,
            config,
            state,
        })
    }

    /// Mirror seeded from an authoritative snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self {
            kind: snapshot.algorithm,
            config: snapshot.config.clone(),
            state: snapshot.state.clone(),
        }
    }

    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    pub fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    pub fn state(&self) -> &LimiterState {
        &self.state
    }

    /// Capacity in use, in the algorithm's own unit.
    pub fn used(&self) -> f64 {
        self.state.used(self.config.max_tokens)
    }

    /// Would the next request be admitted? Advances bookkeeping only.
    pub fn predict(&mut self, now: u64) -> Decision {
        self.tick(now);
        Decision::from_allowed(self.has_capacity())
    }

    /// Advance with the server's verdict for a request sent at `now`.
    ///
    /// An allow consumes capacity even when the mirror thought none was
    /// left; the counters saturate at their maxima until the next snapshot
    /// corrects them. A deny only advances bookkeeping.
    pub fn observe(&mut self, decision: Decision, now: u64) {
        self.tick(now);
        if decision.is_allowed() {
            self.consume(now);
        }
    }

    /// Time-driven bookkeeping: window roll, purge, refill, drain.
    pub fn tick(&mut self, now: u64) {
        let config = &self.config;
        match &mut self.state {
            LimiterState::FixedWindow(s) => {
                if now.saturating_sub(s.window_start_ms) >= config.window_size_ms {
                    s.window_start_ms = now;
                    s.count = 0;
                }
            }
            LimiterState::SlidingLog(s) => {
                let window = config.window_size_ms;
                while s
                    .timestamps
                    .front()
                    .is_some_and(|&ts| now.saturating_sub(ts) > window)
                {
                    s.timestamps.pop_front();
                }
            }
            LimiterState::SlidingCounter(s) => {
                let current = bucket_id(config, now);
                let (size, window) = (config.bucket_size_ms, config.window_size_ms);
                s.buckets
                    .retain(|b| current.saturating_sub(b.id).saturating_mul(size) <= window);
            }
            LimiterState::TokenBucket(s) => {
                let elapsed = now.saturating_sub(s.last_refill_ms);
                let added = units_elapsed(elapsed, config.refill_rate_per_sec);
                if added > 0.0 {
                    s.tokens = (s.tokens + added).min(config.max_tokens as f64);
                    s.last_refill_ms = now;
                }
            }
            LimiterState::LeakyBucket(s) => {
                let elapsed = now.saturating_sub(s.last_process_ms);
                let leaks = units_elapsed(elapsed, config.process_rate_per_sec);
                if leaks > 0.0 {
                    let n = (leaks as usize).min(s.queue.len());
                    s.queue.drain(..n);
                    s.last_process_ms = now;
                }
            }
        }
    }

    pub fn reset(&mut self, now: u64) {
        self.state = initial_state(self.kind, &self.config, now);
    }

    /// Swap in a new config, keeping the current counters.
    ///
    /// Counters above the new maxima are clamped.
    pub fn reconfigure(&mut self, config: AlgorithmConfig) -> Result<(), LimiterError> {
        config.validate()?;
        self.config = config;
        self.clamp();
        Ok(())
    }

    /// Replace everything with the server's view.
    ///
    /// Returns `true` when the local prediction had drifted from it.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> bool {
        let drifted = self.kind != snapshot.algorithm
            || self.config != snapshot.config
            || self.state != snapshot.state;
        self.kind = snapshot.algorithm;
        self.config = snapshot.config.clone();
        self.state = snapshot.state.clone();
        drifted
    }

    fn has_capacity(&self) -> bool {
        let config = &self.config;
        match &self.state {
            LimiterState::FixedWindow(s) => s.count < config.limit,
            LimiterState::SlidingLog(s) => (s.timestamps.len() as u64) < config.limit,
            LimiterState::SlidingCounter(s) => s.total() < config.limit,
            LimiterState::TokenBucket(s) => s.tokens >= 1.0,
            LimiterState::LeakyBucket(s) => (s.queue.len() as u64) < config.max_queue_size,
        }
    }

    fn consume(&mut self, now: u64) {
        let config = &self.config;
        match &mut self.state {
            LimiterState::FixedWindow(s) => s.count += 1,
            LimiterState::SlidingLog(s) => s.timestamps.push_back(now),
            LimiterState::SlidingCounter(s) => {
                let id = bucket_id(config, now);
                match s.buckets.last_mut() {
                    Some(last) if last.id == id => last.count += 1,
                    _ => s.buckets.push(CounterBucket { id, count: 1 }),
                }
            }
            LimiterState::TokenBucket(s) => s.tokens = (s.tokens - 1.0).max(0.0),
            LimiterState::LeakyBucket(s) => s.queue.push_back(now),
        }
        self.clamp();
    }

    fn clamp(&mut self) {
        let config = &self.config;
        match &mut self.state {
            LimiterState::FixedWindow(s) => s.count = s.count.min(config.limit),
            LimiterState::SlidingLog(s) => {
                while s.timestamps.len() as u64 > config.limit {
                    s.timestamps.pop_front();
                }
            }
            LimiterState::SlidingCounter(s) => {
                while s.total() > config.limit {
                    match s.buckets.first_mut() {
                        Some(oldest) if oldest.count > 1 => oldest.count -= 1,
                        Some(_) => {
                            s.buckets.remove(0);
                        }
                        None => break,
                    }
                }
            }
            LimiterState::TokenBucket(s) => s.tokens = s.tokens.min(config.max_tokens as f64),
            LimiterState::LeakyBucket(s) => {
                while s.queue.len() as u64 > config.max_queue_size {
                    s.queue.pop_front();
                }
            }
        }
    }
}

fn initial_state(kind: AlgorithmKind, config: &AlgorithmConfig, now: u64) -> LimiterState {
    match kind {
        AlgorithmKind::FixedWindow => LimiterState::FixedWindow(FixedWindowState {
            window_start_ms: now,
            count: 0,
        }),
        AlgorithmKind::SlidingLog => LimiterState::SlidingLog(SlidingLogState::default()),
        AlgorithmKind::SlidingCounter => {
            LimiterState::SlidingCounter(SlidingCounterState::default())
        }
        AlgorithmKind::TokenBucket => LimiterState::TokenBucket(TokenBucketState {
            tokens: config.max_tokens as f64,
            last_refill_ms: now,
        }),
        AlgorithmKind::LeakyBucket => LimiterState::LeakyBucket(LeakyBucketState {
            queue: Default::default(),
            last_process_ms: now,
        }),
    }
}

#[inline]
fn bucket_id(config: &AlgorithmConfig, now: u64) -> u64 {
    now / config.bucket_size_ms.max(1)
}
