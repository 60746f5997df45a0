//! Leaky bucket (queue variant).

use super::{
    units_elapsed, Algorithm, AlgorithmConfig, AlgorithmKind, Decision, LeakyBucketState,
    LimiterError, LimiterState,
};

/// FIFO queue drained at `process_rate_per_sec`.
///
/// Admission enqueues the request timestamp; a full queue denies.
#[derive(Debug, Clone)]
pub struct LeakyBucket {
    config: AlgorithmConfig,
    state: LeakyBucketState,
    created_at: u64,
}

impl LeakyBucket {
    pub fn new(config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self::build(config, now))
    }

    pub(crate) fn build(config: AlgorithmConfig, now: u64) -> Self {
        Self {
            config,
            state: LeakyBucketState {
                queue: Default::default(),
                last_process_ms: now,
            },
            created_at: now,
        }
    }

    fn drain(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.state.last_process_ms);
        let leaks = units_elapsed(elapsed, self.config.process_rate_per_sec);
        if leaks > 0.0 {
            let n = (leaks as usize).min(self.state.queue.len());
            self.state.queue.drain(..n);
            self.state.last_process_ms = now;
        }
    }
}

impl Algorithm for LeakyBucket {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::LeakyBucket
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn admit(&mut self, now: u64) -> Decision {
        self.drain(now);
        if (self.state.queue.len() as u64) < self.config.max_queue_size {
            self.state.queue.push_back(now);
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn tick(&mut self, now: u64) {
        self.drain(now);
    }

    fn reset(&mut self) {
        self.state.queue.clear();
        self.state.last_process_ms = self.created_at;
    }

    fn snapshot(&self) -> LimiterState {
        LimiterState::LeakyBucket(self.state.clone())
    }
}
