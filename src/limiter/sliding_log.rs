//! Sliding log: one timestamp per admitted request.

use super::{
    Algorithm, AlgorithmConfig, AlgorithmKind, Decision, LimiterError, LimiterState,
    SlidingLogState,
};

/// Exact sliding window.
///
/// Memory grows with `limit`, not with traffic: denied requests are never
/// logged.
#[derive(Debug, Clone)]
pub struct SlidingLog {
    config: AlgorithmConfig,
    state: SlidingLogState,
}

impl SlidingLog {
    pub fn new(config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self::build(config, now))
    }

    pub(crate) fn build(config: AlgorithmConfig, _now: u64) -> Self {
        Self {
            config,
            state: SlidingLogState::default(),
        }
    }

    fn purge(&mut self, now: u64) {
        let window = self.config.window_size_ms;
        while let Some(&ts) = self.state.timestamps.front() {
            if now.saturating_sub(ts) > window {
                self.state.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Algorithm for SlidingLog {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::SlidingLog
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn admit(&mut self, now: u64) -> Decision {
        self.purge(now);
        if (self.state.timestamps.len() as u64) < self.config.limit {
            self.state.timestamps.push_back(now);
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn tick(&mut self, now: u64) {
        self.purge(now);
    }

    fn reset(&mut self) {
        self.state.timestamps.clear();
    }

    fn snapshot(&self) -> LimiterState {
        LimiterState::SlidingLog(self.state.clone())
    }
}
