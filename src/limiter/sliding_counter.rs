//! Sliding window approximated with fixed-width buckets.

use std::collections::BTreeMap;

use super::{
    Algorithm, AlgorithmConfig, AlgorithmKind, CounterBucket, Decision, LimiterError,
    LimiterState, SlidingCounterState,
};

/// Per-bucket admission counts.
///
/// The window total is the sum of every bucket whose distance from the
/// current bucket is within `window_size_ms`. Bucket granularity means a
/// request near a boundary may be counted against the window for up to one
/// extra bucket width.
#[derive(Debug, Clone)]
pub struct SlidingCounter {
    config: AlgorithmConfig,
    buckets: BTreeMap<u64, u64>,
}

impl SlidingCounter {
    pub fn new(config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self::build(config, now))
    }

    pub(crate) fn build(config: AlgorithmConfig, _now: u64) -> Self {
        Self {
            config,
            buckets: BTreeMap::new(),
        }
    }

    #[inline]
    fn bucket_id(&self, now: u64) -> u64 {
        now / self.config.bucket_size_ms
    }

    fn purge(&mut self, current: u64) {
        let bucket_size = self.config.bucket_size_ms;
        let window = self.config.window_size_ms;
        self.buckets
            .retain(|&id, _| current.saturating_sub(id).saturating_mul(bucket_size) <= window);
    }

    fn total(&self) -> u64 {
        self.buckets.values().sum()
    }
}

impl Algorithm for SlidingCounter {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::SlidingCounter
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn admit(&mut self, now: u64) -> Decision {
        let current = self.bucket_id(now);
        self.purge(current);
        if self.total() < self.config.limit {
            *self.buckets.entry(current).or_insert(0) += 1;
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn tick(&mut self, now: u64) {
        let current = self.bucket_id(now);
        self.purge(current);
    }

    fn reset(&mut self) {
        self.buckets.clear();
    }

    fn snapshot(&self) -> LimiterState {
        LimiterState::SlidingCounter(SlidingCounterState {
            buckets: self
                .buckets
                .iter()
                .map(|(&id, &count)| CounterBucket { id, count })
                .collect(),
        })
    }
}
