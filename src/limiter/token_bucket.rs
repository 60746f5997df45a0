//! Token bucket.

use super::{
    units_elapsed, Algorithm, AlgorithmConfig, AlgorithmKind, Decision, LimiterError,
    LimiterState, TokenBucketState,
};

/// Starts full with `max_tokens`; each admission spends one token.
///
/// Refill is whole tokens only. `last_refill_ms` moves forward only when at
/// least one token was added, so fractional progress is never lost.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    config: AlgorithmConfig,
    state: TokenBucketState,
    created_at: u64,
}

impl TokenBucket {
    pub fn new(config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self::build(config, now))
    }

    pub(crate) fn build(config: AlgorithmConfig, now: u64) -> Self {
        let state = Self::initial(&config, now);
        Self {
            config,
            state,
            created_at: now,
        }
    }

    fn initial(config: &AlgorithmConfig, now: u64) -> TokenBucketState {
        TokenBucketState {
            tokens: config.max_tokens as f64,
            last_refill_ms: now,
        }
    }

    fn refill(&mut self, now: u64) {
        let elapsed = now.saturating_sub(self.state.last_refill_ms);
        let added = units_elapsed(elapsed, self.config.refill_rate_per_sec);
        if added > 0.0 {
            self.state.tokens = (self.state.tokens + added).min(self.config.max_tokens as f64);
            self.state.last_refill_ms = now;
        }
    }
}

impl Algorithm for TokenBucket {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::TokenBucket
    }

    fn config(&self) -> &AlgorithmConfig {
        &self.config
    }

    fn admit(&mut self, now: u64) -> Decision {
        self.refill(now);
        if self.state.tokens >= 1.0 {
            self.state.tokens -= 1.0;
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn tick(&mut self, now: u64) {
        self.refill(now);
    }

    fn reset(&mut self) {
        self.state = Self::initial(&self.config, self.created_at);
    }

    fn snapshot(&self) -> LimiterState {
        LimiterState::TokenBucket(self.state.clone())
    }
}
