//! Algorithm parameters shared by all five state machines.

use serde::{Deserialize, Serialize};

use super::LimiterError;

/// Default admission limit per window.
pub const DEFAULT_LIMIT: u64 = 5;

/// Default window size in milliseconds.
pub const DEFAULT_WINDOW_MS: u64 = 10_000;

/// Default sliding-counter bucket width in milliseconds.
pub const DEFAULT_BUCKET_SIZE_MS: u64 = 100;

/// Parameters for an admission algorithm.
///
/// Each algorithm reads only the fields it needs; the rest are carried so a
/// snapshot always describes the full configuration that was installed.
///
/// Derived defaults (see [`AlgorithmConfig::new`]):
///
/// | Field | Default |
/// |-------|---------|
/// | `max_tokens` | `limit` |
/// | `refill_rate_per_sec` | `limit / (window_size_ms / 1000)` |
/// | `max_queue_size` | `limit` |
/// | `process_rate_per_sec` | `limit / (window_size_ms / 1000)` |
/// | `bucket_size_ms` | `100` |
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlgorithmConfig {
    /// Admissions per window (fixed window, sliding log, sliding counter).
    pub limit: u64,
    /// Window length in milliseconds.
    pub window_size_ms: u64,
    /// Token bucket capacity.
    pub max_tokens: u64,
    /// Tokens added per second.
    pub refill_rate_per_sec: f64,
    /// Leaky bucket capacity.
    pub max_queue_size: u64,
    /// Queue entries drained per second.
    pub process_rate_per_sec: f64,
    /// Sliding counter bucket width in milliseconds.
    pub bucket_size_ms: u64,
}

impl AlgorithmConfig {
    /// Build a config from `limit` and `window_size_ms`, deriving the rest.
    pub fn new(limit: u64, window_size_ms: u64) -> Self {
        let rate = derived_rate(limit, window_size_ms);
        Self {
            limit,
            window_size_ms,
            max_tokens: limit,
            refill_rate_per_sec: rate,
            max_queue_size: limit,
            process_rate_per_sec: rate,
            bucket_size_ms: DEFAULT_BUCKET_SIZE_MS,
        }
    }

    /// Replace `limit` and re-derive the dependent defaults.
    ///
    /// The window and bucket width are kept.
    pub fn with_limit(self, limit: u64) -> Self {
        Self {
            bucket_size_ms: self.bucket_size_ms,
            ..Self::new(limit, self.window_size_ms)
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_refill_rate(mut self, per_sec: f64) -> Self {
        self.refill_rate_per_sec = per_sec;
        self
    }

    pub fn with_max_queue_size(mut self, size: u64) -> Self {
        self.max_queue_size = size;
        self
    }

    pub fn with_process_rate(mut self, per_sec: f64) -> Self {
        self.process_rate_per_sec = per_sec;
        self
    }

    pub fn with_bucket_size_ms(mut self, bucket_size_ms: u64) -> Self {
        self.bucket_size_ms = bucket_size_ms;
        self
    }

    /// Check that every size and rate is strictly positive.
    pub fn validate(&self) -> Result<(), LimiterError> {
        if self.limit == 0 {
            return Err(LimiterError::invalid("limit", self.limit));
        }
        if self.window_size_ms == 0 {
            return Err(LimiterError::invalid("windowSizeMs", self.window_size_ms));
        }
        if self.max_tokens == 0 {
            return Err(LimiterError::invalid("maxTokens", self.max_tokens));
        }
        if !is_positive(self.refill_rate_per_sec) {
            return Err(LimiterError::invalid(
                "refillRatePerSec",
                self.refill_rate_per_sec,
            ));
        }
        if self.max_queue_size == 0 {
            return Err(LimiterError::invalid("maxQueueSize", self.max_queue_size));
        }
        if !is_positive(self.process_rate_per_sec) {
            return Err(LimiterError::invalid(
                "processRatePerSec",
                self.process_rate_per_sec,
            ));
        }
        if self.bucket_size_ms == 0 {
            return Err(LimiterError::invalid("bucketSizeMs", self.bucket_size_ms));
        }
        Ok(())
    }
}

impl Default for AlgorithmConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT, DEFAULT_WINDOW_MS)
    }
}

#[inline]
fn derived_rate(limit: u64, window_size_ms: u64) -> f64 {
    if window_size_ms == 0 {
        return 0.0;
    }
    limit as f64 * 1000.0 / window_size_ms as f64
}

#[inline]
fn is_positive(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

/// Whole units accrued over `elapsed_ms` at `per_sec`.
///
/// Multiplies before dividing so that e.g. 200ms at 5/s is exactly 1.
#[inline]
pub(crate) fn units_elapsed(elapsed_ms: u64, per_sec: f64) -> f64 {
    (elapsed_ms as f64 * per_sec / 1000.0).floor()
}
