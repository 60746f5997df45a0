//! Introspectable limiter state, one variant per algorithm.
//!
//! These are plain data: the authoritative state machines render into them
//! for snapshots, and the client mirror advances them directly.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::config::units_elapsed;
use super::{AlgorithmConfig, AlgorithmKind};

/// Tagged algorithm state, serialized with a `kind` discriminator.
///
/// ```json
/// {"kind":"tokenBucket","tokens":3.0,"lastRefillMs":1700000000000}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LimiterState {
    FixedWindow(FixedWindowState),
    SlidingLog(SlidingLogState),
    SlidingCounter(SlidingCounterState),
    TokenBucket(TokenBucketState),
    LeakyBucket(LeakyBucketState),
}

impl LimiterState {
    /// Algorithm this state belongs to.
    pub fn kind(&self) -> AlgorithmKind {
        match self {
            LimiterState::FixedWindow(_) => AlgorithmKind::FixedWindow,
            LimiterState::SlidingLog(_) => AlgorithmKind::SlidingLog,
            LimiterState::SlidingCounter(_) => AlgorithmKind::SlidingCounter,
            LimiterState::TokenBucket(_) => AlgorithmKind::TokenBucket,
            LimiterState::LeakyBucket(_) => AlgorithmKind::LeakyBucket,
        }
    }

    /// Capacity currently in use, in the algorithm's own unit
    /// (requests counted, log entries, queued entries, tokens spent).
    pub fn used(&self, max_tokens: u64) -> f64 {
        match self {
            LimiterState::FixedWindow(s) => s.count as f64,
            LimiterState::SlidingLog(s) => s.timestamps.len() as f64,
            LimiterState::SlidingCounter(s) => s.total() as f64,
            LimiterState::TokenBucket(s) => max_tokens as f64 - s.tokens,
            LimiterState::LeakyBucket(s) => s.queue.len() as f64,
        }
    }

    /// True when nothing is in use, i.e. the state is indistinguishable from
    /// a freshly built limiter apart from its timestamps.
    pub fn is_idle(&self, max_tokens: u64) -> bool {
        self.used(max_tokens) <= 0.0
    }

    /// Milliseconds from `now` until the next admission could succeed.
    ///
    /// Zero when there is spare capacity. Assumes the state has already been
    /// advanced to `now`.
    pub fn retry_after_ms(&self, config: &AlgorithmConfig, now: u64) -> u64 {
        match self {
            LimiterState::FixedWindow(s) => {
                if s.count < config.limit {
                    return 0;
                }
                s.window_start_ms
                    .saturating_add(config.window_size_ms)
                    .saturating_sub(now)
            }
            LimiterState::SlidingLog(s) => {
                if (s.timestamps.len() as u64) < config.limit {
                    return 0;
                }
                // Entries are kept while exactly one window old.
                s.timestamps.front().map_or(0, |&oldest| {
                    oldest
                        .saturating_add(config.window_size_ms)
                        .saturating_add(1)
                        .saturating_sub(now)
                })
            }
            LimiterState::SlidingCounter(s) => {
                if s.total() < config.limit {
                    return 0;
                }
                let size = config.bucket_size_ms.max(1);
                s.buckets.first().map_or(0, |oldest| {
                    oldest
                        .id
                        .saturating_add(config.window_size_ms / size)
                        .saturating_add(1)
                        .saturating_mul(size)
                        .saturating_sub(now)
                })
            }
            LimiterState::TokenBucket(s) => {
                if s.tokens >= 1.0 {
                    return 0;
                }
                s.last_refill_ms
                    .saturating_add(ms_per_unit(config.refill_rate_per_sec))
                    .saturating_sub(now)
            }
            LimiterState::LeakyBucket(s) => {
                if (s.queue.len() as u64) < config.max_queue_size {
                    return 0;
                }
                s.last_process_ms
                    .saturating_add(ms_per_unit(config.process_rate_per_sec))
                    .saturating_sub(now)
            }
        }
    }
}

/// Smallest elapsed time that accrues one whole unit at `per_sec`.
fn ms_per_unit(per_sec: f64) -> u64 {
    if !(per_sec.is_finite() && per_sec > 0.0) {
        return u64::MAX;
    }
    let mut ms = (1000.0 / per_sec).ceil().min(u64::MAX as f64) as u64;
    // Float rounding in the division can land one millisecond either side.
    while ms > 1 && units_elapsed(ms - 1, per_sec) >= 1.0 {
        ms -= 1;
    }
    while units_elapsed(ms, per_sec) < 1.0 && ms < u64::MAX {
        ms += 1;
    }
    ms
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedWindowState {
    pub window_start_ms: u64,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidingLogState {
    /// Admission timestamps, oldest first.
    pub timestamps: VecDeque<u64>,
}

/// One sliding-counter bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterBucket {
    /// `floor(now / bucket_size_ms)`.
    pub id: u64,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlidingCounterState {
    /// Live buckets ordered by id.
    pub buckets: Vec<CounterBucket>,
}

impl SlidingCounterState {
    /// Sum of all live bucket counts.
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBucketState {
    pub tokens: f64,
    pub last_refill_ms: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeakyBucketState {
    /// Enqueue timestamps, head first.
    pub queue: VecDeque<u64>,
    pub last_process_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json_shape() {
        let state = LimiterState::TokenBucket(TokenBucketState {
            tokens: 3.0,
            last_refill_ms: 1_000,
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["kind"], "tokenBucket");
        assert_eq!(json["tokens"], 3.0);
        assert_eq!(json["lastRefillMs"], 1_000);

        let state = LimiterState::SlidingCounter(SlidingCounterState {
            buckets: vec![CounterBucket { id: 7, count: 2 }],
        });
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["kind"], "slidingCounter");
        assert_eq!(json["buckets"][0]["id"], 7);
        assert_eq!(json["buckets"][0]["count"], 2);
    }

    #[test]
    fn test_parse_from_server_json() {
        let json = r#"{"kind":"leakyBucket","queue":[10,20],"lastProcessMs":5}"#;
        let state: LimiterState = serde_json::from_str(json).unwrap();
        assert_eq!(state.kind(), AlgorithmKind::LeakyBucket);
        match state {
            LimiterState::LeakyBucket(s) => {
                assert_eq!(s.queue, VecDeque::from(vec![10, 20]));
                assert_eq!(s.last_process_ms, 5);
            }
            other => panic!("unexpected state: {:?}", other),
        }
    }

    #[test]
    fn test_used_capacity() {
        let state = LimiterState::TokenBucket(TokenBucketState {
            tokens: 1.0,
            last_refill_ms: 0,
        });
        assert_eq!(state.used(5), 4.0);

        let state = LimiterState::SlidingCounter(SlidingCounterState {
            buckets: vec![
                CounterBucket { id: 1, count: 2 },
                CounterBucket { id: 2, count: 3 },
            ],
        });
        assert_eq!(state.used(0), 5.0);
    }

    #[test]
    fn test_is_idle() {
        let state = LimiterState::TokenBucket(TokenBucketState {
            tokens: 5.0,
            last_refill_ms: 0,
        });
        assert!(state.is_idle(5));
        assert!(!state.is_idle(6));

        let state = LimiterState::FixedWindow(FixedWindowState {
            window_start_ms: 9,
            count: 0,
        });
        assert!(state.is_idle(0));
    }

    #[test]
    fn test_retry_after_fixed_window() {
        let config = AlgorithmConfig::new(2, 10_000);
        let full = LimiterState::FixedWindow(FixedWindowState {
            window_start_ms: 0,
            count: 2,
        });
        assert_eq!(full.retry_after_ms(&config, 0), 10_000);
        assert_eq!(full.retry_after_ms(&config, 4_000), 6_000);

        let spare = LimiterState::FixedWindow(FixedWindowState {
            window_start_ms: 0,
            count: 1,
        });
        assert_eq!(spare.retry_after_ms(&config, 4_000), 0);
    }

    #[test]
    fn test_retry_after_sliding_log_waits_for_oldest() {
        let config = AlgorithmConfig::new(2, 1_000);
        let state = LimiterState::SlidingLog(SlidingLogState {
            timestamps: VecDeque::from(vec![100, 600]),
        });
        // The 100ms entry is still counted at 1_100 and purged at 1_101.
        assert_eq!(state.retry_after_ms(&config, 700), 401);
    }

    #[test]
    fn test_retry_after_sliding_counter_waits_for_oldest_bucket() {
        let config = AlgorithmConfig::new(2, 1_000).with_bucket_size_ms(100);
        let state = LimiterState::SlidingCounter(SlidingCounterState {
            buckets: vec![
                CounterBucket { id: 3, count: 1 },
                CounterBucket { id: 5, count: 1 },
            ],
        });
        // Bucket 3 is dropped once the current bucket is 14, at 1_400ms.
        assert_eq!(state.retry_after_ms(&config, 550), 850);
    }

    #[test]
    fn test_retry_after_token_bucket_waits_for_one_token() {
        let config = AlgorithmConfig::new(5, 1_000);
        let empty = LimiterState::TokenBucket(TokenBucketState {
            tokens: 0.0,
            last_refill_ms: 1_000,
        });
        assert_eq!(empty.retry_after_ms(&config, 1_050), 150);

        let config = AlgorithmConfig::new(1, 1_000).with_refill_rate(3.0);
        // 333ms at 3/s accrues 0.999 of a token.
        assert_eq!(empty.retry_after_ms(&config, 1_000), 334);
    }

    #[test]
    fn test_retry_after_leaky_bucket_waits_for_one_drain() {
        let config = AlgorithmConfig::new(2, 10_000);
        let full = LimiterState::LeakyBucket(LeakyBucketState {
            queue: VecDeque::from(vec![0, 0]),
            last_process_ms: 0,
        });
        assert_eq!(full.retry_after_ms(&config, 2_000), 3_000);

        let spare = LimiterState::LeakyBucket(LeakyBucketState {
            queue: VecDeque::from(vec![0]),
            last_process_ms: 0,
        });
        assert_eq!(spare.retry_after_ms(&config, 2_000), 0);
    }
}
