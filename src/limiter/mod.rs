//! Authoritative admission algorithms.
//!
//! Five interchangeable state machines share one contract ([`Algorithm`]):
//!
//! - [`FixedWindow`] - counter reset at window boundaries
//! - [`SlidingLog`] - one timestamp per admitted request
//! - [`SlidingCounter`] - per-bucket counts approximating a sliding window
//! - [`TokenBucket`] - tokens refilled at a fixed rate
//! - [`LeakyBucket`] - FIFO queue drained at a fixed rate
//!
//! [`Limiter`] is the tagged wrapper the registry stores; dispatch is a
//! `match` on the variant, never on the shape of the state.
//!
//! Time is passed in explicitly as milliseconds so every algorithm is a pure
//! function of its inputs. Callers obtain `now` from a [`Clock`].
//!
//! # Example
//!
//! ```rust
//! use ratevis::limiter::{Algorithm, AlgorithmConfig, AlgorithmKind, Decision, Limiter};
//!
//! let mut limiter = Limiter::new(AlgorithmKind::FixedWindow, AlgorithmConfig::new(2, 1_000), 0)?;
//! assert_eq!(limiter.admit(0), Decision::Allow);
//! assert_eq!(limiter.admit(0), Decision::Allow);
//! assert_eq!(limiter.admit(0), Decision::Deny);
//! # Ok::<(), ratevis::limiter::LimiterError>(())
//! ```

mod clock;
mod config;
mod error;
mod state;

pub mod fixed_window;
pub mod leaky_bucket;
pub mod sliding_counter;
pub mod sliding_log;
pub mod token_bucket;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AlgorithmConfig, DEFAULT_BUCKET_SIZE_MS, DEFAULT_LIMIT, DEFAULT_WINDOW_MS};
pub use error::LimiterError;
pub use fixed_window::FixedWindow;
pub use leaky_bucket::LeakyBucket;
pub use sliding_counter::SlidingCounter;
pub use sliding_log::SlidingLog;
pub use state::{
    CounterBucket, FixedWindowState, LeakyBucketState, LimiterState, SlidingCounterState,
    SlidingLogState, TokenBucketState,
};
pub use token_bucket::TokenBucket;

pub(crate) use config::units_elapsed;

/// Outcome of one admission check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[inline]
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    #[inline]
    pub fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm selector.
///
/// Canonical wire names are `fixed`, `sliding-log`, `sliding-counter`,
/// `token` and `leaky`; the camelCase names used by browser clients
/// (`fixedWindow`, `tokenBucket`, ...) are accepted as aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    #[serde(rename = "fixed", alias = "fixedWindow")]
    FixedWindow,
    #[serde(rename = "sliding-log", alias = "slidingLog")]
    SlidingLog,
    #[serde(rename = "sliding-counter", alias = "slidingCounter")]
    SlidingCounter,
    #[serde(rename = "token", alias = "tokenBucket")]
    TokenBucket,
    #[serde(rename = "leaky", alias = "leakyBucket")]
    LeakyBucket,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 5] = [
        AlgorithmKind::FixedWindow,
        AlgorithmKind::SlidingLog,
        AlgorithmKind::SlidingCounter,
        AlgorithmKind::TokenBucket,
        AlgorithmKind::LeakyBucket,
    ];

    /// Canonical wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            AlgorithmKind::FixedWindow => "fixed",
            AlgorithmKind::SlidingLog => "sliding-log",
            AlgorithmKind::SlidingCounter => "sliding-counter",
            AlgorithmKind::TokenBucket => "token",
            AlgorithmKind::LeakyBucket => "leaky",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlgorithmKind {
    type Err = LimiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed" | "fixedWindow" => Ok(AlgorithmKind::FixedWindow),
            "sliding-log" | "slidingLog" => Ok(AlgorithmKind::SlidingLog),
            "sliding-counter" | "slidingCounter" => Ok(AlgorithmKind::SlidingCounter),
            "token" | "tokenBucket" => Ok(AlgorithmKind::TokenBucket),
            "leaky" | "leakyBucket" => Ok(AlgorithmKind::LeakyBucket),
            _ => Err(LimiterError::UnknownAlgorithm {
                name: s.to_string(),
            }),
        }
    }
}

/// Contract implemented by every authoritative state machine.
///
/// `admit` and `tick` never fail. Expiry, refill and drain bookkeeping runs on
/// every call so that a denial never freezes stale state; capacity is only
/// consumed when the request is admitted.
pub trait Algorithm: Send + fmt::Debug {
    /// Which algorithm this is.
    fn kind(&self) -> AlgorithmKind;

    /// Configuration the machine was built with.
    fn config(&self) -> &AlgorithmConfig;

    /// Decide one request arriving at `now`.
    fn admit(&mut self, now: u64) -> Decision;

    /// Advance time-driven bookkeeping only. Repeating with the same `now`
    /// is a no-op.
    fn tick(&mut self, now: u64);

    /// Restore construction-time initial values.
    fn reset(&mut self);

    /// Read-only copy of the internal state.
    fn snapshot(&self) -> LimiterState;
}

/// Tagged union over the five state machines.
#[derive(Debug, Clone)]
pub enum Limiter {
    FixedWindow(FixedWindow),
    SlidingLog(SlidingLog),
    SlidingCounter(SlidingCounter),
    TokenBucket(TokenBucket),
    LeakyBucket(LeakyBucket),
}

macro_rules! dispatch {
    ($self:expr, $inner:ident => $body:expr) => {
        match $self {
            Limiter::FixedWindow($inner) => $body,
            Limiter::SlidingLog($inner) => $body,
            Limiter::SlidingCounter($inner) => $body,
            Limiter::TokenBucket($inner) => $body,
            Limiter::LeakyBucket($inner) => $body,
        }
    };
}

impl Limiter {
    /// Build a state machine of `kind`, validating `config` first.
    pub fn new(kind: AlgorithmKind, config: AlgorithmConfig, now: u64) -> Result<Self, LimiterError> {
        config.validate()?;
        Ok(Self::build(kind, config, now))
    }

    /// Build from an already validated config.
    pub(crate) fn build(kind: AlgorithmKind, config: AlgorithmConfig, now: u64) -> Self {
        match kind {
            AlgorithmKind::FixedWindow => Limiter::FixedWindow(FixedWindow::build(config, now)),
            AlgorithmKind::SlidingLog => Limiter::SlidingLog(SlidingLog::build(config, now)),
            AlgorithmKind::SlidingCounter => {
                Limiter::SlidingCounter(SlidingCounter::build(config, now))
            }
            AlgorithmKind::TokenBucket => Limiter::TokenBucket(TokenBucket::build(config, now)),
            AlgorithmKind::LeakyBucket => Limiter::LeakyBucket(LeakyBucket::build(config, now)),
        }
    }
}

impl Algorithm for Limiter {
    fn kind(&self) -> AlgorithmKind {
        dispatch!(self, l => l.kind())
    }

    fn config(&self) -> &AlgorithmConfig {
        dispatch!(self, l => l.config())
    }

    fn admit(&mut self, now: u64) -> Decision {
        dispatch!(self, l => l.admit(now))
    }

    fn tick(&mut self, now: u64) {
        dispatch!(self, l => l.tick(now))
    }

    fn reset(&mut self) {
        dispatch!(self, l => l.reset())
    }

    fn snapshot(&self) -> LimiterState {
        dispatch!(self, l => l.snapshot())
    }
}
