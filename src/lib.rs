//! ratevis - rate-limiting admission engine with a live HTTP API.
//!
//! Five interchangeable algorithms decide whether each request on a guarded
//! endpoint is admitted. The active algorithm can be swapped at runtime and
//! its internal state inspected, which makes the crate useful both as a
//! library and as a teaching server for visualising rate limiters.
//!
//! # Features
//!
//! - **Algorithms**: fixed window, sliding log, sliding counter, token bucket,
//!   leaky bucket
//! - **Hot swap**: `POST /api/algorithm` replaces the limiter and resets stats
//!   in one step
//! - **Introspection**: tagged state snapshots and per-second stats history
//! - **Traffic simulator**: fires requests at a configurable rate
//! - **Client mirror**: predictive limiter reconciled from server snapshots
//! - **Observability**: structured logging and Prometheus metrics
//!
//! # Example
//!
//! ```rust
//! use ratevis::limiter::{AlgorithmConfig, AlgorithmKind, Decision};
//! use ratevis::registry::PartitionMode;
//! use ratevis::Engine;
//!
//! let engine = Engine::with_system_clock(
//!     AlgorithmKind::FixedWindow,
//!     AlgorithmConfig::new(5, 10_000),
//!     PartitionMode::Global,
//! )?;
//! let snapshot = engine.switch_to("token", Some(3))?;
//! assert_eq!(snapshot.algorithm, AlgorithmKind::TokenBucket);
//! assert_eq!(engine.stats().allowed, 0);
//! # Ok::<(), ratevis::limiter::LimiterError>(())
//! ```

/// Package version from Cargo.toml
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (8 chars), empty when built outside a git checkout
pub const BUILD_VERSION: &str = env!("BUILD_VERSION");

/// Full version string: "0.1.0 (abc12345)"
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_VERSION"), ")");

pub mod client;
pub mod config;
pub mod core;
pub mod engine;
pub mod limiter;
pub mod logging;
pub mod middleware;
pub mod mirror;
pub mod observability;
pub mod registry;
pub mod server;
pub mod simulator;
pub mod stats;

// Re-exports for convenience
pub use config::Config;
pub use engine::Engine;
pub use server::Server;
