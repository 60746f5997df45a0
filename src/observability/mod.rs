//! Observability: Prometheus metrics.
//!
//! Structured logging lives in [`crate::logging`]; this module only owns the
//! metrics registry served by the internal server.
//!
//! ```rust
//! use ratevis::limiter::{AlgorithmKind, Decision};
//! use ratevis::observability::Metrics;
//!
//! let metrics = Metrics::new()?;
//! metrics.record_admission(AlgorithmKind::FixedWindow, Decision::Deny);
//! assert!(metrics.export().contains("ratevis_admissions_total"));
//! # Ok::<(), prometheus::Error>(())
//! ```

pub mod metrics;

pub use metrics::Metrics;
