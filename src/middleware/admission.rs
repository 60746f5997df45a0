//! Admission middleware.
//!
//! Runs the active limiter for the caller's partition on guarded paths and
//! turns a denial into a 429. This is the only writer of [`Stats`].
//!
//! [`Stats`]: crate::stats::Stats

use std::sync::Arc;

use crate::core::{Context, Request, Response};
use crate::engine::Engine;
use crate::observability::Metrics;

use super::{Middleware, MiddlewareResult};

/// Paths that go through admission by default.
pub const GUARDED_PATHS: &[&str] = &["/api/test", "/simulated"];

/// Context key holding the partition the request was admitted under.
pub const PARTITION_KEY: &str = "partition";

/// `Retry-After` seconds for a wait of `ms`, rounded up and at least one.
#[inline]
fn retry_after_secs(ms: u64) -> u64 {
    ms.div_ceil(1000).max(1)
}

pub struct AdmissionMiddleware {
    engine: Arc<Engine>,
    metrics: Option<Arc<Metrics>>,
    guarded: &'static [&'static str],
}

impl AdmissionMiddleware {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            metrics: None,
            guarded: GUARDED_PATHS,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_guarded_paths(mut self, paths: &'static [&'static str]) -> Self {
        self.guarded = paths;
        self
    }

    #[inline]
    fn is_guarded(&self, path: &str) -> bool {
        self.guarded.contains(&path)
    }
}

impl Middleware for AdmissionMiddleware {
    fn name(&self) -> &'static str {
        "admission"
    }

    fn priority(&self) -> i32 {
        -100
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        if !self.is_guarded(req.path()) {
            return MiddlewareResult::Next(req);
        }

        let key = self.engine.partition_for(ctx.client_ip);
        let now = self.engine.now();
        let (decision, kind, limit, retry_after_ms) = {
            let mut state = self.engine.lock();
            let decision = state.admit(&key, now);
            let retry_after_ms = if decision.is_allowed() {
                0
            } else {
                state.registry.retry_after_ms(&key, now)
            };
            (
                decision,
                state.registry.kind(),
                state.registry.config().limit,
                retry_after_ms,
            )
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_admission(kind, decision);
        }

        ctx.set_response_header("X-RateLimit-Algorithm", kind);
        ctx.set_response_header("X-RateLimit-Limit", limit);
        ctx.set(PARTITION_KEY, key.to_string());

        if decision.is_allowed() {
            MiddlewareResult::Next(req)
        } else {
            tracing::debug!(
                partition = %key,
                algorithm = %kind,
                path = req.path(),
                retry_after_ms,
                "Request denied"
            );
            MiddlewareResult::Stop(Response::too_many_requests(
                retry_after_secs(retry_after_ms),
                kind.as_str(),
            ))
        }
    }
}
