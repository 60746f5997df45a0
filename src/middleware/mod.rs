//! Middleware pipeline for request/response processing.
//!
//! Middleware can inspect requests, short-circuit the pipeline with an early
//! response (admission denial, CORS preflight) and decorate outgoing
//! responses.
//!
//! # Example
//!
//! ```rust
//! use ratevis::core::{Context, Request, Response};
//! use ratevis::middleware::{Middleware, MiddlewareChain, MiddlewareResult};
//!
//! struct Tagging;
//!
//! impl Middleware for Tagging {
//!     fn name(&self) -> &'static str { "tagging" }
//!
//!     fn on_response(&self, res: Response, _ctx: &Context) -> Response {
//!         res.with_header("x-served-by", "ratevis")
//!     }
//! }
//!
//! let chain = MiddlewareChain::new().add(Tagging);
//! assert_eq!(chain.names(), vec!["tagging"]);
//! ```

mod chain;

pub mod access_log;
pub mod admission;
pub mod cors;

pub use access_log::AccessLogMiddleware;
pub use admission::AdmissionMiddleware;
pub use chain::MiddlewareChain;
pub use cors::CorsMiddleware;

use crate::core::{Context, Request, Response};

/// Result of middleware request processing.
#[derive(Debug)]
pub enum MiddlewareResult {
    /// Continue to the next middleware with the (possibly modified) request.
    Next(Request),
    /// Stop the middleware chain and return this response immediately.
    Stop(Response),
}

impl MiddlewareResult {
    pub fn is_next(&self) -> bool {
        matches!(self, MiddlewareResult::Next(_))
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, MiddlewareResult::Stop(_))
    }

    /// The response if this is a Stop result.
    pub fn into_response(self) -> Option<Response> {
        match self {
            MiddlewareResult::Next(_) => None,
            MiddlewareResult::Stop(res) => Some(res),
        }
    }
}

/// Trait for implementing middleware.
///
/// The pipeline executes `on_request` in priority order and `on_response` in
/// reverse order. `on_response` also runs for responses produced by a
/// short-circuit, so decorators such as CORS see every response.
///
/// ```text
/// Request → MW1.on_request → MW2.on_request → Handler
///                                                ↓
/// Response ← MW1.on_response ← MW2.on_response ←─┘
/// ```
pub trait Middleware: Send + Sync {
    /// Unique name for this middleware (used for logging/debugging).
    fn name(&self) -> &'static str;

    /// Lower values execute first for requests, last for responses.
    ///
    /// - below -100: transport concerns (CORS preflight, access log)
    /// - -100: admission
    /// - 0 and above: request/response decoration
    fn priority(&self) -> i32 {
        0
    }

    fn on_request(&self, req: Request, _ctx: &mut Context) -> MiddlewareResult {
        MiddlewareResult::Next(req)
    }

    fn on_response(&self, res: Response, _ctx: &Context) -> Response {
        res
    }
}
