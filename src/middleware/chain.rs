//! Middleware chain for composing multiple middleware.

use std::future::Future;
use std::sync::Arc;

use super::{Middleware, MiddlewareResult};
use crate::core::{Context, Request, Response};

/// Middleware sorted by priority: lowest first for requests, reverse for
/// responses.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a middleware; the chain is re-sorted by priority.
    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self.middlewares.sort_by_key(|m| m.priority());
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Middleware names in execution order.
    pub fn names(&self) -> Vec<&'static str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub fn process_request(&self, mut req: Request, ctx: &mut Context) -> MiddlewareResult {
        for mw in &self.middlewares {
            match mw.on_request(req, ctx) {
                MiddlewareResult::Next(r) => req = r,
                MiddlewareResult::Stop(res) => {
                    tracing::debug!(
                        middleware = mw.name(),
                        status = %res.status(),
                        "middleware short-circuited request"
                    );
                    return MiddlewareResult::Stop(res);
                }
            }
        }
        MiddlewareResult::Next(req)
    }

    pub fn process_response(&self, mut res: Response, ctx: &Context) -> Response {
        for mw in self.middlewares.iter().rev() {
            res = mw.on_response(res, ctx);
        }
        res
    }

    /// Run request middleware, the async handler (unless short-circuited),
    /// then response middleware.
    pub async fn process_async<F, Fut>(
        &self,
        req: Request,
        ctx: &mut Context,
        handler: F,
    ) -> Response
    where
        F: FnOnce(Request, &mut Context) -> Fut,
        Fut: Future<Output = Response>,
    {
        let req = match self.process_request(req, ctx) {
            MiddlewareResult::Next(req) => req,
            MiddlewareResult::Stop(res) => return self.process_response(res, ctx),
        };

        let res = handler(req, ctx).await;
        self.process_response(res, ctx)
    }
}
