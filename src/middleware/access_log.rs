//! Access logging middleware.
//!
//! Emits one structured INFO event per request with target `access`.

use crate::core::{Context, Request, Response};

use super::admission::PARTITION_KEY;
use super::{Middleware, MiddlewareResult};

pub struct AccessLogMiddleware {
    enabled: bool,
}

impl AccessLogMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Default for AccessLogMiddleware {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Middleware for AccessLogMiddleware {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn priority(&self) -> i32 {
        -110
    }

    fn on_request(&self, req: Request, ctx: &mut Context) -> MiddlewareResult {
        if self.enabled {
            ctx.set("log_method", req.method().to_string());
            ctx.set("log_path", req.path().to_string());
            if let Some(ua) = req.user_agent() {
                ctx.set("log_ua", ua.to_string());
            }
        }
        MiddlewareResult::Next(req)
    }

    fn on_response(&self, res: Response, ctx: &Context) -> Response {
        if !self.enabled {
            return res;
        }

        let method = ctx.get::<String>("log_method").map(String::as_str).unwrap_or("?");
        let path = ctx.get::<String>("log_path").map(String::as_str).unwrap_or("?");
        let ua = ctx.get::<String>("log_ua").map(String::as_str);
        let partition = ctx.get::<String>(PARTITION_KEY).map(String::as_str);
        let status = res.status().as_u16();

        tracing::info!(
            target: "access",
            method = method,
            path = path,
            status = status,
            bytes = res.body_len() as u64,
            duration_ms = ctx.elapsed_ms(),
            ip = %ctx.client_ip,
            ua = ua,
            partition = partition,
            request_id = %ctx.request_id,
            "{} {} {}",
            method,
            path,
            status
        );

        res
    }
}
