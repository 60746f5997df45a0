//! CORS middleware.
//!
//! The dashboard is served from another origin, so every response allows any
//! origin and preflight requests are answered directly.

use http::{Method, StatusCode};

use crate::core::{Context, Request, Response};

use super::{Middleware, MiddlewareResult};

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type";

#[derive(Debug, Default)]
pub struct CorsMiddleware;

impl CorsMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    fn priority(&self) -> i32 {
        -120
    }

    fn on_request(&self, req: Request, _ctx: &mut Context) -> MiddlewareResult {
        if req.method() == Method::OPTIONS {
            let res = Response::empty(StatusCode::NO_CONTENT)
                .with_header("Access-Control-Allow-Methods", ALLOW_METHODS)
                .with_header("Access-Control-Allow-Headers", ALLOW_HEADERS)
                .with_header("Access-Control-Max-Age", "86400");
            return MiddlewareResult::Stop(res);
        }
        MiddlewareResult::Next(req)
    }

    fn on_response(&self, res: Response, _ctx: &Context) -> Response {
        res.with_header("Access-Control-Allow-Origin", "*")
    }
}
