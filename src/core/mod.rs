//! Core types for HTTP request/response handling.
//!
//! - [`Request`] - buffered HTTP request with JSON body helpers
//! - [`Response`] - HTTP response with builder
//! - [`Context`] - request context for middleware communication
//! - [`Error`] - core error types
//!
//! # Example
//!
//! ```rust
//! use ratevis::core::{Context, Response};
//! use std::net::{IpAddr, Ipv4Addr};
//!
//! let mut ctx = Context::new(IpAddr::V4(Ipv4Addr::LOCALHOST), None);
//! ctx.set_response_header("X-RateLimit-Algorithm", "fixed");
//!
//! let res = Response::json(http::StatusCode::OK, &serde_json::json!({ "ok": true }));
//! assert_eq!(res.status(), 200);
//! ```

mod context;
mod error;
mod request;
mod response;

pub use context::{generate_request_id, Context};
pub use error::{Error, Result};
pub use request::Request;
pub use response::{Response, ResponseBuilder};
