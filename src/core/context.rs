//! Request context for the middleware chain.

use std::any::Any;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Request-scoped data shared across middleware and handlers.
///
/// Carries client information, timing, response headers to add and a small
/// typed key-value store middleware use to talk to each other.
pub struct Context {
    /// Client IP address.
    pub client_ip: IpAddr,

    /// Request ID, taken from `X-Request-ID` or generated.
    pub request_id: String,

    /// Request start time.
    pub started_at: Instant,

    response_headers: HashMap<String, String>,

    values: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Context {
    #[inline]
    pub fn new(client_ip: IpAddr, request_id: Option<&str>) -> Self {
        let request_id = match request_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => generate_request_id(),
        };

        Self {
            client_ip,
            request_id,
            started_at: Instant::now(),
            response_headers: HashMap::with_capacity(4),
            values: HashMap::new(),
        }
    }

    #[inline]
    pub fn set<T: Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.values.insert(key.to_string(), Box::new(value));
    }

    #[inline]
    pub fn get<T: 'static>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|v| v.downcast_ref())
    }

    #[inline]
    pub fn remove<T: 'static>(&mut self, key: &str) -> Option<T> {
        self.values
            .remove(key)
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Queue a header to be added to whatever response is produced.
    #[inline]
    pub fn set_response_header(&mut self, name: impl Into<String>, value: impl ToString) {
        self.response_headers.insert(name.into(), value.to_string());
    }

    #[inline]
    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.response_headers
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    #[inline]
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_secs_f64() * 1000.0
    }
}

/// Short random request ID (first 12 hex chars of a v4 UUID).
pub fn generate_request_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(12);
    id
}
