//! HTTP response abstraction for the middleware chain and API handlers.

use bytes::Bytes;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::Serialize;

static APPLICATION_JSON: HeaderValue = HeaderValue::from_static("application/json");
static TEXT_PLAIN: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");

static NOT_FOUND: Bytes = Bytes::from_static(br#"{"error":"Not Found"}"#);

/// HTTP response.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::new()
    }

    /// 200 with a plain text body.
    #[inline]
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::builder().text().body(body).build()
    }

    /// JSON response with `status`.
    ///
    /// Falls back to a bare 500 if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::builder().status(status).json().body(body).build(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                Self::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    /// 400 with `{"error": msg}`.
    pub fn bad_request(msg: &str) -> Self {
        Self::json(StatusCode::BAD_REQUEST, &serde_json::json!({ "error": msg }))
    }

    #[inline]
    pub fn not_found() -> Self {
        Self::builder()
            .status(StatusCode::NOT_FOUND)
            .json()
            .body(NOT_FOUND.clone())
            .build()
    }

    /// 429 carrying `Retry-After` and a JSON body naming the algorithm.
    pub fn too_many_requests(retry_after_secs: u64, algorithm: &str) -> Self {
        Self::json(
            StatusCode::TOO_MANY_REQUESTS,
            &serde_json::json!({ "error": "Too Many Requests", "algorithm": algorithm }),
        )
        .with_header_value(header::RETRY_AFTER, HeaderValue::from(retry_after_secs))
    }

    #[inline]
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[inline]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    #[inline]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[inline]
    pub fn with_header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header by string name and value; invalid pairs are skipped.
    #[inline]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    #[inline]
    pub fn body_len(&self) -> usize {
        self.body.len()
    }
}

impl From<Response> for http::Response<Bytes> {
    fn from(res: Response) -> Self {
        let mut out = http::Response::new(res.body);
        *out.status_mut() = res.status;
        *out.headers_mut() = res.headers;
        out
    }
}

/// Builder for creating HTTP responses.
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Option<HeaderMap>,
    body: Bytes,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseBuilder {
    #[inline]
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            headers: None,
            body: Bytes::new(),
        }
    }

    #[inline]
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    #[inline]
    pub fn header_value(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers
            .get_or_insert_with(HeaderMap::new)
            .insert(name, value);
        self
    }

    #[inline]
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::try_from(name.as_ref()),
            HeaderValue::try_from(value.as_ref()),
        ) {
            self.headers
                .get_or_insert_with(HeaderMap::new)
                .insert(name, value);
        }
        self
    }

    #[inline]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[inline]
    pub fn json(self) -> Self {
        self.header_value(header::CONTENT_TYPE, APPLICATION_JSON.clone())
    }

    #[inline]
    pub fn text(self) -> Self {
        self.header_value(header::CONTENT_TYPE, TEXT_PLAIN.clone())
    }

    #[inline]
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers.unwrap_or_default(),
            body: self.body,
        }
    }
}
