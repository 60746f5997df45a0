//! Minimal HTTP client for the ratevis API.
//!
//! Used by the traffic simulator and the mirror session. Built on the
//! hyper-util legacy pooled client; every call returns a [`ClientError`]
//! rather than panicking so transport failures stay local to the caller.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::limiter::{AlgorithmConfig, AlgorithmKind, Decision};
use crate::registry::Snapshot;
use crate::stats::Stats;

/// Pooled HTTP/1 client shared by all API calls.
pub type HttpClient = Client<HttpConnector, Full<Bytes>>;

/// Build a pooled client with short idle timeouts.
pub fn http_client() -> HttpClient {
    let mut connector = HttpConnector::new();
    connector.set_nodelay(true);
    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(30))
        .build(connector)
}

/// Body of a successful `POST /api/algorithm`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SwitchResponse {
    pub success: bool,
    pub algorithm: AlgorithmKind,
    pub config: AlgorithmConfig,
}

#[derive(Debug)]
pub enum ClientError {
    InvalidUri(String),
    Request(hyper_util::client::legacy::Error),
    Body(hyper::Error),
    Status(StatusCode, String),
    Json(serde_json::Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::InvalidUri(uri) => write!(f, "invalid uri: {}", uri),
            ClientError::Request(e) => write!(f, "request failed: {}", e),
            ClientError::Body(e) => write!(f, "failed to read body: {}", e),
            ClientError::Status(status, body) => write!(f, "unexpected status {}: {}", status, body),
            ClientError::Json(e) => write!(f, "invalid json: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Request(e) => Some(e),
            ClientError::Body(e) => Some(e),
            ClientError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Json(err)
    }
}

/// Send one request and collect the full response body.
pub async fn send(
    client: &HttpClient,
    method: Method,
    uri: Uri,
    body: Option<Value>,
) -> Result<(StatusCode, Bytes), ClientError> {
    let mut builder = http::Request::builder().method(method).uri(uri);
    let payload = match body {
        Some(value) => {
            builder = builder.header(http::header::CONTENT_TYPE, "application/json");
            Bytes::from(serde_json::to_vec(&value)?)
        }
        None => Bytes::new(),
    };
    let req = builder
        .body(Full::new(payload))
        .map_err(|e| ClientError::InvalidUri(e.to_string()))?;

    let res = client.request(req).await.map_err(ClientError::Request)?;
    let status = res.status();
    let bytes = res
        .into_body()
        .collect()
        .await
        .map_err(ClientError::Body)?
        .to_bytes();
    Ok((status, bytes))
}

/// Typed client for one ratevis server.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is scheme plus authority, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(http_client(), base_url)
    }

    pub fn with_client(http: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn uri(&self, path: &str) -> Result<Uri, ClientError> {
        let raw = format!("{}{}", self.base_url, path);
        raw.parse().map_err(|_| ClientError::InvalidUri(raw))
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<(StatusCode, Bytes), ClientError> {
        send(&self.http, method, self.uri(path)?, body).await
    }

    async fn call_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        let (status, bytes) = self.call(method, path, body).await?;
        if !status.is_success() {
            return Err(ClientError::Status(
                status,
                String::from_utf8_lossy(&bytes).into_owned(),
            ));
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Authoritative snapshot of the caller's partition.
    pub async fn get_state(&self) -> Result<Snapshot, ClientError> {
        self.call_json(Method::GET, "/api/state", None).await
    }

    pub async fn get_stats(&self) -> Result<Stats, ClientError> {
        self.call_json(Method::GET, "/api/stats", None).await
    }

    /// Hit the admission-checked endpoint. 200 is an allow, 429 a deny.
    pub async fn admit(&self) -> Result<Decision, ClientError> {
        let (status, bytes) = self.call(Method::GET, "/api/test", None).await?;
        match status {
            StatusCode::OK => Ok(Decision::Allow),
            StatusCode::TOO_MANY_REQUESTS => Ok(Decision::Deny),
            other => Err(ClientError::Status(
                other,
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        }
    }

    /// Switch the server's algorithm; `rps_limit` replaces the limit.
    pub async fn switch_algorithm(
        &self,
        algorithm: &str,
        rps_limit: Option<u64>,
    ) -> Result<SwitchResponse, ClientError> {
        let mut body = json!({ "algorithm": algorithm });
        if let Some(limit) = rps_limit {
            body["rpsLimit"] = json!(limit);
        }
        self.call_json(Method::POST, "/api/algorithm", Some(body))
            .await
    }

    pub async fn simulator_start(&self, rps: Option<f64>) -> Result<Value, ClientError> {
        let mut body = json!({ "action": "start" });
        if let Some(rps) = rps {
            body["rps"] = json!(rps);
        }
        self.call_json(Method::POST, "/api/simulator", Some(body))
            .await
    }

    pub async fn simulator_stop(&self) -> Result<Value, ClientError> {
        self.call_json(
            Method::POST,
            "/api/simulator",
            Some(json!({ "action": "stop" })),
        )
        .await
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
