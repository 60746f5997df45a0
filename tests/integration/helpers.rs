//! Test helpers and utilities

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use ratevis::config::{Config, LimiterConfig, LogFormat, LoggingConfig, ServerConfig, SimulatorConfig};
use ratevis::limiter::AlgorithmKind;
use ratevis::registry::PartitionMode;
use ratevis::server::{AppState, Server, ShutdownHandle};

/// In-process server bound to ephemeral ports
pub struct TestServer {
    pub base_url: String,
    pub internal_url: String,
    pub client: Client,
    pub state: Arc<AppState>,
    shutdown: ShutdownHandle,
}

/// Config used by [`TestServer::start`]: fixed window, 5 per 10s, one global key.
pub fn test_config() -> Config {
    let any_port: SocketAddr = "127.0.0.1:0".parse().unwrap();
    Config {
        server: ServerConfig {
            listen_addr: any_port,
            internal_addr: Some(any_port),
            drain_timeout: Duration::from_secs(1),
            access_log: false,
        },
        limiter: LimiterConfig {
            algorithm: AlgorithmKind::FixedWindow,
            limit: 5,
            window_ms: 10_000,
            bucket_size_ms: 100,
            partition_mode: PartitionMode::Global,
        },
        simulator: SimulatorConfig::default(),
        logging: LoggingConfig {
            filter: "ratevis=warn".into(),
            format: LogFormat::Text,
            service_name: "ratevis-test".into(),
        },
    }
}

#[allow(dead_code)]
impl TestServer {
    /// Start a server with [`test_config`]
    pub async fn start() -> Self {
        Self::start_with(test_config()).await
    }

    pub async fn start_with(config: Config) -> Self {
        let server = Server::bind(config).await.expect("Failed to bind server");
        let base_url = format!("http://{}", server.local_addr());
        let internal_url = format!(
            "http://{}",
            server.internal_addr().expect("internal server not configured")
        );
        let state = server.state();
        let shutdown = server.shutdown_handle();
        tokio::spawn(server.run());

        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url,
            internal_url,
            client,
            state,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request to the server
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    /// GET and parse the body as JSON
    pub async fn get_json(&self, path: &str) -> Value {
        let resp = self.get(path).await;
        assert_status(&resp, StatusCode::OK);
        resp.json().await.expect("Invalid JSON body")
    }

    /// Make a POST request with JSON body
    pub async fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, json: &T) -> Response {
        self.client
            .post(self.url(path))
            .json(json)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a POST request with a raw body
    pub async fn post_raw(&self, path: &str, body: &'static str) -> Response {
        self.client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Make a request to the internal server
    pub async fn internal_get(&self, path: &str) -> Response {
        self.client
            .get(format!("{}{}", self.internal_url, path))
            .send()
            .await
            .expect("Internal GET request failed")
    }

    /// Hit the admission-checked endpoint `n` times and return the statuses
    pub async fn hit(&self, n: usize) -> Vec<StatusCode> {
        let mut statuses = Vec::with_capacity(n);
        for _ in 0..n {
            statuses.push(self.get("/api/test").await.status());
        }
        statuses
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Count how many statuses equal `status`
pub fn count(statuses: &[StatusCode], status: StatusCode) -> usize {
    statuses.iter().filter(|s| **s == status).count()
}

/// Assert that response has expected status
pub fn assert_status(response: &Response, expected: StatusCode) {
    assert_eq!(
        response.status(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Assert that response contains header
pub fn assert_header(response: &Response, name: &str, expected: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert_eq!(value, expected, "Header '{}' mismatch", name);
}

/// Assert that response contains header with prefix
pub fn assert_header_starts_with(response: &Response, name: &str, prefix: &str) {
    let value = response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("Header '{}' not found", name))
        .to_str()
        .unwrap();
    assert!(
        value.starts_with(prefix),
        "Header '{}' expected to start with '{}', got '{}'",
        name,
        prefix,
        value
    );
}

/// Assert that response has header present
pub fn assert_has_header(response: &Response, name: &str) {
    assert!(
        response.headers().contains_key(name),
        "Header '{}' not found",
        name
    );
}
