//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use super::parse::{env_bool, env_parse, env_parse_opt};
use super::ConfigError;

/// Server configuration loaded from environment.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// API listen address (default: 127.0.0.1:3000).
    pub listen_addr: SocketAddr,
    /// Internal server address for /health, /metrics and /config.
    pub internal_addr: Option<SocketAddr>,
    /// Graceful shutdown drain timeout.
    pub drain_timeout: Duration,
    /// Access logging enabled.
    pub access_log: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            listen_addr: env_parse("LISTEN_ADDR", defaults.listen_addr)?,
            internal_addr: env_parse_opt("INTERNAL_ADDR")?,
            drain_timeout: Duration::from_secs(env_parse("DRAIN_TIMEOUT_SECS", 30u64)?),
            access_log: env_bool("ACCESS_LOG", false),
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            internal_addr: None,
            drain_timeout: Duration::from_secs(30),
            access_log: false,
        }
    }
}
