//! Configuration loaded from environment variables.
//!
//! # Example
//!
//! ```rust,no_run
//! use ratevis::config::Config;
//!
//! let config = Config::from_env()?;
//! println!("Listen address: {}", config.server.listen_addr);
//! println!("Algorithm: {}", config.limiter.algorithm);
//! # Ok::<(), ratevis::config::ConfigError>(())
//! ```

mod error;
mod limiter;
mod logging;
mod parse;
mod server;
mod simulator;

pub use error::ConfigError;
pub use limiter::LimiterConfig;
pub use logging::{LogFormat, LoggingConfig};
pub use server::ServerConfig;
pub use simulator::SimulatorConfig;

use serde_json::json;

/// Complete application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub limiter: LimiterConfig,
    pub simulator: SimulatorConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            server: ServerConfig::from_env()?,
            limiter: LimiterConfig::from_env()?,
            simulator: SimulatorConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Print configuration summary to log.
    pub fn log_summary(&self) {
        use tracing::info;

        info!("Configuration loaded:");
        info!("  Listen: {}", self.server.listen_addr);
        if let Some(ref internal) = self.server.internal_addr {
            info!("  Internal server: {}", internal);
        }
        info!(
            "  Algorithm: {} ({} req / {}ms)",
            self.limiter.algorithm, self.limiter.limit, self.limiter.window_ms
        );
        info!("  Partition by: {}", self.limiter.partition_mode.as_str());
        info!(
            "  Simulator target: {}",
            self.simulator.target_for(self.server.listen_addr)
        );
        if self.server.access_log {
            info!("  Access log: enabled");
        }
    }

    /// Static view of the configuration served at `/config`.
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "listenAddr": self.server.listen_addr.to_string(),
            "internalAddr": self.server.internal_addr.map(|a| a.to_string()),
            "drainTimeoutSecs": self.server.drain_timeout.as_secs(),
            "accessLog": self.server.access_log,
            "algorithm": self.limiter.algorithm,
            "limit": self.limiter.limit,
            "windowSizeMs": self.limiter.window_ms,
            "bucketSizeMs": self.limiter.bucket_size_ms,
            "partitionBy": self.limiter.partition_mode.as_str(),
            "simulatorTarget": self.simulator.target_for(self.server.listen_addr),
            "simulatorRps": self.simulator.default_rps,
            "logFilter": self.logging.filter,
            "serviceName": self.logging.service_name,
        })
    }
}
