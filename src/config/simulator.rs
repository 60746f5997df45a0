//! Traffic simulator configuration.

use std::net::SocketAddr;

use super::parse::{env_opt, env_parse};
use super::ConfigError;
use crate::simulator::TrafficSimulator;

pub const DEFAULT_RPS: f64 = 5.0;

#[derive(Clone, Debug)]
pub struct SimulatorConfig {
    /// URL each simulated request hits. Unset means `/simulated` on the
    /// address the API server actually bound.
    pub target: Option<String>,
    /// Rate used when a start request does not name one.
    pub default_rps: f64,
}

impl SimulatorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_rps = env_parse("SIMULATOR_RPS", DEFAULT_RPS)?;
        if let Err(e) = TrafficSimulator::interval_for(default_rps) {
            return Err(ConfigError::Invalid {
                key: "SIMULATOR_RPS".into(),
                message: e.to_string(),
            });
        }

        Ok(Self {
            target: env_opt("SIMULATOR_TARGET"),
            default_rps,
        })
    }

    /// Effective target for a server listening on `listen_addr`.
    pub fn target_for(&self, listen_addr: SocketAddr) -> String {
        self.target
            .clone()
            .unwrap_or_else(|| default_target(listen_addr))
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            target: None,
            default_rps: DEFAULT_RPS,
        }
    }
}

fn default_target(addr: SocketAddr) -> String {
    // an unspecified bind address is not a valid request target
    let host = if addr.ip().is_unspecified() {
        SocketAddr::from(([127, 0, 0, 1], addr.port()))
    } else {
        addr
    };
    format!("http://{}/simulated", host)
}
