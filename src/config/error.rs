//! Errors raised while reading configuration from the environment.

use std::fmt;

use crate::limiter::LimiterError;

#[derive(Debug)]
pub enum ConfigError {
    /// Variable is set but does not parse as the expected type.
    Parse {
        key: String,
        value: String,
        error: String,
    },
    /// Variable parses but the value is not allowed.
    Invalid { key: String, message: String },
    /// Limiter parameters built from the environment were rejected.
    Limiter { key: &'static str, source: LimiterError },
}

impl ConfigError {
    /// Environment variable the error is about.
    pub fn key(&self) -> &str {
        match self {
            ConfigError::Parse { key, .. } | ConfigError::Invalid { key, .. } => key,
            ConfigError::Limiter { key, .. } => key,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Parse { key, value, error } => {
                write!(f, "{}='{}' does not parse: {}", key, value, error)
            }
            ConfigError::Invalid { key, message } => write!(f, "{}: {}", key, message),
            ConfigError::Limiter { key, source } => write!(f, "{}: {}", key, source),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Limiter { source, .. } => Some(source),
            _ => None,
        }
    }
}
