//! Limiter configuration: the algorithm installed at startup.

use crate::limiter::{
    AlgorithmConfig, AlgorithmKind, LimiterError, DEFAULT_BUCKET_SIZE_MS, DEFAULT_LIMIT,
    DEFAULT_WINDOW_MS,
};
use crate::registry::PartitionMode;

use super::parse::{env_or, env_parse};
use super::ConfigError;

#[derive(Clone, Debug)]
pub struct LimiterConfig {
    pub algorithm: AlgorithmKind,
    pub limit: u64,
    pub window_ms: u64,
    pub bucket_size_ms: u64,
    pub partition_mode: PartitionMode,
}

impl LimiterConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let algorithm = env_parse("ALGORITHM", AlgorithmKind::FixedWindow)?;
        let partition_mode = parse_partition_mode(&env_or("PARTITION_BY", "ip"))?;

        let config = Self {
            algorithm,
            limit: env_parse("RATE_LIMIT", DEFAULT_LIMIT)?,
            window_ms: env_parse("RATE_WINDOW_MS", DEFAULT_WINDOW_MS)?,
            bucket_size_ms: env_parse("BUCKET_SIZE_MS", DEFAULT_BUCKET_SIZE_MS)?,
            partition_mode,
        };

        config
            .algorithm_config()
            .validate()
            .map_err(|source| ConfigError::Limiter {
                key: env_key_for(&source),
                source,
            })?;

        Ok(config)
    }

    /// Full algorithm parameters derived from limit and window.
    pub fn algorithm_config(&self) -> AlgorithmConfig {
        AlgorithmConfig::new(self.limit, self.window_ms).with_bucket_size_ms(self.bucket_size_ms)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            algorithm: AlgorithmKind::FixedWindow,
            limit: DEFAULT_LIMIT,
            window_ms: DEFAULT_WINDOW_MS,
            bucket_size_ms: DEFAULT_BUCKET_SIZE_MS,
            partition_mode: PartitionMode::PerClient,
        }
    }
}

fn parse_partition_mode(value: &str) -> Result<PartitionMode, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "ip" | "client" => Ok(PartitionMode::PerClient),
        "global" => Ok(PartitionMode::Global),
        other => Err(ConfigError::Invalid {
            key: "PARTITION_BY".into(),
            message: format!("expected 'ip' or 'global', got '{}'", other),
        }),
    }
}

/// Variable that feeds the rejected field; the rates derive from the limit.
fn env_key_for(err: &LimiterError) -> &'static str {
    match err {
        LimiterError::InvalidConfig {
            field: "windowSizeMs", ..
        } => "RATE_WINDOW_MS",
        LimiterError::InvalidConfig {
            field: "bucketSizeMs", ..
        } => "BUCKET_SIZE_MS",
        _ => "RATE_LIMIT",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_for_field() {
        let bad = |field| LimiterError::InvalidConfig {
            field,
            value: "0".into(),
        };
        assert_eq!(env_key_for(&bad("windowSizeMs")), "RATE_WINDOW_MS");
        assert_eq!(env_key_for(&bad("bucketSizeMs")), "BUCKET_SIZE_MS");
        assert_eq!(env_key_for(&bad("maxTokens")), "RATE_LIMIT");
    }

    #[test]
    fn test_partition_mode_parse() {
        assert_eq!(parse_partition_mode("ip").unwrap(), PartitionMode::PerClient);
        assert_eq!(parse_partition_mode("GLOBAL").unwrap(), PartitionMode::Global);
        assert!(parse_partition_mode("user").is_err());
    }

    #[test]
    fn test_default_algorithm_config() {
        let config = LimiterConfig::default().algorithm_config();
        assert_eq!(config, AlgorithmConfig::default());
    }
}
