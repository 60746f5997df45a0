//! Limiter error types.

use std::fmt;

/// Errors raised when selecting or constructing a limiter.
///
/// A denied request is not an error; it is a [`Decision::Deny`](super::Decision::Deny).
#[derive(Debug, Clone, PartialEq)]
pub enum LimiterError {
    /// Algorithm name not recognised by the registry.
    UnknownAlgorithm { name: String },
    /// A numeric parameter is zero, negative, not finite or otherwise out of range.
    InvalidConfig { field: &'static str, value: String },
}

impl LimiterError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString) -> Self {
        LimiterError::InvalidConfig {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for LimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimiterError::UnknownAlgorithm { name } => {
                write!(f, "unknown rate limiting algorithm: '{}'", name)
            }
            LimiterError::InvalidConfig { field, value } => {
                write!(f, "invalid limiter config: {} out of range (got {})", field, value)
            }
        }
    }
}

impl std::error::Error for LimiterError {}
