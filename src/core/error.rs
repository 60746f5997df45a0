//! Core error types.

use std::fmt;

/// Errors raised while turning an HTTP request into a handler call.
#[derive(Debug)]
pub enum Error {
    /// Request is malformed in a way the handler cannot recover from.
    InvalidRequest(String),

    /// Request body is not valid JSON for the expected shape.
    InvalidJson(serde_json::Error),

    /// Response could not be assembled.
    Http(http::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            Error::InvalidJson(e) => write!(f, "invalid JSON body: {}", e),
            Error::Http(e) => write!(f, "HTTP error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidJson(e) => Some(e),
            Error::Http(e) => Some(e),
            Error::InvalidRequest(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::InvalidJson(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Error::Http(e)
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidRequest("empty body".to_string());
        assert_eq!(err.to_string(), "invalid request: empty body");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();

        assert!(matches!(err, Error::InvalidJson(_)));
        assert!(err.to_string().starts_with("invalid JSON body"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
