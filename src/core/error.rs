//! Unified error handling for the worker
//!
//! Every fallible operation in the crate returns a `WorkerResult`. Host
//! adapters convert their native errors into `WorkerError` at the seam so
//! the router only has to reason about one taxonomy.

use std::fmt;

use http::StatusCode;

/// Unified error types for the caching worker
#[derive(Debug)]
pub enum WorkerError {
    /// Configuration-related errors
    Configuration(String),

    /// Validation errors
    Validation(String),

    /// The network could not be reached or the transfer failed
    Network(String),

    /// The network answered, but not with a status the caller accepts
    Http { url: String, status: StatusCode },

    /// Cache store failures
    Cache(String),

    /// Requests that can not be expressed (relative URL, bad method, ...)
    InvalidRequest(String),

    /// Lifecycle operation attempted in the wrong state
    InvalidState(String),

    /// Cross-process messaging failures
    Message(String),

    /// JSON encoding or decoding errors
    Serialization(serde_json::Error),

    /// Push subscription errors
    Push(String),

    /// I/O errors
    Io(std::io::Error),

    /// Internal system errors
    Internal(String),
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::Configuration(msg) => write!(f, "Configuration error: {msg}"),
            WorkerError::Validation(msg) => write!(f, "Validation error: {msg}"),
            WorkerError::Network(msg) => write!(f, "Network error: {msg}"),
            WorkerError::Http { url, status } => write!(f, "Unexpected status {status} for {url}"),
            WorkerError::Cache(msg) => write!(f, "Cache error: {msg}"),
            WorkerError::InvalidRequest(msg) => write!(f, "Invalid request: {msg}"),
            WorkerError::InvalidState(msg) => write!(f, "Invalid worker state: {msg}"),
            WorkerError::Message(msg) => write!(f, "Message error: {msg}"),
            WorkerError::Serialization(err) => write!(f, "Serialization error: {err}"),
            WorkerError::Push(msg) => write!(f, "Push error: {msg}"),
            WorkerError::Io(err) => write!(f, "I/O error: {err}"),
            WorkerError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkerError::Serialization(err) => Some(err),
            WorkerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl WorkerError {
    /// Whether the error came from the network layer rather than the store.
    pub fn is_network(&self) -> bool {
        matches!(self, WorkerError::Network(_) | WorkerError::Http { .. })
    }
}

// Error conversions
impl From<std::io::Error> for WorkerError {
    fn from(err: std::io::Error) -> Self {
        WorkerError::Io(err)
    }
}

impl From<serde_json::Error> for WorkerError {
    fn from(err: serde_json::Error) -> Self {
        WorkerError::Serialization(err)
    }
}

impl From<reqwest::Error> for WorkerError {
    fn from(err: reqwest::Error) -> Self {
        WorkerError::Network(err.to_string())
    }
}

impl From<http::Error> for WorkerError {
    fn from(err: http::Error) -> Self {
        WorkerError::InvalidRequest(err.to_string())
    }
}

/// Result type alias for worker operations
pub type WorkerResult<T> = std::result::Result<T, WorkerError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> WorkerResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> WorkerResult<T> {
        self.map_err(|e| WorkerError::Cache(format!("{context}: {e}")))
    }
}

/// Convenience macro for configuration errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::core::WorkerError::Configuration($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::WorkerError::Configuration(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_http_error() {
        let err = WorkerError::Http {
            url: "https://app.test/a.js".to_string(),
            status: StatusCode::NOT_FOUND,
        };
        assert_eq!(
            err.to_string(),
            "Unexpected status 404 Not Found for https://app.test/a.js"
        );
        assert!(err.is_network());
    }

    #[test]
    fn test_with_context() {
        let res: Result<(), &str> = Err("poisoned");
        let err = res.with_context("open store").unwrap_err();
        assert!(matches!(err, WorkerError::Cache(ref m) if m == "open store: poisoned"));
        assert!(!err.is_network());
    }

    #[test]
    fn test_macros() {
        let err = config_error!("bad origin {}", "ftp://x");
        assert_eq!(err.to_string(), "Configuration error: bad origin ftp://x");
        let err = config_error!("no cache_name");
        assert!(matches!(err, WorkerError::Configuration(ref m) if m == "no cache_name"));
    }
}
