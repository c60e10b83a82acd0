//! Error types for backend clients.

use thiserror::Error;

use crate::line_protocol::EncodeError;

/// Errors raised while delivering points to a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The server answered with a non-success status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server rejected the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configured endpoint cannot be used by this client.
    #[error("Unsupported endpoint: {0}")]
    Unsupported(String),

    /// The operation was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl BackendError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BackendError::Cancelled)
    }

    /// Whether the user should be told about this failure.
    ///
    /// Cancelled and timed out deliveries are only logged.
    pub fn should_notify(&self) -> bool {
        !matches!(self, BackendError::Cancelled | BackendError::Timeout)
    }
}

#[cfg(any(feature = "influxdb", feature = "questdb"))]
impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Connection(err.to_string())
        } else {
            BackendError::Http(err.to_string())
        }
    }
}

/// Why a connection test failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TestError {
    #[error("Client is not configured.")]
    NotConfigured,

    #[error("{0}")]
    Unreachable(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The server is up but the storage target (bucket, table) is not usable.
    #[error("{0}")]
    StorageTarget(String),
}

/// Outcome of a connection test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Ok,
    /// Reachable, but something could not be verified.
    Caveat(String),
    Failed(TestError),
    Cancelled,
}

impl ConnectionStatus {
    /// Human readable message, `None` for a clean success.
    pub fn message(&self) -> Option<String> {
        match self {
            ConnectionStatus::Ok => None,
            ConnectionStatus::Caveat(msg) => Some(msg.clone()),
            ConnectionStatus::Failed(err) => Some(err.to_string()),
            ConnectionStatus::Cancelled => Some("Connection test cancelled".to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ConnectionStatus::Ok | ConnectionStatus::Caveat(_))
    }
}
