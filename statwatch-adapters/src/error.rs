//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when reading from a source or cache.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Reading or writing a file failed.
    #[error("Read error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize JSON.
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The source has not produced any data yet.
    #[error("Source not loaded yet: {0}")]
    NotLoaded(String),
}
