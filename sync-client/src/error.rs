//! Sync engine error types

use thiserror::Error;

/// Sync engine error type
///
/// Everything here is non-fatal by design: failures are caught at the
/// session boundary and surfaced to the view, never allowed to take the
/// process down.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Pull request failed (network error or non-success status)
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// Push connection is down; sessions keep operating in pull-only mode
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Push payload missing required fields; dropped and counted
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    /// Invalid wire frame
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Transport I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        SyncError::FetchFailed(err.to_string())
    }
}

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
