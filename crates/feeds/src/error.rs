//! Feed Error Types

use alerting::SnapshotError;
use thiserror::Error;

/// Errors that can occur while fetching a feed
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout, or body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// Body did not match the expected shape
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

impl From<SnapshotError> for FetchError {
    fn from(err: SnapshotError) -> Self {
        FetchError::Malformed(err.to_string())
    }
}
