//! Error types for rank-dl
//!
//! Two layers of failure exist:
//! - [`Error`] is pipeline-level. Anything returned as `Error` from the run loop is fatal
//!   and triggers the snapshot boundary.
//! - [`FetchError`] is task-level. It is produced by a single binary fetch, classified via
//!   [`IsRetryable`](crate::retry::IsRetryable), and absorbed by the worker that issued it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rank-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rank-dl
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "thread_num")
        key: Option<String>,
    },

    /// Network error while talking to the ranking endpoint
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error (ranking payloads, snapshot files)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The ranking endpoint answered with a non-success status
    #[error("ranking API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// A continuation URL could not be turned into a ranking query
    #[error("invalid continuation url: {0}")]
    InvalidContinuation(String),

    /// A ranked work produced a URL that cannot back a download task
    #[error("invalid download task: {0}")]
    InvalidTask(String),

    /// Reading or writing the seen-set snapshot failed
    #[error("snapshot error at {path}: {reason}")]
    Snapshot {
        /// Snapshot file location
        path: PathBuf,
        /// What went wrong
        reason: String,
    },

    /// The worker pool could not be constructed or was torn down unexpectedly
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Machine-readable error code, used as a structured logging field
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
            Error::Api { .. } => "api_error",
            Error::InvalidContinuation(_) => "invalid_continuation",
            Error::InvalidTask(_) => "invalid_task",
            Error::Snapshot { .. } => "snapshot_error",
            Error::WorkerPool(_) => "worker_pool_error",
        }
    }
}

/// Categorized failure of a single binary fetch
///
/// The retry loop matches on the category instead of treating every failure alike.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request timed out
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established
    #[error("connection failed: {0}")]
    Connect(String),

    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The response body could not be read completely
    #[error("failed to read response body: {0}")]
    Body(String),

    /// The fetched bytes could not be written to disk
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            FetchError::Body(e.to_string())
        }
    }
}
