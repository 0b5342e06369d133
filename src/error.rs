//! Error types for foreclosure-export
//!
//! Two layers of errors exist:
//! - [`FetchError`] describes a single failed page. The coordinator logs it and moves on,
//!   so it never aborts a run.
//! - [`Error`] is the crate-wide error for everything that does stop a run: invalid
//!   configuration, an unusable output sink, or cancellation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for foreclosure-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for foreclosure-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "pagination.page_size")
        key: Option<String>,
    },

    /// The output directory or file could not be created
    #[error("cannot create output sink {}: {source}", .path.display())]
    Sink {
        /// Path that could not be created
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV serialization error that could not be isolated to a single row
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP client could not be constructed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The run was cancelled before all pages were fetched
    #[error("export cancelled before all pages were fetched")]
    Cancelled,
}

impl Error {
    /// Shorthand for a [`Error::Config`] tied to a configuration key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// A single page that could not be fetched
///
/// Carries the page offset so the failure can be logged against the slice of data it lost.
#[derive(Debug, Error)]
#[error("failed to fetch page at offset {offset}: {kind}")]
pub struct FetchError {
    /// Offset of the page that failed
    pub offset: u64,
    /// What went wrong
    #[source]
    pub kind: FetchErrorKind,
}

impl FetchError {
    /// Attach an offset to a failure
    pub fn new(offset: u64, kind: FetchErrorKind) -> Self {
        Self { offset, kind }
    }
}

/// Cause of a [`FetchError`]
#[derive(Debug, Error)]
pub enum FetchErrorKind {
    /// The request could not be sent or no response arrived (connect failure, timeout)
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The service answered with a non-success HTTP status
    #[error("status code {0}")]
    Status(u16),

    /// The response body could not be read
    #[error("failed to read response body: {0}")]
    Body(#[source] reqwest::Error),

    /// The response body was not a valid query result
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The service answered 200 with an error object in the body
    #[error("service error {code}: {message}")]
    Service {
        /// Error code reported by the service
        code: i64,
        /// Error message reported by the service
        message: String,
    },
}
