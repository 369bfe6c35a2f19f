//! Error types for lofi-gen
//!
//! This module provides the error taxonomy for the library:
//! - [`Error`] is the crate-wide error used by configuration, polling and I/O
//! - [`SubmitError`] keeps provider rejections apart from transport failures
//! - [`DownloadError`] describes why a single artifact could not be persisted

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for lofi-gen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lofi-gen
///
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.interval")
        key: Option<String>,
    },

    /// Network or HTTP failure talking to the provider
    #[error("transport error: {message}")]
    Transport {
        /// HTTP status code, when a response was received
        status: Option<u16>,
        /// Raw response body, when one could be read
        body: Option<String>,
        /// Description of the failure
        message: String,
    },

    /// Provider reported completion without enough usable artifacts
    #[error("provider reported completion with {usable} usable artifacts, {required} required")]
    ExtractionAmbiguity {
        /// Number of artifacts with a usable source URL
        usable: usize,
        /// Configured minimum
        required: usize,
    },

    /// Wait budget exhausted before a terminal status was observed
    #[error("no terminal status after {waited:?}")]
    Timeout {
        /// How long the poller waited
        waited: Duration,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Outcome of a failed creation call
///
/// A rejection is a well-formed answer from the provider (bad input, quota,
/// auth) and is never conflated with a transport failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Provider accepted the HTTP exchange but refused the job
    #[error("rejected by provider: {message}")]
    Rejected {
        /// Provider-supplied message
        message: String,
    },

    /// Network failure, 5xx status, 4xx without a structured body, or unreadable response
    #[error("{}", transport_summary(.status, .message))]
    Transport {
        /// HTTP status code, when a response was received
        status: Option<u16>,
        /// Raw response body, when available
        body: Option<String>,
        /// Description of the failure
        message: String,
    },
}

fn transport_summary(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}: {}", code, message),
        None => format!("request failed: {}", message),
    }
}

/// Artifact download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Source answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Http {
        /// Artifact source URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// Connection failed or the byte stream ended early
    #[error("transfer of {url} failed: {message}")]
    Transfer {
        /// Artifact source URL
        url: String,
        /// Description of the failure
        message: String,
        /// Whether the underlying failure was a timeout or connect error
        transient: bool,
    },

    /// Destination already exists and the collision policy is `fail`
    #[error("destination {path} already exists")]
    Collision {
        /// The existing destination path
        path: PathBuf,
    },

    /// Filesystem failure while writing or renaming
    #[error("failed to write {path}: {source}")]
    Io {
        /// Path being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Suggested name cannot be used as a file name
    #[error("invalid artifact file name {name:?}")]
    InvalidName {
        /// The rejected name
        name: String,
    },
}
