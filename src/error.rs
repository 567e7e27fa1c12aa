//! Error types for ridb-dl
//!
//! This module provides the error taxonomy for a fetch run:
//! - [`TransportError`] for HTTP failures that survived the retry policy
//! - [`Error`] for everything that can end a run (empty result sets, failed
//!   enrichment lookups, configuration and export failures)
//!
//! Malformed records are deliberately absent: a campsite missing an expected
//! list simply fails the filter clause that needs it.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for ridb-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ridb-dl
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

    /// HTTP request failed after the transport's retry policy gave up
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The paginated resource reported zero total items
    #[error("no results found at {url}")]
    EmptyResult {
        /// The resource URL that was probed
        url: String,
    },

    /// Secondary (facility) lookup failed
    #[error("failed to fetch facility {facility_id}: {source}")]
    EnrichmentFetch {
        /// The parent key whose facility could not be fetched
        facility_id: String,
        /// The underlying transport failure
        #[source]
        source: TransportError,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a configuration error tied to a config key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }

    /// Whether this error represents the "server has nothing" outcome rather than a failure
    pub fn is_empty_result(&self) -> bool {
        matches!(self, Error::EmptyResult { .. })
    }
}

/// HTTP transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Requested URL (without query string)
        url: String,
        /// Whether the status is in the configured retry set
        transient: bool,
        /// Delay requested by the server through `Retry-After`
        retry_after: Option<Duration>,
    },

    /// Connection, timeout or protocol failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Response body was not the expected JSON
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        /// Requested URL
        url: String,
        /// The JSON decoding failure
        #[source]
        source: serde_json::Error,
    },

    /// URL could not be built from the configured base and path
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// HTTP status code, when the failure came from a server response
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
