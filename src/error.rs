//! Error types for chapter-harvest
//!
//! The taxonomy separates conditions that end a run from conditions that are
//! absorbed or recorded:
//! - Fatal: [`Error::StructuralUnavailable`], [`Error::Navigation`], and a
//!   [`Error::StaleReference`] that survived its retry policy
//! - Per-asset: [`TransferError`], recorded against one descriptor and never
//!   propagated out of the acquirer
//!
//! "No assets found" is not an error at all; see [`crate::poller::Readiness`].

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for chapter-harvest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chapter-harvest
#[derive(Debug, Error)]
pub enum Error {
    /// An expected page region never became reachable within the structural deadline
    #[error("page element {element} did not appear within {waited:?}; are we on the right page?")]
    StructuralUnavailable {
        /// Human-readable name of the missing element (e.g. "content_ifr frame")
        element: String,
        /// How long the poller waited before giving up
        waited: Duration,
    },

    /// A handle into rendered content was invalidated by a re-render
    #[error("stale element reference: {0}")]
    StaleReference(String),

    /// A unit reference from an earlier enumeration snapshot was used after navigating
    #[error("unit reference #{ordinal} belongs to an outdated chapter list snapshot")]
    OutdatedUnitRef {
        /// Ordinal of the outdated reference
        ordinal: u32,
    },

    /// Navigating to (or back to) a page failed
    #[error("navigation to {url} failed: {reason}")]
    Navigation {
        /// The URL that could not be loaded
        url: String,
        /// The underlying reason
        reason: String,
    },

    /// The WebDriver endpoint answered with a protocol-level error
    #[error("webdriver error `{code}`: {message}")]
    WebDriver {
        /// W3C error code (e.g. "no such element")
        code: String,
        /// Message reported by the driver
        message: String,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "poll.interval")
        key: Option<String>,
    },

    /// A URL could not be parsed
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Parser message
        reason: String,
    },

    /// Failure to prepare the destination directory of a unit
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::StructuralUnavailable`] for the named element
    pub fn structural(element: impl Into<String>, waited: Duration) -> Self {
        Error::StructuralUnavailable {
            element: element.into(),
            waited,
        }
    }

    /// Whether this error terminates the whole run
    ///
    /// Anything that reaches the pipeline driver as an `Err` aborts the run, but
    /// only these kinds are expected there; the rest indicate a broken session
    /// or environment.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::StructuralUnavailable { .. }
                | Error::Navigation { .. }
                | Error::StaleReference(_)
                | Error::OutdatedUnitRef { .. }
        )
    }

    /// Machine-readable error code, used in the JSON run summary
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::StructuralUnavailable { .. } => "structural_unavailable",
            Error::StaleReference(_) => "stale_reference",
            Error::OutdatedUnitRef { .. } => "outdated_unit_ref",
            Error::Navigation { .. } => "navigation_failure",
            Error::WebDriver { .. } => "webdriver_error",
            Error::Config { .. } => "config_error",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::CreateDir { .. } => "create_dir_failed",
            Error::Io(_) => "io_error",
            Error::Network(_) => "network_error",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

/// Failure to transfer a single asset
///
/// Recorded against one descriptor ordinal; siblings are unaffected.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// The request could not be completed
    #[error("request for {url} failed: {source}")]
    Network {
        /// Requested URL
        url: String,
        /// Underlying client error
        #[source]
        source: reqwest::Error,
    },

    /// The body could not be written to disk
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The descriptor does not carry what this sink needs
    #[error("asset #{ordinal} has no {expected}")]
    WrongKind {
        /// Ordinal of the offending descriptor
        ordinal: usize,
        /// What the sink expected ("URL" or "markup fragment")
        expected: &'static str,
    },
}

impl TransferError {
    /// HTTP status, when the failure was a non-success response
    pub fn status(&self) -> Option<u16> {
        match self {
            TransferError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
