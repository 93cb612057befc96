//! Error types for lingohub
//!
//! Every fallible operation in the crate returns [`Result`]. Transport and parse failures
//! from the collaborators (`reqwest`, `serde_json`, the filesystem) propagate unchanged
//! through the `#[from]` variants; the remaining variants describe the project workflow.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for lingohub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lingohub
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "export.poll_interval")
        key: Option<String>,
    },

    /// A remote record is missing the shape needed to drive the workflow
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse {
        /// The URL whose response could not be interpreted
        url: String,
        /// What was missing or unexpected
        reason: String,
    },

    /// Requested filename is not part of the project's resources
    #[error("project does not contain resource {0}")]
    ResourceNotFound(String),

    /// Local upload source does not exist
    #[error("path {0} does not exist")]
    PathNotFound(PathBuf),

    /// The server reported the export job as failed
    #[error("the export failed with the following error: {details}")]
    ExportFailed {
        /// Error details as supplied by the server
        details: String,
    },

    /// The export job was still processing after the configured number of polls
    #[error("export {export_id} still processing after {attempts} status checks")]
    ExportTimeout {
        /// The export job that never completed
        export_id: String,
        /// Number of status reads performed
        attempts: u32,
    },

    /// An export operation needs an export id, but none was initiated
    #[error("no export has been initiated for this project")]
    ExportNotStarted,

    /// Downloading needs a completed export, but no download URL is known
    #[error("export is not ready for download")]
    ExportNotReady,

    /// A link could not be parsed as an absolute URL
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        /// The offending input
        url: String,
        /// Parser error
        #[source]
        source: url::ParseError,
    },

    /// The server answered with a non-success status
    #[error("HTTP {status} from {url}: {body}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
        /// Response body, as far as it could be read
        body: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive extraction failed
    #[error("extraction failed for {archive}: {reason}")]
    Extraction {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },
}

impl Error {
    /// Build a [`Error::MalformedResponse`] for `url`
    pub(crate) fn malformed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedResponse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if the error was caused by the caller rather than the remote service
    ///
    /// Caller errors can be recovered by fixing the input; everything else aborts the
    /// current workflow.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::ResourceNotFound(_)
                | Error::PathNotFound(_)
                | Error::ExportNotStarted
                | Error::ExportNotReady
                | Error::InvalidUrl { .. }
                | Error::Config { .. }
        )
    }
}
