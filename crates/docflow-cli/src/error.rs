//! Error types for the Docflow CLI
//!
//! Two layers live here:
//!
//! - [`CliError`]: command-level failures with user-facing, actionable messages.
//! - The per-record taxonomy ([`ValidationError`], [`TransportError`],
//!   [`RecordError`]): the reasons a single file can end up in `Error`.

use crate::progress::format_bytes;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Comprehensive error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// API server communication failed
    #[error("Server error: {0}. Ensure the processing server is running and reachable (check DOCFLOW_SERVER_URL).")]
    Api(String),

    /// Required file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// The submission was rejected before anything was uploaded
    #[error("Submission rejected: {0}")]
    Validation(#[from] ValidationError),

    /// Nothing in the submission passed validation
    #[error("No files to upload. All {0} file(s) were rejected during validation.")]
    NothingToUpload(usize),

    /// One or more records ended in Error
    #[error("{failed} of {total} file(s) failed. See the summary above for details.")]
    BatchFailed { failed: usize, total: usize },

    /// Status query failed
    #[error("Status query failed: {0}")]
    Transport(#[from] TransportError),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("Network request failed: {0}. Check your internet connection and server URL.")]
    Http(#[from] reqwest::Error),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your DOCFLOW_* environment variables.")]
    Config(String),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Generic anyhow error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    /// Create an API error
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A local rejection. Never reaches the network.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{file}' has unsupported type '{content_type}' (accepted: {accepted})")]
    UnsupportedType {
        file: String,
        content_type: String,
        accepted: String,
    },

    #[error("'{file}' is {}, above the {} limit", format_bytes(*.size), format_bytes(*.max))]
    TooLarge { file: String, size: u64, max: u64 },

    #[error("'{file}' is empty")]
    Empty { file: String },

    #[error("too many files: {registered} already registered plus {submitted} submitted exceeds the limit of {max} (first file over the limit: '{first_offending}')")]
    TooManyFiles {
        registered: usize,
        submitted: usize,
        max: usize,
        first_offending: String,
    },
}

// ============================================================================
// Transport
// ============================================================================

/// Class of a failed request, derived from the response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Network,
    Timeout,
    AuthenticationRequired,
    PayloadTooLarge,
    MalformedRequest,
    Server,
}

/// A failed call to the intake or status endpoint
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status. `detail` is the server's own
    /// message, if it sent one.
    pub fn from_status(status: u16, detail: Option<&str>) -> Self {
        let suffix = detail
            .filter(|d| !d.trim().is_empty())
            .map(|d| format!(": {}", d.trim()))
            .unwrap_or_default();

        match status {
            401 | 403 => Self::new(
                TransportErrorKind::AuthenticationRequired,
                format!("Authentication required (HTTP {status}){suffix}. Sign in again or check DOCFLOW_TOKEN, then resubmit."),
            ),
            413 => Self::new(
                TransportErrorKind::PayloadTooLarge,
                format!("Upload too large (HTTP 413){suffix}. Submit fewer or smaller files."),
            ),
            400 | 422 => Self::new(
                TransportErrorKind::MalformedRequest,
                format!("The server rejected the request as malformed (HTTP {status}){suffix}"),
            ),
            408 | 504 => Self::new(
                TransportErrorKind::Timeout,
                format!("The server timed out handling the request (HTTP {status}){suffix}"),
            ),
            _ => Self::new(
                TransportErrorKind::Server,
                format!("Server error (HTTP {status}){suffix}"),
            ),
        }
    }

    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::new(
                TransportErrorKind::Timeout,
                format!("Request timed out: {err}"),
            );
        }
        if let Some(status) = err.status() {
            return Self::from_status(status.as_u16(), None);
        }
        if err.is_decode() || err.is_body() {
            return Self::new(
                TransportErrorKind::Server,
                format!("Unexpected response from server: {err}"),
            );
        }
        Self::new(
            TransportErrorKind::Network,
            format!("Could not reach the server: {err}"),
        )
    }
}

// ============================================================================
// Per-record outcome
// ============================================================================

/// Why a record ended in `Error`. Terminal in every case.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// The upload transaction failed as a whole
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The intake endpoint refused this particular file
    #[error("Upload rejected: {0}")]
    Rejected(String),

    /// The intake response had no entry at this file's position
    #[error("The server reported no result for '{0}'")]
    MissingResult(String),

    /// The content could not be read from disk before upload
    #[error("Could not read file: {0}")]
    Unreadable(String),

    /// The remote pipeline reported its terminal failure phase
    #[error("{0}")]
    RemoteProcessing(String),

    /// The local attempt ceiling ran out before a terminal phase
    #[error("Processing timed out after {attempts} status checks ({}s){}", .elapsed.as_secs(), last_error_suffix(.last_error))]
    Timeout {
        attempts: u32,
        elapsed: Duration,
        last_error: Option<String>,
    },
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    last_error
        .as_ref()
        .map(|e| format!("; last status error: {e}"))
        .unwrap_or_default()
}

/// Raised when an update would move a record backward or out of a terminal state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("illegal transition {from} -> {to}")]
pub struct TransitionError {
    pub from: &'static str,
    pub to: &'static str,
}
