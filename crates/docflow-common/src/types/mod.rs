//! Wire types shared with the document processing backend
//!
//! The intake endpoint accepts a multipart batch and answers with an
//! [`IntakeResponse`]; the status endpoint answers with a [`StatusResponse`].

use crate::error::{DocflowError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Processing Phases
// ============================================================================

/// A named stage of server-side processing, as reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RemotePhase {
    Processing,
    Parsing,
    Extracting,
    Storing,
    /// Terminal success
    Completed,
    /// Terminal failure
    Failed,
    /// Any phase this client does not know about
    Other(String),
}

impl RemotePhase {
    pub fn as_str(&self) -> &str {
        match self {
            RemotePhase::Processing => "processing",
            RemotePhase::Parsing => "parsing",
            RemotePhase::Extracting => "extracting",
            RemotePhase::Storing => "storing",
            RemotePhase::Completed => "completed",
            RemotePhase::Failed => "failed",
            RemotePhase::Other(s) => s.as_str(),
        }
    }

    /// Progress floor for this phase. `None` means "keep the last known floor".
    pub fn progress_floor(&self) -> Option<u8> {
        match self {
            RemotePhase::Processing => Some(20),
            RemotePhase::Parsing => Some(40),
            RemotePhase::Extracting => Some(60),
            RemotePhase::Storing => Some(80),
            RemotePhase::Completed => Some(100),
            RemotePhase::Failed | RemotePhase::Other(_) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RemotePhase::Completed | RemotePhase::Failed)
    }
}

impl From<String> for RemotePhase {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "processing" => RemotePhase::Processing,
            "parsing" => RemotePhase::Parsing,
            "extracting" => RemotePhase::Extracting,
            "storing" => RemotePhase::Storing,
            "completed" => RemotePhase::Completed,
            "failed" | "error" => RemotePhase::Failed,
            _ => RemotePhase::Other(s),
        }
    }
}

impl From<&str> for RemotePhase {
    fn from(s: &str) -> Self {
        RemotePhase::from(s.to_string())
    }
}

impl From<RemotePhase> for String {
    fn from(phase: RemotePhase) -> Self {
        phase.as_str().to_string()
    }
}

impl std::fmt::Display for RemotePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Intake Endpoint
// ============================================================================

/// Response from the intake endpoint for one multipart batch
///
/// `uploads` and `failed_uploads` are positionally aligned to the order the
/// files were submitted in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeResponse {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default)]
    pub uploads: Vec<UploadEntry>,

    #[serde(default)]
    pub failed_uploads: Vec<FailedUpload>,
}

impl IntakeResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Total number of per-file entries in the response
    pub fn entry_count(&self) -> usize {
        self.uploads.len() + self.failed_uploads.len()
    }
}

/// A file the backend accepted for processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadEntry {
    /// Identifier used to poll the status endpoint
    pub correlation_id: String,

    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// A file the backend refused
///
/// Backends send either `{"filename": ..., "reason": ...}` or a single-entry
/// map of `{"<filename>": "<reason>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailedUpload {
    Detailed {
        filename: String,
        #[serde(alias = "error", alias = "message")]
        reason: String,
    },
    Keyed(BTreeMap<String, String>),
}

impl FailedUpload {
    pub fn filename(&self) -> Option<&str> {
        match self {
            FailedUpload::Detailed { filename, .. } => Some(filename),
            FailedUpload::Keyed(map) => map.keys().next().map(String::as_str),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            FailedUpload::Detailed { reason, .. } => reason,
            FailedUpload::Keyed(map) => map
                .values()
                .next()
                .map(String::as_str)
                .unwrap_or("upload rejected by server"),
        }
    }
}

// ============================================================================
// Status Endpoint
// ============================================================================

/// Response from the status endpoint for one correlation id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: RemotePhase,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let response: StatusResponse = serde_json::from_slice(body)?;
        if response.status.as_str().trim().is_empty() {
            return Err(DocflowError::Parse(
                "status response has an empty 'status' field".to_string(),
            ));
        }
        Ok(response)
    }
}
