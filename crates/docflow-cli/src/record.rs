//! Per-file records and their state machine
//!
//! ```text
//! Selected -> Pending -> Uploading -> Processing -> Completed
//!                |           |            |
//!                +-----------+------------+------> Error
//! ```
//!
//! `Completed` and `Error` are absorbing. Every change to a record goes
//! through [`FileRecord::apply`], which refuses anything that would move the
//! record backward.

use crate::error::{RecordError, TransitionError};
use bytes::Bytes;
use docflow_common::types::RemotePhase;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Identity of a record within a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Selected,
    Pending,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Selected => "selected",
            FileStatus::Pending => "pending",
            FileStatus::Uploading => "uploading",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FileStatus::Completed | FileStatus::Error)
    }

    /// Edges of the state machine. Self-loops are not edges.
    pub fn can_transition_to(&self, next: FileStatus) -> bool {
        use FileStatus::*;
        matches!(
            (self, next),
            (Selected, Pending)
                | (Pending, Uploading)
                | (Pending, Error)
                | (Uploading, Processing)
                | (Uploading, Error)
                | (Processing, Completed)
                | (Processing, Error)
        )
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// File Source
// ============================================================================

#[derive(Clone)]
enum SourceContent {
    Path(PathBuf),
    Memory(Bytes),
}

/// Opaque handle to the content of one submitted file
///
/// Cloning is cheap; in-memory content is shared.
#[derive(Clone)]
pub struct FileSource {
    name: String,
    content_type: String,
    size: u64,
    content: SourceContent,
}

impl FileSource {
    /// Describe a file on disk. Size comes from metadata; the bytes are read
    /// only when the upload is built.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("'{}' is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            content_type: detect_content_type(&name).to_string(),
            name,
            size: metadata.len(),
            content: SourceContent::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(
        name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        let data = Bytes::from(data);
        Self {
            name: name.into(),
            content_type: content_type.into(),
            size: data.len() as u64,
            content: SourceContent::Memory(data),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub async fn read(&self) -> std::io::Result<Bytes> {
        match &self.content {
            SourceContent::Path(path) => tokio::fs::read(path).await.map(Bytes::from),
            SourceContent::Memory(data) => Ok(data.clone()),
        }
    }
}

impl std::fmt::Debug for FileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let origin = match &self.content {
            SourceContent::Path(path) => path.display().to_string(),
            SourceContent::Memory(_) => "<memory>".to_string(),
        };
        f.debug_struct("FileSource")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.size)
            .field("origin", &origin)
            .finish()
    }
}

/// Detect content type from filename extension
pub fn detect_content_type(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("gif") => "image/gif",
        Some("txt") => "text/plain",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("doc") => "application/msword",
        Some("docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        },
        _ => "application/octet-stream",
    }
}

// ============================================================================
// File Record
// ============================================================================

/// A change requested by the uploader or the poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    /// The upload transaction for this record's sub-batch is starting
    StartUpload,
    /// Aggregate transfer percentage of the sub-batch
    UploadProgress(u8),
    /// The intake endpoint accepted the file
    BeginProcessing { correlation_id: String },
    /// A phase reported by the status endpoint
    Phase {
        phase: RemotePhase,
        error: Option<String>,
    },
    Fail(RecordError),
}

/// One submitted file's journey from selection to a terminal outcome
#[derive(Debug, Clone)]
pub struct FileRecord {
    id: RecordId,
    source: FileSource,
    progress: u8,
    status: FileStatus,
    error: Option<RecordError>,
    correlation_id: Option<String>,
    phase: Option<RemotePhase>,
}

impl FileRecord {
    pub fn new(source: FileSource) -> Self {
        Self {
            id: RecordId::new(),
            source,
            progress: 0,
            status: FileStatus::Selected,
            error: None,
            correlation_id: None,
            phase: None,
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }

    /// Percentage within the current stage
    ///
    /// Upload runs 0-100, then `Processing` starts again from 0 and climbs
    /// through the phase floors. The value only rises within one stage.
    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status(&self) -> FileStatus {
        self.status
    }

    /// Present iff `status() == FileStatus::Error`
    pub fn error(&self) -> Option<&RecordError> {
        self.error.as_ref()
    }

    /// Present iff the record ever reached `Processing`
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Last remote phase seen while polling
    pub fn phase(&self) -> Option<&RemotePhase> {
        self.phase.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn move_to(&mut self, next: FileStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub(crate) fn register(&mut self) -> Result<(), TransitionError> {
        self.move_to(FileStatus::Pending)
    }

    /// Apply one update. Returns whether anything observable changed.
    pub fn apply(&mut self, update: RecordUpdate) -> Result<bool, TransitionError> {
        match update {
            RecordUpdate::StartUpload => {
                self.move_to(FileStatus::Uploading)?;
                self.progress = 0;
                Ok(true)
            },
            RecordUpdate::UploadProgress(pct) => {
                self.require(FileStatus::Uploading, "uploading")?;
                Ok(self.raise_progress(pct))
            },
            RecordUpdate::BeginProcessing { correlation_id } => {
                if self.correlation_id.is_some() {
                    return Err(TransitionError {
                        from: self.status.as_str(),
                        to: "processing",
                    });
                }
                self.move_to(FileStatus::Processing)?;
                self.correlation_id = Some(correlation_id);
                // Processing-stage progress starts over; phase floors raise it.
                self.progress = 0;
                Ok(true)
            },
            RecordUpdate::Phase { phase, error } => {
                self.require(FileStatus::Processing, "processing")?;
                match phase {
                    RemotePhase::Completed => {
                        self.move_to(FileStatus::Completed)?;
                        self.progress = 100;
                        self.phase = Some(phase);
                        Ok(true)
                    },
                    RemotePhase::Failed => {
                        self.move_to(FileStatus::Error)?;
                        self.error = Some(RecordError::RemoteProcessing(
                            error.unwrap_or_else(|| "Processing failed on the server".to_string()),
                        ));
                        self.phase = Some(phase);
                        Ok(true)
                    },
                    phase => {
                        let raised = phase
                            .progress_floor()
                            .map(|floor| self.raise_progress(floor))
                            .unwrap_or(false);
                        let phase_changed = self.phase.as_ref() != Some(&phase);
                        self.phase = Some(phase);
                        Ok(raised || phase_changed)
                    },
                }
            },
            RecordUpdate::Fail(error) => {
                self.move_to(FileStatus::Error)?;
                self.error = Some(error);
                Ok(true)
            },
        }
    }

    fn require(&self, status: FileStatus, to: &'static str) -> Result<(), TransitionError> {
        if self.status == status {
            Ok(())
        } else {
            Err(TransitionError {
                from: self.status.as_str(),
                to,
            })
        }
    }

    /// Progress never goes down within a status
    fn raise_progress(&mut self, pct: u8) -> bool {
        let pct = pct.min(100);
        if pct > self.progress {
            self.progress = pct;
            true
        } else {
            false
        }
    }
}
