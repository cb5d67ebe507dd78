//! Submits a sub-batch as one upload transaction and maps the response back
//! onto its records
//!
//! The intake endpoint reports results positionally: entry `i` of the
//! combined `uploads ++ failedUploads` list belongs to file `i` of the
//! submission.

use crate::api::{DocumentApi, TransferProgress, UploadPart};
use crate::batch::Batch;
use crate::error::RecordError;
use crate::record::{FileSource, RecordId, RecordUpdate};
use docflow_common::types::IntakeResponse;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the intake response says about one submitted file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted { correlation_id: String },
    Rejected(String),
    /// No entry at this position
    Missing,
}

/// Align a response with the submitted filenames
pub fn map_outcomes(filenames: &[String], response: &IntakeResponse) -> Vec<UploadOutcome> {
    if !response.success && response.entry_count() == 0 {
        let message = response
            .message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "The server rejected the upload".to_string());
        return vec![UploadOutcome::Rejected(message); filenames.len()];
    }

    let accepted = response.uploads.len();
    filenames
        .iter()
        .enumerate()
        .map(|(i, filename)| {
            if let Some(entry) = response.uploads.get(i) {
                if entry.filename != *filename {
                    warn!(
                        position = i,
                        submitted = %filename,
                        reported = %entry.filename,
                        "Intake response filename does not match submission order"
                    );
                }
                if entry.correlation_id.trim().is_empty() {
                    return UploadOutcome::Missing;
                }
                UploadOutcome::Accepted {
                    correlation_id: entry.correlation_id.clone(),
                }
            } else if let Some(failure) = response.failed_uploads.get(i - accepted) {
                if let Some(reported) = failure.filename().filter(|f| *f != filename.as_str()) {
                    warn!(
                        position = i,
                        submitted = %filename,
                        reported = %reported,
                        "Intake response filename does not match submission order"
                    );
                }
                UploadOutcome::Rejected(failure.reason().to_string())
            } else {
                UploadOutcome::Missing
            }
        })
        .collect()
}

/// Runs the upload transaction for one sub-batch
#[derive(Clone)]
pub struct Uploader {
    batch: Batch,
    api: Arc<dyn DocumentApi>,
}

impl Uploader {
    pub fn new(batch: Batch, api: Arc<dyn DocumentApi>) -> Self {
        Self { batch, api }
    }

    /// Upload `sub_batch` and return the records that reached `Processing`,
    /// with their correlation ids
    pub async fn submit(&self, sub_batch: Vec<(RecordId, FileSource)>) -> Vec<(RecordId, String)> {
        let mut ids = Vec::with_capacity(sub_batch.len());
        let mut names = Vec::with_capacity(sub_batch.len());
        let mut parts = Vec::with_capacity(sub_batch.len());

        for (id, source) in sub_batch {
            match source.read().await {
                Ok(data) => {
                    ids.push(id);
                    names.push(source.name().to_string());
                    parts.push(UploadPart {
                        filename: source.name().to_string(),
                        content_type: source.content_type().to_string(),
                        data,
                    });
                },
                Err(e) => {
                    warn!(
                        record_id = %id,
                        file = %source.name(),
                        error = %e,
                        "Could not read file"
                    );
                    let _ = self.batch.apply(
                        id,
                        RecordUpdate::Fail(RecordError::Unreadable(e.to_string())),
                    );
                },
            }
        }

        if ids.is_empty() {
            return Vec::new();
        }

        for id in &ids {
            let _ = self.batch.apply(*id, RecordUpdate::StartUpload);
        }

        let ids = Arc::new(ids);
        info!(files = ids.len(), "Uploading sub-batch");

        let result = self.api.submit(parts, self.progress_sink(ids.clone())).await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(files = ids.len(), error = %e, "Upload transaction failed");
                for id in ids.iter() {
                    let _ = self
                        .batch
                        .apply(*id, RecordUpdate::Fail(RecordError::Transport(e.clone())));
                }
                return Vec::new();
            },
        };

        // The transfer is over once the response is in
        for id in ids.iter() {
            let _ = self.batch.apply(*id, RecordUpdate::UploadProgress(100));
        }

        let mut accepted = Vec::new();
        for ((id, name), outcome) in ids.iter().zip(&names).zip(map_outcomes(&names, &response)) {
            let update = match outcome {
                UploadOutcome::Accepted { correlation_id } => {
                    debug!(
                        record_id = %id,
                        correlation_id = %correlation_id,
                        "Accepted for processing"
                    );
                    accepted.push((*id, correlation_id.clone()));
                    RecordUpdate::BeginProcessing { correlation_id }
                },
                UploadOutcome::Rejected(reason) => {
                    info!(record_id = %id, file = %name, reason = %reason, "Upload rejected");
                    RecordUpdate::Fail(RecordError::Rejected(reason))
                },
                UploadOutcome::Missing => {
                    warn!(record_id = %id, file = %name, "No result reported for file");
                    RecordUpdate::Fail(RecordError::MissingResult(name.clone()))
                },
            };
            let _ = self.batch.apply(*id, update);
        }

        // Anything removed in the meantime does not get a poller
        accepted.retain(|(id, _)| self.batch.is_live(*id));
        accepted
    }

    /// Mirror the aggregate transfer percentage onto every record, once per
    /// increase
    fn progress_sink(&self, ids: Arc<Vec<RecordId>>) -> TransferProgress {
        let batch = self.batch.clone();
        let last = AtomicU8::new(0);
        Arc::new(move |pct: u8| {
            let pct = pct.min(100);
            if last.fetch_max(pct, Ordering::SeqCst) < pct {
                for id in ids.iter() {
                    let _ = batch.apply(*id, RecordUpdate::UploadProgress(pct));
                }
            }
        })
    }
}
