//! Scriptable in-process backend for unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use crate::api::{DocumentApi, TransferProgress, UploadPart};
use crate::error::TransportError;
use async_trait::async_trait;
use docflow_common::types::{
    FailedUpload, IntakeResponse, RemotePhase, StatusResponse, UploadEntry,
};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;

type StatusScript = VecDeque<Result<StatusResponse, TransportError>>;

/// Build an intake response from `(correlation_id, filename)` successes and
/// `(filename, reason)` failures
pub fn intake(uploads: &[(&str, &str)], failed: &[(&str, &str)]) -> IntakeResponse {
    IntakeResponse {
        success: true,
        message: None,
        uploads: uploads
            .iter()
            .map(|(cid, filename)| UploadEntry {
                correlation_id: cid.to_string(),
                filename: filename.to_string(),
                status: Some("queued".to_string()),
            })
            .collect(),
        failed_uploads: failed
            .iter()
            .map(|(filename, reason)| {
                FailedUpload::Keyed(BTreeMap::from([(filename.to_string(), reason.to_string())]))
            })
            .collect(),
    }
}

/// Intake answers are taken from a queue; when the queue is empty every file
/// is accepted as `cid-1`, `cid-2`, ... in submission order.
///
/// Status answers come from a per-id script whose last entry repeats. Ids
/// without a script report `processing` forever.
#[derive(Default)]
pub struct FakeApi {
    intake: Mutex<VecDeque<Result<IntakeResponse, TransportError>>>,
    transfer_steps: Vec<u8>,
    statuses: Mutex<HashMap<String, StatusScript>>,
    default_script: Option<StatusScript>,
    next_id: Mutex<u32>,
    submissions: Mutex<Vec<Vec<String>>>,
    status_calls: Mutex<HashMap<String, usize>>,
}

fn still_processing() -> StatusResponse {
    StatusResponse {
        status: RemotePhase::Processing,
        error: None,
    }
}

fn phases(script: Vec<Result<RemotePhase, TransportError>>) -> StatusScript {
    script
        .into_iter()
        .map(|r| r.map(|status| StatusResponse { status, error: None }))
        .collect()
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accepting() -> Self {
        Self::default()
    }

    pub fn with_intake(self, response: Result<IntakeResponse, TransportError>) -> Self {
        self.intake.lock().unwrap().push_back(response);
        self
    }

    /// Percentages reported to the transfer callback before answering
    pub fn with_transfer_steps(mut self, steps: Vec<u8>) -> Self {
        self.transfer_steps = steps;
        self
    }

    pub fn with_status_script(
        self,
        correlation_id: &str,
        script: Vec<Result<RemotePhase, TransportError>>,
    ) -> Self {
        self.with_status_responses(correlation_id, phases(script).into_iter().collect())
    }

    pub fn with_status_responses(
        self,
        correlation_id: &str,
        script: Vec<Result<StatusResponse, TransportError>>,
    ) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(correlation_id.to_string(), script.into());
        self
    }

    /// Script used for every id that has no script of its own
    pub fn with_status_script_for_all(
        mut self,
        script: Vec<Result<RemotePhase, TransportError>>,
    ) -> Self {
        self.default_script = Some(phases(script));
        self
    }

    /// Filenames of each submitted transaction, in order
    pub fn submissions(&self) -> Vec<Vec<String>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_calls(&self, correlation_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .get(correlation_id)
            .copied()
            .unwrap_or(0)
    }

    fn auto_accept(&self, names: &[String]) -> IntakeResponse {
        let mut next = self.next_id.lock().unwrap();
        let uploads: Vec<(String, String)> = names
            .iter()
            .map(|name| {
                *next += 1;
                (format!("cid-{}", *next), name.clone())
            })
            .collect();
        let pairs: Vec<(&str, &str)> = uploads
            .iter()
            .map(|(cid, name)| (cid.as_str(), name.as_str()))
            .collect();
        intake(&pairs, &[])
    }
}

#[async_trait]
impl DocumentApi for FakeApi {
    async fn submit(
        &self,
        parts: Vec<UploadPart>,
        progress: TransferProgress,
    ) -> Result<IntakeResponse, TransportError> {
        let names: Vec<String> = parts.iter().map(|p| p.filename.clone()).collect();
        self.submissions.lock().unwrap().push(names.clone());

        for step in &self.transfer_steps {
            progress(*step);
        }

        let scripted = self.intake.lock().unwrap().pop_front();
        match scripted {
            Some(response) => response,
            None => Ok(self.auto_accept(&names)),
        }
    }

    async fn status(&self, correlation_id: &str) -> Result<StatusResponse, TransportError> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(correlation_id.to_string())
            .or_default() += 1;

        let mut statuses = self.statuses.lock().unwrap();
        if !statuses.contains_key(correlation_id) {
            if let Some(script) = &self.default_script {
                statuses.insert(correlation_id.to_string(), script.clone());
            }
        }

        let Some(script) = statuses.get_mut(correlation_id) else {
            return Ok(still_processing());
        };

        let next = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        next.unwrap_or_else(|| Ok(still_processing()))
    }
}
