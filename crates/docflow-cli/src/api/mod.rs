//! API client module
//!
//! The orchestrator talks to the processing backend only through
//! [`DocumentApi`]. [`ApiClient`] is the HTTP implementation.

pub mod client;
pub mod credentials;
pub mod endpoints;

pub use client::ApiClient;
pub use credentials::{CredentialProvider, EnvToken, NoCredentials, StaticToken};
pub use docflow_common::types::{
    FailedUpload, IntakeResponse, RemotePhase, StatusResponse, UploadEntry,
};

use crate::error::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// One file of a multipart upload transaction
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

impl UploadPart {
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Receives the aggregate transfer percentage (0-100) of a transaction
pub type TransferProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// The two backend operations the orchestrator needs
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Send every part in one transaction, in order
    async fn submit(
        &self,
        parts: Vec<UploadPart>,
        progress: TransferProgress,
    ) -> Result<IntakeResponse, TransportError>;

    /// Query the processing phase of one accepted document
    async fn status(&self, correlation_id: &str) -> Result<StatusResponse, TransportError>;
}
