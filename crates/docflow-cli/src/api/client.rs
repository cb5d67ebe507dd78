//! HTTP API client for the document processing server

use crate::api::credentials::{CredentialProvider, NoCredentials};
use crate::api::{endpoints, DocumentApi, TransferProgress, UploadPart};
use crate::config::Config;
use crate::error::{Result, TransportError, TransportErrorKind};
use async_trait::async_trait;
use bytes::Bytes;
use docflow_common::types::{IntakeResponse, StatusResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, RequestBuilder, Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

// ============================================================================
// API Client Constants
// ============================================================================

/// Default timeout for API requests in seconds.
/// Can be overridden via DOCFLOW_API_TIMEOUT_SECS environment variable.
/// Set to 5 minutes to accommodate large uploads.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 300;

/// Size of the chunks an upload body is streamed in
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

/// Longest server error body quoted back to the user
const MAX_ERROR_DETAIL: usize = 200;

/// API client for the processing server
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl ApiClient {
    /// Create a new API client without credentials
    pub fn new(base_url: String) -> Result<Self> {
        Self::with_credentials(
            base_url,
            Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
            Arc::new(NoCredentials),
        )
    }

    pub fn with_credentials(
        base_url: String,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Create from resolved configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_credentials(
            config.server_url().to_string(),
            Duration::from_secs(config.api_timeout_secs()),
            config.credentials(),
        )
    }

    /// Check server health
    pub async fn health_check(&self) -> Result<bool> {
        let url = endpoints::health_url(&self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.credentials.bearer_token().await {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> std::result::Result<Response, TransportError> {
        let response = self
            .authorize(request)
            .await
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::from_status(
            status.as_u16(),
            error_detail(&body).as_deref(),
        ))
    }
}

#[async_trait]
impl DocumentApi for ApiClient {
    async fn submit(
        &self,
        parts: Vec<UploadPart>,
        progress: TransferProgress,
    ) -> std::result::Result<IntakeResponse, TransportError> {
        let url = endpoints::upload_url(&self.base_url);
        let total: u64 = parts.iter().map(UploadPart::len).sum();
        let sent = Arc::new(AtomicU64::new(0));

        let mut form = Form::new();
        for part in parts {
            let len = part.len();
            let body = counted_body(part.data, total, sent.clone(), progress.clone());
            let file_part = Part::stream_with_length(body, len)
                .file_name(part.filename)
                .mime_str(&part.content_type)
                .map_err(|e| {
                    TransportError::new(
                        TransportErrorKind::MalformedRequest,
                        format!("Invalid content type '{}': {e}", part.content_type),
                    )
                })?;
            form = form.part("files", file_part);
        }

        debug!(url = %url, bytes = total, "Submitting upload transaction");
        let response = self.send(self.client.post(&url).multipart(form)).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        IntakeResponse::from_slice(&body).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Server,
                format!("Unexpected intake response from server: {e}"),
            )
        })
    }

    async fn status(
        &self,
        correlation_id: &str,
    ) -> std::result::Result<StatusResponse, TransportError> {
        let url = endpoints::status_url(&self.base_url, correlation_id);
        let response = self.send(self.client.get(&url)).await?;

        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::from_reqwest(&e))?;
        StatusResponse::from_slice(&body).map_err(|e| {
            TransportError::new(
                TransportErrorKind::Server,
                format!("Unexpected status response from server: {e}"),
            )
        })
    }
}

/// Stream `data` in chunks, bumping the shared byte counter as each chunk is
/// pulled by the transport
fn counted_body(
    data: Bytes,
    total: u64,
    sent: Arc<AtomicU64>,
    progress: TransferProgress,
) -> Body {
    let stream = futures::stream::iter(chunked(data).map(move |chunk| {
        let so_far = sent.fetch_add(chunk.len() as u64, Ordering::SeqCst) + chunk.len() as u64;
        progress(percent(so_far, total));
        Ok::<_, std::io::Error>(chunk)
    }));

    Body::wrap_stream(stream)
}

/// Split `data` into views of at most `UPLOAD_CHUNK_SIZE` bytes over the
/// same buffer
fn chunked(data: Bytes) -> impl Iterator<Item = Bytes> {
    let len = data.len();
    (0..len)
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(move |start| data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(len)))
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

/// Pull a human-readable message out of an error body
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            if let Some(text) = json.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
    }

    Some(body.chars().take(MAX_ERROR_DETAIL).collect())
}
