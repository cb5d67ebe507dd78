//! API endpoint URL builders
//!
//! Helper functions to construct API endpoint URLs.

/// Build document intake URL
pub fn upload_url(base_url: &str) -> String {
    format!("{}/api/v1/documents/upload", base_url)
}

/// Build document status URL
pub fn status_url(base_url: &str, correlation_id: &str) -> String {
    format!(
        "{}/api/v1/documents/status/{}",
        base_url,
        urlencoding::encode(correlation_id)
    )
}

/// Build health check URL
pub fn health_url(base_url: &str) -> String {
    format!("{}/health", base_url)
}
