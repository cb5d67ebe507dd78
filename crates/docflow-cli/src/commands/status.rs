//! `docflow status` command implementation
//!
//! One-off status query for a document that was already uploaded.

use crate::api::{ApiClient, DocumentApi};
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;
use docflow_common::types::{RemotePhase, StatusResponse};

/// Query and print the processing phase of one document
pub async fn run(server_url: String, correlation_id: String) -> Result<()> {
    let mut config = Config::from_env()?;
    config.set_server_url(server_url);

    let client = ApiClient::from_config(&config)?;
    let response = client.status(&correlation_id).await?;

    print!("{}", render(&correlation_id, &response));
    Ok(())
}

fn render(correlation_id: &str, response: &StatusResponse) -> String {
    let phase = match response.status {
        RemotePhase::Completed => response.status.as_str().green().to_string(),
        RemotePhase::Failed => response.status.as_str().red().to_string(),
        _ => response.status.as_str().yellow().to_string(),
    };
    let progress = response
        .status
        .progress_floor()
        .map(|p| format!("{}%", p))
        .unwrap_or_else(|| "-".to_string());

    let mut out = String::new();
    out.push_str(&format!("{:<16} {}\n", "Correlation ID:", correlation_id));
    out.push_str(&format!("{:<16} {}\n", "Phase:", phase));
    out.push_str(&format!("{:<16} {}\n", "Progress:", progress));
    if let Some(ref error) = response.error {
        out.push_str(&format!("{:<16} {}\n", "Error:", error.red()));
    }
    out
}
