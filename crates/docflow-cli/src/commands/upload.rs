//! `docflow upload` command implementation
//!
//! Submits files as one batch, follows their processing, and prints a
//! summary once every file has a terminal outcome.

use crate::api::ApiClient;
use crate::batch::{BatchController, BatchEvent, ChannelObserver};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::progress::{self, BatchRenderer};
use crate::record::{FileSource, FileStatus};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Upload files and wait for processing to finish
pub async fn run(server_url: String, files: Vec<PathBuf>, no_progress: bool) -> Result<()> {
    let mut config = Config::from_env()?;
    config.set_server_url(server_url);

    let sources = load_sources(&files).await?;

    let client = ApiClient::from_config(&config)?;

    let spinner = progress::create_spinner("Checking server...");
    let healthy = client.health_check().await?;
    spinner.finish_and_clear();
    if !healthy {
        return Err(CliError::api(format!(
            "Cannot connect to processing server at {}",
            client.base_url()
        )));
    }

    let (observer, mut events) = ChannelObserver::new();
    let controller = BatchController::new(
        Arc::new(client),
        config.validation_options(),
        config.poll_config(),
        Arc::new(observer),
    );

    let outcome = controller.accept(sources)?;

    for (name, reason) in &outcome.rejected {
        println!("{} {} skipped: {}", "✗".red(), name, reason);
    }

    if outcome.registered.is_empty() {
        return Err(CliError::NothingToUpload(outcome.rejected.len()));
    }

    println!(
        "{} Uploading {} file(s)...",
        "↑".cyan(),
        outcome.registered.len()
    );
    info!(files = outcome.registered.len(), "Batch submitted");

    let mut renderer = if no_progress || !std::io::stderr().is_terminal() {
        BatchRenderer::hidden()
    } else {
        BatchRenderer::new()
    };

    while let Some(event) = events.recv().await {
        renderer.render(event.records());
        if matches!(event, BatchEvent::Completed(_)) {
            break;
        }
    }

    if let Some(task) = outcome.task {
        let _ = task.await;
    }

    let records = controller.snapshot();
    println!();
    println!("{}", progress::summary_table(&records));
    println!();

    let failed = records
        .iter()
        .filter(|r| r.status() == FileStatus::Error)
        .count();

    if failed > 0 {
        return Err(CliError::BatchFailed {
            failed,
            total: records.len(),
        });
    }

    println!(
        "{} All {} file(s) processed",
        "✓".green().bold(),
        records.len()
    );
    Ok(())
}

async fn load_sources(files: &[PathBuf]) -> Result<Vec<FileSource>> {
    let mut sources = Vec::with_capacity(files.len());
    for path in files {
        let source = FileSource::from_path(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CliError::FileNotFound(path.display().to_string()),
            _ => CliError::Io(e),
        })?;
        sources.push(source);
    }
    Ok(sources)
}
