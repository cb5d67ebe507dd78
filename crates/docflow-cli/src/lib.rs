//! Docflow CLI Library
//!
//! Client-side orchestration for batch document uploads.
//!
//! # Overview
//!
//! A batch moves every submitted file through local validation, a single
//! multipart upload per submission, and per-file status polling until the
//! processing backend reports a terminal outcome:
//!
//! - **Validation**: type, size and batch-count rules ([`validation`])
//! - **Records**: the per-file state machine ([`record`])
//! - **Batch**: the shared record store, observers and controller ([`batch`])
//! - **Upload**: one transaction per submission ([`uploader`])
//! - **Polling**: one bounded loop per accepted file ([`poller`])
//!
//! ```no_run
//! use docflow_cli::api::ApiClient;
//! use docflow_cli::batch::{BatchController, ChannelObserver};
//! use docflow_cli::poller::PollConfig;
//! use docflow_cli::record::FileSource;
//! use docflow_cli::validation::ValidationOptions;
//! use std::sync::Arc;
//!
//! # async fn example() -> docflow_cli::Result<()> {
//! let client = ApiClient::new("http://localhost:8000".to_string())?;
//! let (observer, _events) = ChannelObserver::new();
//! let controller = BatchController::new(
//!     Arc::new(client),
//!     ValidationOptions::default(),
//!     PollConfig::default(),
//!     Arc::new(observer),
//! );
//!
//! let invoice = FileSource::from_path("invoice.pdf").await?;
//! controller.accept(vec![invoice])?;
//! controller.wait_until_complete().await;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod api;
pub mod batch;
pub mod commands;
pub mod config;
pub mod error;
pub mod poller;
pub mod progress;
pub mod record;
pub mod uploader;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use batch::{AcceptOutcome, Batch, BatchController, BatchEvent, BatchObserver, ChannelObserver};
pub use error::{CliError, Result};
pub use record::{FileRecord, FileSource, FileStatus, RecordId};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Docflow - batch document upload and processing tracker
#[derive(Parser, Debug)]
#[command(name = "docflow")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server URL
    #[arg(long, env = "DOCFLOW_SERVER_URL", default_value = "http://localhost:8000", global = true)]
    pub server_url: String,

    /// Print the CLI reference as Markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload documents and follow their processing
    Upload {
        /// Files to upload, submitted in this order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Do not draw progress bars
        #[arg(long)]
        no_progress: bool,
    },

    /// Show the processing status of an uploaded document
    Status {
        /// Correlation ID returned when the document was accepted
        correlation_id: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Get configuration value
    Get {
        /// Configuration key
        key: String,
    },

    /// Set configuration value
    Set {
        /// Configuration key
        key: String,

        /// Configuration value
        value: String,
    },

    /// Show all configuration
    Show,
}
