//! Docflow CLI - Main entry point

use clap::Parser;
use docflow_cli::{Cli, Commands, ConfigCommand};
use docflow_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // Pick up DOCFLOW_* settings from a local .env before clap reads them
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Handle markdown help generation
    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    // Ensure a command is provided
    if cli.command.is_none() {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    }

    // Initialize logging based on verbose flag and environment
    let log_config = if cli.verbose {
        // Verbose mode: log to console with debug level
        LogConfig::builder()
            .level(LogLevel::Debug)
            .output(LogOutput::Console)
            .log_file_prefix("docflow-cli")
            .build()
    } else {
        // Normal mode: only warnings and errors to console
        LogConfig::builder()
            .level(LogLevel::Warn)
            .output(LogOutput::Console)
            .log_file_prefix("docflow-cli")
            .build()
    };

    // Merge with environment variables (they take precedence)
    let log_config = match log_config.clone().merge_env() {
        Ok(Some(merged)) => merged,
        Ok(None) => log_config,
        Err(e) => {
            eprintln!("Warning: ignoring invalid logging settings: {}", e);
            log_config
        },
    };

    // Initialize logging (ignore errors as CLI should work without logging)
    let _ = init_logging(&log_config);

    // Execute command
    let result = execute_command(&cli).await;

    // Handle result
    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> docflow_cli::Result<()> {
    // Command is guaranteed to exist at this point (checked in main)
    let Some(ref command) = cli.command else {
        unreachable!("Command should have been validated in main");
    };

    match command {
        Commands::Upload { files, no_progress } => {
            docflow_cli::commands::upload::run(cli.server_url.clone(), files.clone(), *no_progress)
                .await
        },

        Commands::Status { correlation_id } => {
            docflow_cli::commands::status::run(cli.server_url.clone(), correlation_id.clone()).await
        },

        Commands::Config { command } => match command {
            ConfigCommand::Get { key } => docflow_cli::commands::config::get(key.clone()).await,
            ConfigCommand::Set { key, value } => {
                docflow_cli::commands::config::set(key.clone(), value.clone()).await
            },
            ConfigCommand::Show => docflow_cli::commands::config::show().await,
        },
    }
}
