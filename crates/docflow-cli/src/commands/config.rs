//! `docflow config` command implementation
//!
//! Shows the effective configuration. Settings live in `DOCFLOW_*`
//! environment variables (or a `.env` file).

use crate::config::{self, Config, KEYS};
use crate::error::{CliError, Result};
use colored::Colorize;

/// Get configuration value
pub async fn get(key: String) -> Result<()> {
    let config = Config::from_env()?;

    match config.get(&key) {
        Some(value) => println!("{}", value),
        None => return Err(unknown_key(&key)),
    }

    Ok(())
}

/// Set configuration value
pub async fn set(key: String, value: String) -> Result<()> {
    let var = config::env_var_for(&key).ok_or_else(|| unknown_key(&key))?;

    println!("{} Configuration is managed via environment variables.", "ℹ".cyan());
    println!();
    println!("To set {}:", key);
    println!("  export {}={}", var, shell_quote(&value));
    println!();
    println!("Or add it to a .env file in the working directory:");
    println!("  {}={}", var, value);

    Ok(())
}

/// Show all configuration
pub async fn show() -> Result<()> {
    let config = Config::from_env()?;

    println!("{}", "Docflow CLI Configuration:".cyan().bold());
    println!();
    for (key, _) in KEYS {
        let value = config.get(key).unwrap_or_default();
        println!("{:<24} {}", format!("{}:", key), value);
    }
    println!();
    println!("{}", "Environment Variables:".cyan());
    for (key, var) in KEYS {
        println!("  {:<32} {}", var, key);
    }

    Ok(())
}

fn unknown_key(key: &str) -> CliError {
    let known: Vec<&str> = KEYS.iter().map(|(k, _)| *k).collect();
    CliError::config(format!(
        "Unknown config key: {} (known keys: {})",
        key,
        known.join(", ")
    ))
}

fn shell_quote(value: &str) -> String {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "-_./:,".contains(c))
    {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
