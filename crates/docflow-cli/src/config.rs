//! Configuration management for the Docflow CLI
//!
//! Defaults first, then `DOCFLOW_*` environment overrides.

use crate::api::credentials::{CredentialProvider, EnvToken, StaticToken};
use crate::error::{CliError, Result};
use crate::poller::PollConfig;
use crate::validation::{self, ValidationOptions};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// CLI Configuration Constants
// ============================================================================

/// Default server URL when not specified via environment variable.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

pub const ENV_SERVER_URL: &str = "DOCFLOW_SERVER_URL";
pub const ENV_TOKEN: &str = "DOCFLOW_TOKEN";
pub const ENV_API_TIMEOUT_SECS: &str = "DOCFLOW_API_TIMEOUT_SECS";
pub const ENV_MAX_FILE_SIZE: &str = "DOCFLOW_MAX_FILE_SIZE";
pub const ENV_MAX_FILES: &str = "DOCFLOW_MAX_FILES";
pub const ENV_ACCEPTED_TYPES: &str = "DOCFLOW_ACCEPTED_TYPES";
pub const ENV_POLL_INTERVAL_SECS: &str = "DOCFLOW_POLL_INTERVAL_SECS";
pub const ENV_POLL_MAX_ATTEMPTS: &str = "DOCFLOW_POLL_MAX_ATTEMPTS";
pub const ENV_POLL_INITIAL_DELAY_MS: &str = "DOCFLOW_POLL_INITIAL_DELAY_MS";

/// Keys understood by `docflow config get/set`, with their variables
pub const KEYS: &[(&str, &str)] = &[
    ("server_url", ENV_SERVER_URL),
    ("token", ENV_TOKEN),
    ("api_timeout_secs", ENV_API_TIMEOUT_SECS),
    ("max_file_size", ENV_MAX_FILE_SIZE),
    ("max_files", ENV_MAX_FILES),
    ("accepted_types", ENV_ACCEPTED_TYPES),
    ("poll_interval_secs", ENV_POLL_INTERVAL_SECS),
    ("poll_max_attempts", ENV_POLL_MAX_ATTEMPTS),
    ("poll_initial_delay_ms", ENV_POLL_INITIAL_DELAY_MS),
];

/// CLI configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub server_url: String,

    /// Explicit bearer token. When unset, `DOCFLOW_TOKEN` is read on every
    /// request instead.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    pub api_timeout_secs: u64,
    pub max_file_size: u64,
    pub max_files: usize,
    pub accepted_types: Vec<String>,
    pub poll_interval_secs: u64,
    pub poll_max_attempts: u32,
    pub poll_initial_delay_ms: u64,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("server_url", &self.server_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_file_size", &self.max_file_size)
            .field("max_files", &self.max_files)
            .field("accepted_types", &self.accepted_types)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("poll_max_attempts", &self.poll_max_attempts)
            .field("poll_initial_delay_ms", &self.poll_initial_delay_ms)
            .finish()
    }
}

impl Config {
    /// Create a new config with default values
    pub fn new() -> Self {
        let poll = PollConfig::default();
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            token: None,
            api_timeout_secs: crate::api::client::DEFAULT_API_TIMEOUT_SECS,
            max_file_size: validation::DEFAULT_MAX_FILE_SIZE,
            max_files: validation::DEFAULT_MAX_FILES,
            accepted_types: validation::DEFAULT_ACCEPTED_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            poll_interval_secs: poll.interval.as_secs(),
            poll_max_attempts: poll.max_attempts,
            poll_initial_delay_ms: poll.initial_delay.as_millis() as u64,
        }
    }

    /// Load config from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::new();

        if let Some(url) = env_string(ENV_SERVER_URL) {
            config.server_url = url;
        }

        if let Some(v) = env_parse(ENV_API_TIMEOUT_SECS)? {
            config.api_timeout_secs = v;
        }
        if let Some(v) = env_parse(ENV_MAX_FILE_SIZE)? {
            config.max_file_size = v;
        }
        if let Some(v) = env_parse(ENV_MAX_FILES)? {
            config.max_files = v;
        }
        if let Some(types) = env_string(ENV_ACCEPTED_TYPES) {
            config.accepted_types = parse_type_list(&types)?;
        }
        if let Some(v) = env_parse(ENV_POLL_INTERVAL_SECS)? {
            config.poll_interval_secs = v;
        }
        if let Some(v) = env_parse(ENV_POLL_MAX_ATTEMPTS)? {
            config.poll_max_attempts = v;
        }
        if let Some(v) = env_parse(ENV_POLL_INITIAL_DELAY_MS)? {
            config.poll_initial_delay_ms = v;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.poll_max_attempts == 0 {
            return Err(CliError::config(format!(
                "{ENV_POLL_MAX_ATTEMPTS} must be at least 1"
            )));
        }
        if self.max_files == 0 {
            return Err(CliError::config(format!("{ENV_MAX_FILES} must be at least 1")));
        }
        if self.api_timeout_secs == 0 {
            return Err(CliError::config(format!(
                "{ENV_API_TIMEOUT_SECS} must be at least 1"
            )));
        }
        Ok(())
    }

    /// Get the server URL
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Set the server URL
    pub fn set_server_url(&mut self, url: String) {
        self.server_url = url;
    }

    pub fn api_timeout_secs(&self) -> u64 {
        self.api_timeout_secs
    }

    /// Use a fixed token instead of reading `DOCFLOW_TOKEN` per request
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn validation_options(&self) -> ValidationOptions {
        ValidationOptions {
            accepted_types: self.accepted_types.clone(),
            max_file_size: self.max_file_size,
            max_files: self.max_files,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            initial_delay: Duration::from_millis(self.poll_initial_delay_ms),
            interval: Duration::from_secs(self.poll_interval_secs),
            max_attempts: self.poll_max_attempts,
        }
    }

    pub fn credentials(&self) -> Arc<dyn CredentialProvider> {
        match &self.token {
            Some(token) => Arc::new(StaticToken::new(token.clone())),
            None => Arc::new(EnvToken::new(ENV_TOKEN)),
        }
    }

    /// Display value for a `config get` key. The token is masked.
    pub fn get(&self, key: &str) -> Option<String> {
        let value = match key {
            "server_url" => self.server_url.clone(),
            "token" if self.token.is_some() || env_string(ENV_TOKEN).is_some() => {
                "***".to_string()
            },
            "token" => "(not set)".to_string(),
            "api_timeout_secs" => self.api_timeout_secs.to_string(),
            "max_file_size" => self.max_file_size.to_string(),
            "max_files" => self.max_files.to_string(),
            "accepted_types" => self.accepted_types.join(","),
            "poll_interval_secs" => self.poll_interval_secs.to_string(),
            "poll_max_attempts" => self.poll_max_attempts.to_string(),
            "poll_initial_delay_ms" => self.poll_initial_delay_ms.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variable backing a config key
pub fn env_var_for(key: &str) -> Option<&'static str> {
    KEYS.iter().find(|(k, _)| *k == key).map(|(_, var)| *var)
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| CliError::config(format!("{var}='{raw}' is not valid: {e}"))),
        None => Ok(None),
    }
}

fn parse_type_list(raw: &str) -> Result<Vec<String>> {
    let types: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(bad) = types.iter().find(|t| t.parse::<mime::Mime>().is_err()) {
        return Err(CliError::config(format!(
            "{ENV_ACCEPTED_TYPES} contains '{bad}', which is not a MIME type"
        )));
    }
    if types.is_empty() {
        return Err(CliError::config(format!("{ENV_ACCEPTED_TYPES} is empty")));
    }
    Ok(types)
}
