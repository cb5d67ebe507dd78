//! Error types for Docflow

use thiserror::Error;

/// Result type alias for Docflow operations
pub type Result<T> = std::result::Result<T, DocflowError>;

/// Main error type for Docflow
#[derive(Error, Debug)]
pub enum DocflowError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}
