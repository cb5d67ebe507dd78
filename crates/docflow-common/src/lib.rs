//! Docflow Common Library
//!
//! Shared types, utilities, and error handling for the Docflow project.
//!
//! # Overview
//!
//! This crate provides common functionality used across all Docflow workspace members:
//!
//! - **Error Handling**: Custom error types and result types
//! - **Types**: The wire contract with the document processing backend
//! - **Logging**: Centralized tracing setup
//!
//! # Example
//!
//! ```no_run
//! use docflow_common::types::{RemotePhase, StatusResponse};
//!
//! fn describe(body: &[u8]) -> docflow_common::Result<()> {
//!     let status = StatusResponse::from_slice(body)?;
//!     if status.status == RemotePhase::Completed {
//!         println!("done");
//!     }
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{DocflowError, Result};
