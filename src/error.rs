//! Error handling module for pdi-setup
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Classification outcomes are never errors: unknown or already installed
//! identifiers are reported through the notifier. These types cover the
//! conditions that stop a run. File and config loading in the CLI layer
//! uses `anyhow` with context instead.

use thiserror::Error;

/// Main error type for pdi-setup
#[derive(Error, Debug)]
pub enum PdiSetupError {
    /// Invalid input handed to the classifier
    #[error("Validation error: {0}")]
    Validation(String),

    /// A record lookup could not be answered by the instance
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// The batch installer rejected or failed the submission
    #[error("Batch submission failed: {0}")]
    Submission(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pdi-setup operations
pub type Result<T> = std::result::Result<T, PdiSetupError>;

// Convenient error constructors
impl PdiSetupError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a lookup error
    pub fn lookup(msg: impl Into<String>) -> Self {
        Self::Lookup(msg.into())
    }

    /// Create a submission error
    pub fn submission(msg: impl Into<String>) -> Self {
        Self::Submission(msg.into())
    }
}
