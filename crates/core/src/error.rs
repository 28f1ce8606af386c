//! Core Error Types
//!
//! The minimal error set shared across the Quillspace AI workspace. Layer
//! boundaries (provider adapters, model manager, workflows) each define
//! richer error enums; everything that touches configuration, wiring, or
//! parsing bottoms out in `CoreError`.

use thiserror::Error;

/// Core error type for the Quillspace AI workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration errors (missing provider, bad threshold, unknown chain entry)
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors (config file reads)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Parse errors (TOML config, SQL text)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Lookup failures (unknown provider or model id)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
