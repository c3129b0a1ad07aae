//! Error types for tfengine

use std::time::Duration;

/// Error type for tfengine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Template parse error in {source_text:?}: {message}")]
    TemplateParse {
        source_text: String,
        message: String,
    },

    #[error("Interpolation error: {0}")]
    Interpolation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    #[error("Resource type not found: {0}")]
    ResourceNotFound(String),

    #[error("Data source type not found: {0}")]
    DataSourceNotFound(String),

    #[error("Inconsistent diff: {0}")]
    InconsistentDiff(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Decoding error: {0}")]
    DecodingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Custom(String),
}

/// Result type alias for tfengine operations
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    /// True for failures that the provider never got a chance to report itself
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::Timeout(_) | EngineError::Cancelled)
    }
}

impl From<String> for EngineError {
    fn from(s: String) -> Self {
        EngineError::Custom(s)
    }
}

impl From<&str> for EngineError {
    fn from(s: &str) -> Self {
        EngineError::Custom(s.to_string())
    }
}
