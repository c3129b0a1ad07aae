use std::path::PathBuf;
use tfengine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse server configuration: {0}")]
    Parse(#[from] hcl::Error),

    #[error("Invalid value for {name}: {message}")]
    InvalidAttribute { name: String, message: String },

    #[error("Unexpected argument {0:?}")]
    UnexpectedAttribute(String),

    #[error("Unexpected block {0:?}")]
    UnexpectedBlock(String),

    #[error("Provider block needs exactly one name label")]
    MissingLabel,

    #[error("Duplicate provider name {0:?}")]
    DuplicateProvider(String),

    #[error("Unknown builtin provider {0:?}")]
    UnknownBuiltin(String),

    #[error("Provider {name}: {message}")]
    Provider { name: String, message: String },

    #[error("Provider configuration error: {0}")]
    Engine(#[from] EngineError),
}
