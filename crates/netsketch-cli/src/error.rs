use std::path::PathBuf;

use netsketch_core::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid diagram file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown {kind} `{id}`")]
    NotFound { kind: &'static str, id: String },
    #[error("{0}")]
    Rejected(String),
    #[error("Failed to save the diagram")]
    SaveFailed,
}

pub type CliResult<T> = Result<T, CliError>;
