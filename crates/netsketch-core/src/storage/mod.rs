//! Storage abstraction for persistence.

mod autosave;
mod file;
mod memory;
mod persistence;

pub use autosave::{AutoSaveManager, DEFAULT_AUTOSAVE_INTERVAL_SECS};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use persistence::{
    PersistedDocument, PersistedState, PersistenceAdapter, PersistenceError, SCHEMA_VERSION,
    STATE_STORAGE_KEY, decode_document, encode_document,
};

use std::sync::Arc;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// A durable key-value medium holding serialized documents.
///
/// Implementations can keep documents in memory or on the filesystem.
pub trait Storage: Send + Sync {
    /// Write `contents` under `key`, replacing any previous value.
    fn write(&self, key: &str, contents: &str) -> StorageResult<()>;

    /// Read the value stored under `key`.
    fn read(&self, key: &str) -> StorageResult<String>;

    /// Delete the value stored under `key`. Missing keys are not an error.
    fn delete(&self, key: &str) -> StorageResult<()>;

    /// List all stored keys.
    fn list(&self) -> StorageResult<Vec<String>>;

    /// Check if a key exists.
    fn exists(&self, key: &str) -> StorageResult<bool>;
}

/// Create the platform storage in its default location.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}
