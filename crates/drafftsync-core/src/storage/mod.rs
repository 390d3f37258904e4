//! Storage abstraction for saved document blobs.

mod autosave;
mod file;
mod memory;

pub use autosave::{AutoSaveManager, LAST_DOCUMENT_KEY, create_autosave_manager, create_default_storage};
pub use file::{DOCUMENT_EXTENSION, FileStorage};
pub use memory::MemoryStorage;

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for blob storage backends.
///
/// Documents are stored as opaque binary snapshots keyed by a document id.
pub trait BlobStorage: Send + Sync {
    /// Save a document blob.
    fn save(&self, id: &str, bytes: &[u8]) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a document blob.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Vec<u8>>>;

    /// Delete a document.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all document IDs.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a document exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
