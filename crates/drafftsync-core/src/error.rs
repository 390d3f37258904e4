//! Error types for synchronization operations.

use thiserror::Error;

use crate::storage::StorageError;

/// Synchronization errors.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),
    #[error("CRDT error: {0}")]
    Crdt(#[from] loro::LoroError),
    #[error("Encode error: {0}")]
    Encode(String),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;
