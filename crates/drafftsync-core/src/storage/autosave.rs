//! Auto-save functionality for document persistence.
//!
//! Tracks unsaved changes and writes binary snapshots of the CRDT document to
//! a storage backend at most once per interval.

use crate::config::DEFAULT_AUTOSAVE_INTERVAL_SECS;
use crate::crdt::CrdtDocument;
use crate::error::SyncResult;
use crate::persistence;
use crate::storage::{BlobStorage, FileStorage, StorageResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key for the "last opened" document.
pub const LAST_DOCUMENT_KEY: &str = "__last_document__";

/// Manages automatic document persistence.
pub struct AutoSaveManager<S: BlobStorage> {
    storage: Arc<S>,
    interval: Duration,
    last_save: Option<Instant>,
    dirty: bool,
    /// Current document ID being edited.
    current_doc_id: Option<String>,
}

impl<S: BlobStorage> AutoSaveManager<S> {
    /// Create a new auto-save manager with the given storage backend.
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            interval: Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS),
            last_save: None,
            dirty: false,
            current_doc_id: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Mark the document as having unsaved changes.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_document_id(&mut self, id: Option<String>) {
        self.current_doc_id = id;
    }

    pub fn document_id(&self) -> Option<&str> {
        self.current_doc_id.as_deref()
    }

    /// Check if enough time has passed for an auto-save.
    pub fn should_save(&self) -> bool {
        if !self.dirty {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Save the document if needed (dirty + interval elapsed).
    /// Returns true if a save was performed.
    pub async fn maybe_save(&mut self, document: &CrdtDocument) -> SyncResult<bool> {
        if !self.should_save() {
            return Ok(false);
        }

        self.save(document).await?;
        Ok(true)
    }

    /// Force save the document immediately.
    ///
    /// Without a current document id the blob is only written under
    /// [`LAST_DOCUMENT_KEY`].
    pub async fn save(&mut self, document: &CrdtDocument) -> SyncResult<()> {
        let bytes = persistence::save(document)?;

        if let Some(id) = &self.current_doc_id {
            self.storage.save(id, &bytes).await?;
        }
        self.storage.save(LAST_DOCUMENT_KEY, &bytes).await?;

        self.last_save = Some(Instant::now());
        self.dirty = false;
        Ok(())
    }

    /// Load a document by ID and make it the current one.
    pub async fn load(&mut self, id: &str) -> SyncResult<CrdtDocument> {
        let bytes = self.storage.load(id).await?;
        let doc = persistence::load(&bytes)?;
        self.current_doc_id = Some(id.to_string());
        self.dirty = false;
        self.last_save = Some(Instant::now());
        Ok(doc)
    }

    /// Try to load the last saved document.
    /// Returns None if no readable last document exists.
    pub async fn load_last(&mut self) -> Option<CrdtDocument> {
        let bytes = self.storage.load(LAST_DOCUMENT_KEY).await.ok()?;
        match persistence::load(&bytes) {
            Ok(doc) => {
                self.dirty = false;
                self.last_save = Some(Instant::now());
                Some(doc)
            }
            Err(e) => {
                log::warn!("Ignoring unreadable last document: {}", e);
                None
            }
        }
    }

    /// Delete a document by ID.
    pub async fn delete(&self, id: &str) -> StorageResult<()> {
        self.storage.delete(id).await
    }

    /// List all saved document IDs.
    pub async fn list_documents(&self) -> StorageResult<Vec<String>> {
        let mut docs = self.storage.list().await?;
        docs.retain(|id| id != LAST_DOCUMENT_KEY);
        Ok(docs)
    }

    /// Check if a document exists.
    pub async fn exists(&self, id: &str) -> StorageResult<bool> {
        self.storage.exists(id).await
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }
}

/// Create the default file storage backend.
pub fn create_default_storage() -> StorageResult<Arc<FileStorage>> {
    Ok(Arc::new(FileStorage::default_location()?))
}

/// Convenience function to create an auto-save manager with default storage.
pub fn create_autosave_manager() -> StorageResult<AutoSaveManager<FileStorage>> {
    Ok(AutoSaveManager::new(create_default_storage()?))
}
