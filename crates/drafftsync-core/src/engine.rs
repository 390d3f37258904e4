//! Synchronization engine between a record store and a CRDT document.
//!
//! The engine owns exactly one [`CrdtDocument`]. User edits reach it through
//! a store subscription which queues each [`StoreDiff`]; [`SyncEngine::flush`]
//! projects queued diffs strictly in emission order, one transaction per diff.
//! Loading and merging build a complete new document first and swap it in
//! only once every fallible step has succeeded.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::SyncConfig;
use crate::crdt::CrdtDocument;
use crate::error::SyncResult;
use crate::persistence;
use crate::project::project;
use crate::snapshot;
use crate::storage::BlobStorage;
use crate::store::{ListenFilter, RecordStore, StoreDiff, Subscription};

/// Keeps a record store and a CRDT document in step.
pub struct SyncEngine {
    document: CrdtDocument,
    config: SyncConfig,
    /// Diffs received from the store and not yet projected.
    pending: Rc<RefCell<VecDeque<StoreDiff>>>,
    subscription: Option<Subscription>,
}

impl SyncEngine {
    /// Create an engine around a new empty document.
    pub fn new(config: SyncConfig) -> Self {
        Self::with_document(CrdtDocument::new(), config)
    }

    /// Create an engine around an existing document (e.g. loaded from storage).
    pub fn with_document(document: CrdtDocument, config: SyncConfig) -> Self {
        Self {
            document,
            config,
            pending: Rc::new(RefCell::new(VecDeque::new())),
            subscription: None,
        }
    }

    pub fn document(&self) -> &CrdtDocument {
        &self.document
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Subscribe to user edits of document records in `store`.
    ///
    /// Changes the engine itself applies to the store are tagged as remote
    /// and never come back through this subscription.
    pub fn attach(&mut self, store: &mut RecordStore) -> Subscription {
        if let Some(previous) = self.subscription.take() {
            store.unsubscribe(previous);
        }
        let queue = self.pending.clone();
        let subscription = store.subscribe(ListenFilter::user_document(), move |diff| {
            queue.borrow_mut().push_back(diff.clone());
        });
        self.subscription = Some(subscription);
        subscription
    }

    /// Stop listening to `store`.
    pub fn detach(&mut self, store: &mut RecordStore) {
        if let Some(subscription) = self.subscription.take() {
            store.unsubscribe(subscription);
        }
    }

    /// Number of diffs waiting to be projected.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Project every queued diff into the document, oldest first.
    ///
    /// A diff that fails is dropped without touching the document and the
    /// error is returned. Later diffs stay queued for the next flush.
    pub fn flush(&mut self) -> SyncResult<usize> {
        let mut projected = 0;
        loop {
            let Some(diff) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            if let Err(e) = project(&mut self.document, &diff) {
                log::error!("Dropped store diff that failed to project: {}", e);
                return Err(e);
            }
            projected += 1;
        }
        Ok(projected)
    }

    /// Seed the scaffold if the document is empty and load it into `store`.
    pub fn cold_start(&mut self, store: &mut RecordStore) -> SyncResult<()> {
        self.flush()?;
        snapshot::cold_start(&mut self.document, store, &self.config)?;
        log::info!("Cold start complete with {} records", self.document.len());
        Ok(())
    }

    /// Serialize the current document after projecting pending edits.
    pub fn save(&mut self) -> SyncResult<Vec<u8>> {
        self.flush()?;
        persistence::save(&self.document)
    }

    /// Merge a foreign blob into the document and refresh `store` from the result.
    ///
    /// A blob that fails to load leaves both the document and the store untouched.
    pub fn import(&mut self, bytes: &[u8], store: &mut RecordStore) -> SyncResult<()> {
        self.flush()?;
        let remote = persistence::load(bytes).inspect_err(|e| {
            log::warn!("Rejected import: {}", e);
        })?;
        let merged = persistence::merge(&self.document, &remote)?;
        self.replace_document(merged, store);
        Ok(())
    }

    /// Read a blob from `storage` and import it.
    ///
    /// Nothing is modified until the read has completed, so dropping the
    /// returned future early leaves the engine as it was.
    pub async fn import_from<S: BlobStorage + ?Sized>(
        &mut self,
        storage: &S,
        id: &str,
        store: &mut RecordStore,
    ) -> SyncResult<()> {
        let bytes = storage.load(id).await?;
        self.import(&bytes, store)
    }

    /// Save the current document to `storage` under `id`.
    pub async fn export_to<S: BlobStorage + ?Sized>(&mut self, storage: &S, id: &str) -> SyncResult<()> {
        let bytes = self.save()?;
        storage.save(id, &bytes).await?;
        Ok(())
    }

    /// Swap in a new document and mirror it into `store`. Returns the old document.
    pub fn replace_document(&mut self, document: CrdtDocument, store: &mut RecordStore) -> CrdtDocument {
        let previous = std::mem::replace(&mut self.document, document);
        snapshot::refresh(&self.document, store);
        previous
    }
}
