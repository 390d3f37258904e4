//! Loro document schema and record operations.

use loro::{Container, ExportMode, LoroDoc, LoroMap, LoroValue, ValueOrContainer, VersionVector};
use serde_json::Value;

use super::convert::{fill_map, loro_to_json};
use super::reconcile::reconcile_map;
use crate::error::{SyncError, SyncResult};
use crate::record::{KEY_ID, Record, RecordId, RecordSet};

/// Key for the records map in the document.
pub const RECORDS_KEY: &str = "records";

/// A CRDT-backed record document.
///
/// Wraps a `LoroDoc` whose `records` map holds one nested map per record.
/// Mutations are staged until [`CrdtDocument::commit`] is called, so every
/// batch of edits between two commits becomes a single change in the history.
pub struct CrdtDocument {
    doc: LoroDoc,
}

impl CrdtDocument {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self { doc: LoroDoc::new() }
    }

    fn records_map(&self) -> LoroMap {
        self.doc.get_map(RECORDS_KEY)
    }

    /// Number of records in the document.
    pub fn len(&self) -> usize {
        self.records_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records_map().get(id.as_str()).is_some()
    }

    /// Read a single record as a plain value.
    pub fn get_record(&self, id: &RecordId) -> Option<Record> {
        match self.records_map().get_deep_value() {
            LoroValue::Map(map) => record_from_loro(id.as_str(), map.get(id.as_str())?),
            _ => None,
        }
    }

    /// Read every record, stripped of CRDT metadata.
    pub fn records(&self) -> RecordSet {
        let mut set = RecordSet::new();
        if let LoroValue::Map(map) = self.records_map().get_deep_value() {
            for (key, value) in map.iter() {
                match record_from_loro(key, value) {
                    Some(record) => {
                        set.insert(record.id().clone(), record);
                    }
                    None => log::warn!("Skipping malformed record {}", key),
                }
            }
        }
        set
    }

    /// Stage the full payload of `record` under its id, replacing any previous value.
    pub fn insert_record(&mut self, record: &Record) -> SyncResult<()> {
        record.validate()?;
        let map = self
            .records_map()
            .insert_container(record.id().as_str(), LoroMap::new())?;
        fill_map(&map, record.fields())?;
        Ok(())
    }

    /// Stage an update of `record`, reconciling field by field.
    ///
    /// Returns `false` when the id was absent and the record was inserted instead.
    pub fn update_record(&mut self, record: &Record) -> SyncResult<bool> {
        record.validate()?;
        match self.records_map().get(record.id().as_str()) {
            Some(ValueOrContainer::Container(Container::Map(map))) => {
                reconcile_map(&map, record.fields())?;
                Ok(true)
            }
            Some(_) => {
                self.insert_record(record)?;
                Ok(true)
            }
            None => {
                self.insert_record(record)?;
                Ok(false)
            }
        }
    }

    /// Stage the removal of a record. Returns whether it existed.
    pub fn delete_record(&mut self, id: &RecordId) -> SyncResult<bool> {
        let records = self.records_map();
        if records.get(id.as_str()).is_none() {
            return Ok(false);
        }
        records.delete(id.as_str())?;
        Ok(true)
    }

    /// Run `f` against a staging copy and commit its edits as one change.
    ///
    /// The copy replaces this document only if `f` succeeds. On error nothing
    /// `f` staged survives. The copy keeps this document's peer id, so a
    /// successful transaction reads as a local edit in the history.
    pub fn transact<T>(&mut self, f: impl FnOnce(&mut Self) -> SyncResult<T>) -> SyncResult<T> {
        self.commit();
        let mut staging = self.fork();
        staging.doc.set_peer_id(self.peer_id())?;
        let value = f(&mut staging)?;
        staging.commit();
        *self = staging;
        Ok(value)
    }

    /// Commit staged mutations as one change.
    pub fn commit(&mut self) {
        self.doc.commit();
    }

    /// Export the full document (content and history).
    pub fn export_snapshot(&self) -> SyncResult<Vec<u8>> {
        self.doc
            .export(ExportMode::Snapshot)
            .map_err(|e| SyncError::Encode(e.to_string()))
    }

    /// Export the changes this document has that `since` does not.
    pub fn export_updates(&self, since: &VersionVector) -> SyncResult<Vec<u8>> {
        self.doc
            .export(ExportMode::updates(since))
            .map_err(|e| SyncError::Encode(e.to_string()))
    }

    /// Import a snapshot or update blob produced by another document.
    pub fn import(&mut self, bytes: &[u8]) -> SyncResult<()> {
        self.doc
            .import(bytes)
            .map_err(|e| SyncError::CorruptDocument(e.to_string()))?;
        Ok(())
    }

    /// Independent copy of this document sharing its full history.
    pub fn fork(&self) -> Self {
        Self { doc: self.doc.fork() }
    }

    /// Get the current version vector.
    pub fn version(&self) -> VersionVector {
        self.doc.oplog_vv()
    }

    pub fn peer_id(&self) -> u64 {
        self.doc.peer_id()
    }
}

impl Default for CrdtDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CrdtDocument {
    fn clone(&self) -> Self {
        self.fork()
    }
}

impl std::fmt::Debug for CrdtDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrdtDocument")
            .field("peer_id", &self.peer_id())
            .field("records", &self.len())
            .finish()
    }
}

/// Payloads written by older documents may lack an `id` field; the map key fills it in.
fn record_from_loro(key: &str, value: &LoroValue) -> Option<Record> {
    let mut json = loro_to_json(value);
    if let Value::Object(fields) = &mut json {
        fields
            .entry(KEY_ID)
            .or_insert_with(|| Value::String(key.to_string()));
    }
    Record::from_value(json).ok()
}
