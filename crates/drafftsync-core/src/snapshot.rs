//! Rebuilding the record store from CRDT content.

use serde_json::{Map, Value, json};

use crate::config::SyncConfig;
use crate::crdt::CrdtDocument;
use crate::error::SyncResult;
use crate::record::{Record, RecordSet};
use crate::store::{ChangeSource, RecordStore};

/// Reconstruct the full record set held by `doc`.
pub fn rebuild(doc: &CrdtDocument) -> RecordSet {
    doc.records()
}

/// The minimal document every drawing needs: one document root and one page.
pub fn scaffold_records(config: &SyncConfig) -> Vec<Record> {
    vec![
        Record::new(
            config.document_id(),
            fields(json!({ "gridSize": 10, "name": "", "meta": {} })),
        ),
        Record::new(
            config.page_id(),
            fields(json!({
                "name": config.page_name,
                "index": config.page_index,
                "meta": {}
            })),
        ),
    ]
}

/// Prepare `doc` and `store` for editing.
///
/// Seeds the scaffold into the document only when it is empty, so running
/// this again against a populated document never duplicates scaffold
/// records. The store is then refreshed from the document.
pub fn cold_start(
    doc: &mut CrdtDocument,
    store: &mut RecordStore,
    config: &SyncConfig,
) -> SyncResult<()> {
    if doc.is_empty() {
        log::info!("Seeding empty document with default scaffold");
        for record in scaffold_records(config) {
            doc.insert_record(&record)?;
        }
        doc.commit();
    }
    refresh(doc, store);
    Ok(())
}

/// Replace the store's content wholesale with what `doc` holds.
///
/// Afterwards the store holds exactly `rebuild(doc)`. Session-scoped records
/// are dropped as well; callers that want them back re-put them. The change
/// is tagged [`ChangeSource::Remote`] so it never flows back into the document.
pub fn refresh(doc: &CrdtDocument, store: &mut RecordStore) {
    let next = rebuild(doc);
    log::debug!("Refreshing store with {} records", next.len());
    store.replace_all(next, ChangeSource::Remote);
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
