//! Binary save, load and merge of CRDT documents.
//!
//! Saved blobs are Loro snapshots: full content plus the history needed to
//! merge with any other copy of the document later. They are opaque bytes
//! (`application/octet-stream`) with no required file extension.

use crate::crdt::CrdtDocument;
use crate::error::{SyncError, SyncResult};

/// MIME type for exported documents.
pub const CONTENT_TYPE: &str = "application/octet-stream";

/// Serialize the full document, content and history.
pub fn save(doc: &CrdtDocument) -> SyncResult<Vec<u8>> {
    let bytes = doc.export_snapshot()?;
    log::info!("Saved document ({} records, {} bytes)", doc.len(), bytes.len());
    Ok(bytes)
}

/// Deserialize a blob into a standalone document.
pub fn load(bytes: &[u8]) -> SyncResult<CrdtDocument> {
    if bytes.is_empty() {
        return Err(SyncError::CorruptDocument("empty input".into()));
    }
    let mut doc = CrdtDocument::new();
    doc.import(bytes)?;
    Ok(doc)
}

/// Combine two documents into a new one. Neither input is modified.
///
/// The inputs may or may not share history. Conflict resolution is Loro's;
/// the merged content does not depend on argument order.
pub fn merge(local: &CrdtDocument, remote: &CrdtDocument) -> SyncResult<CrdtDocument> {
    let mut merged = local.fork();
    let updates = remote.export_updates(&merged.version())?;
    merged.import(&updates)?;
    log::info!(
        "Merged documents: {} + {} -> {} records",
        local.len(),
        remote.len(),
        merged.len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::project;
    use crate::record::{Record, RecordId};
    use crate::store::StoreDiff;
    use serde_json::json;

    fn shape(id: &str, x: i64) -> Record {
        Record::from_value(json!({ "id": id, "typeName": "shape", "x": x, "y": 0 })).unwrap()
    }

    fn doc_with(records: &[Record]) -> CrdtDocument {
        let mut doc = CrdtDocument::new();
        project(
            &mut doc,
            &StoreDiff {
                added: records.to_vec(),
                ..StoreDiff::default()
            },
        )
        .unwrap();
        doc
    }

    fn edit(doc: &mut CrdtDocument, old: Record, new: Record) {
        project(
            doc,
            &StoreDiff {
                updated: vec![(old, new)],
                ..StoreDiff::default()
            },
        )
        .unwrap();
    }

    #[test]
    fn test_save_load_roundtrip() {
        let doc = doc_with(&[shape("shape:1", 1), shape("shape:2", 2)]);

        let loaded = load(&save(&doc).unwrap()).unwrap();

        assert_eq!(loaded.records(), doc.records());
    }

    #[test]
    fn test_roundtrip_of_empty_document() {
        let doc = CrdtDocument::new();
        let loaded = load(&save(&doc).unwrap()).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(load(b""), Err(SyncError::CorruptDocument(_))));
        assert!(matches!(
            load(b"definitely not a loro document"),
            Err(SyncError::CorruptDocument(_))
        ));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let doc = doc_with(&[shape("shape:1", 1)]);

        let merged = merge(&doc, &doc).unwrap();

        assert_eq!(merged.records(), doc.records());
        assert_eq!(merged.version(), doc.version());
    }

    #[test]
    fn test_merge_is_commutative() {
        let base = doc_with(&[shape("shape:1", 0), shape("shape:2", 0)]);
        let mut a = base.fork();
        let mut b = base.fork();

        edit(&mut a, shape("shape:1", 0), shape("shape:1", 10));
        project(
            &mut a,
            &StoreDiff {
                added: vec![shape("shape:a", 1)],
                ..StoreDiff::default()
            },
        )
        .unwrap();
        edit(&mut b, shape("shape:1", 0), shape("shape:1", 20));
        project(
            &mut b,
            &StoreDiff {
                removed: vec![RecordId::from("shape:2")],
                ..StoreDiff::default()
            },
        )
        .unwrap();

        let ab = merge(&a, &b).unwrap();
        let ba = merge(&b, &a).unwrap();

        assert_eq!(ab.records(), ba.records());
        assert_eq!(ab.len(), 2);
        assert!(ab.contains(&RecordId::from("shape:a")));
        assert!(!ab.contains(&RecordId::from("shape:2")));
    }

    #[test]
    fn test_merge_leaves_inputs_untouched() {
        let local = doc_with(&[shape("shape:1", 1)]);
        let remote = doc_with(&[shape("shape:2", 2)]);

        let merged = merge(&local, &remote).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(local.len(), 1);
        assert_eq!(remote.len(), 1);
    }

    #[test]
    fn test_merge_via_saved_blob() {
        let local = doc_with(&[shape("shape:1", 1)]);
        let mut remote = local.fork();
        edit(&mut remote, shape("shape:1", 1), shape("shape:1", 7));

        let foreign = load(&save(&remote).unwrap()).unwrap();
        let merged = merge(&local, &foreign).unwrap();

        assert_eq!(
            merged.get_record(&RecordId::from("shape:1")).unwrap().get("x"),
            Some(&json!(7))
        );
    }
}
