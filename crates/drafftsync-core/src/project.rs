//! Projection of store diffs into CRDT transactions.

use crate::crdt::CrdtDocument;
use crate::error::SyncResult;
use crate::store::StoreDiff;

/// Apply one store diff to `doc` as a single committed change.
///
/// Added records are written in full and removed records are deleted.
/// Updated records are reconciled field by field against what the document
/// holds. An update for a record the document does not know is written as an
/// insert. If any part of the diff fails, `doc` is left as it was.
pub fn project(doc: &mut CrdtDocument, diff: &StoreDiff) -> SyncResult<()> {
    if diff.is_empty() {
        return Ok(());
    }

    doc.transact(|doc| {
        for record in &diff.added {
            doc.insert_record(record)?;
        }
        for (_, record) in &diff.updated {
            if !doc.update_record(record)? {
                log::warn!("Update for unknown record {}, inserted instead", record.id());
            }
        }
        for id in &diff.removed {
            doc.delete_record(id)?;
        }
        Ok(())
    })?;

    log::debug!(
        "Projected diff: {} added, {} updated, {} removed",
        diff.added.len(),
        diff.updated.len(),
        diff.removed.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::record::{Record, RecordId};
    use serde_json::json;

    fn shape(id: &str, x: i64) -> Record {
        Record::from_value(json!({
            "id": id,
            "typeName": "shape",
            "x": x,
            "props": { "w": 10, "h": 10 }
        }))
        .unwrap()
    }

    fn seeded(records: &[Record]) -> CrdtDocument {
        let mut doc = CrdtDocument::new();
        for record in records {
            doc.insert_record(record).unwrap();
        }
        doc.commit();
        doc
    }

    #[test]
    fn test_entry_count_after_projection() {
        let mut doc = seeded(&[shape("shape:1", 0), shape("shape:2", 0), shape("shape:3", 0)]);
        let diff = StoreDiff {
            added: vec![shape("shape:4", 4), shape("shape:5", 5)],
            updated: vec![(shape("shape:1", 0), shape("shape:1", 100))],
            removed: vec![RecordId::from("shape:2")],
        };

        project(&mut doc, &diff).unwrap();

        assert_eq!(doc.len(), 3 + 2 - 1);
        let records = doc.records();
        assert_eq!(records[&RecordId::from("shape:1")].get("x"), Some(&json!(100)));
        assert_eq!(records[&RecordId::from("shape:4")], shape("shape:4", 4));
        assert!(!records.contains_key(&RecordId::from("shape:2")));
    }

    #[test]
    fn test_update_of_unknown_record_is_inserted() {
        let mut doc = CrdtDocument::new();
        let diff = StoreDiff {
            updated: vec![(shape("shape:9", 0), shape("shape:9", 9))],
            ..StoreDiff::default()
        };

        project(&mut doc, &diff).unwrap();

        assert_eq!(doc.get_record(&RecordId::from("shape:9")), Some(shape("shape:9", 9)));
    }

    #[test]
    fn test_update_preserves_fields_added_by_other_replica() {
        let mut doc = seeded(&[shape("shape:1", 0)]);
        let mut other = doc.fork();
        let mut annotated = shape("shape:1", 0);
        annotated.set("meta", json!({ "label": "from peer" }));
        project(
            &mut other,
            &StoreDiff {
                updated: vec![(shape("shape:1", 0), annotated)],
                ..StoreDiff::default()
            },
        )
        .unwrap();

        project(
            &mut doc,
            &StoreDiff {
                updated: vec![(shape("shape:1", 0), shape("shape:1", 50))],
                ..StoreDiff::default()
            },
        )
        .unwrap();
        doc.import(&other.export_updates(&doc.version()).unwrap()).unwrap();

        let merged = doc.get_record(&RecordId::from("shape:1")).unwrap();
        assert_eq!(merged.get("x"), Some(&json!(50)));
        assert_eq!(merged.get("meta"), Some(&json!({ "label": "from peer" })));
    }

    #[test]
    fn test_empty_diff_leaves_version_untouched() {
        let mut doc = seeded(&[shape("shape:1", 0)]);
        let before = doc.version();

        project(&mut doc, &StoreDiff::default()).unwrap();

        assert_eq!(doc.version(), before);
    }

    #[test]
    fn test_failing_diff_leaves_document_untouched() {
        let mut doc = seeded(&[shape("shape:1", 0), shape("shape:2", 0)]);
        let before = doc.version();
        let peer = doc.peer_id();
        let mut oversized = shape("shape:1", 0);
        oversized.set("seed", json!(u64::MAX));
        let diff = StoreDiff {
            added: vec![shape("shape:3", 3)],
            updated: vec![(shape("shape:1", 0), oversized)],
            removed: vec![RecordId::from("shape:2")],
        };

        let result = project(&mut doc, &diff);

        assert!(matches!(result, Err(SyncError::InvalidRecord(_))));
        assert_eq!(doc.version(), before);
        assert_eq!(doc.peer_id(), peer);
        assert_eq!(doc.len(), 2);
        assert!(!doc.contains(&RecordId::from("shape:3")));
        assert_eq!(doc.get_record(&RecordId::from("shape:1")), Some(shape("shape:1", 0)));
    }

    #[test]
    fn test_projection_keeps_peer_id() {
        let mut doc = seeded(&[shape("shape:1", 0)]);
        let peer = doc.peer_id();

        project(
            &mut doc,
            &StoreDiff {
                added: vec![shape("shape:2", 2)],
                ..StoreDiff::default()
            },
        )
        .unwrap();

        assert_eq!(doc.peer_id(), peer);
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_large_integers_survive_projection() {
        let mut doc = CrdtDocument::new();
        let mut record = shape("shape:1", 0);
        record.set("seed", json!(i64::MAX));

        project(
            &mut doc,
            &StoreDiff {
                added: vec![record.clone()],
                ..StoreDiff::default()
            },
        )
        .unwrap();

        assert_eq!(doc.get_record(record.id()), Some(record));
    }
}
