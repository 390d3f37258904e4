//! Structural reconciliation of a Loro container against a new JSON value.
//!
//! Instead of replacing a record wholesale, the reconciler walks the new
//! payload and only writes the scalar fields and list elements that actually
//! changed. Loro tracks history per field, so untouched paths keep whatever a
//! concurrent replica wrote to them.
//!
//! Keys present in the target but missing from the source are kept. Type
//! mismatches (object replaced by a scalar, list replaced by an object, ...)
//! are resolved by replacing the value at that path.

use loro::{Container, LoroList, LoroMap, LoroResult, ValueOrContainer};
use serde_json::{Map, Value};

use super::convert::{insert_json, insert_json_at, scalar_to_loro};

/// Reconcile `target` so its visible shape matches `source`.
pub fn reconcile_map(target: &LoroMap, source: &Map<String, Value>) -> LoroResult<()> {
    for (key, value) in source {
        match (target.get(key), value) {
            (None, _) => insert_json(target, key, value)?,
            (Some(ValueOrContainer::Container(Container::Map(child))), Value::Object(fields)) => {
                reconcile_map(&child, fields)?
            }
            (Some(ValueOrContainer::Container(Container::List(child))), Value::Array(items)) => {
                reconcile_list(&child, items)?
            }
            (Some(ValueOrContainer::Value(existing)), _)
                if scalar_to_loro(value).as_ref() == Some(&existing) => {}
            _ => insert_json(target, key, value)?,
        }
    }
    Ok(())
}

/// Reconcile `target` element by element, then truncate it to `source`'s length.
pub fn reconcile_list(target: &LoroList, source: &[Value]) -> LoroResult<()> {
    for (index, value) in source.iter().enumerate() {
        if index >= target.len() {
            insert_json_at(target, index, value)?;
            continue;
        }
        match (target.get(index), value) {
            (Some(ValueOrContainer::Container(Container::Map(child))), Value::Object(fields)) => {
                reconcile_map(&child, fields)?
            }
            (Some(ValueOrContainer::Container(Container::List(child))), Value::Array(items)) => {
                reconcile_list(&child, items)?
            }
            (Some(ValueOrContainer::Value(existing)), _)
                if scalar_to_loro(value).as_ref() == Some(&existing) => {}
            _ => {
                target.delete(index, 1)?;
                insert_json_at(target, index, value)?;
            }
        }
    }

    let len = target.len();
    if len > source.len() {
        target.delete(source.len(), len - source.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::convert::{fill_map, loro_to_json};
    use loro::LoroDoc;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(fields) => fields,
            other => panic!("expected object, got {other}"),
        }
    }

    fn seeded(initial: Value) -> (LoroDoc, LoroMap) {
        let doc = LoroDoc::new();
        let map = doc.get_map("record");
        fill_map(&map, &object(initial)).unwrap();
        doc.commit();
        (doc, map)
    }

    #[test]
    fn test_missing_source_keys_are_preserved() {
        let (doc, map) = seeded(json!({ "a": 1, "b": { "c": 2, "d": 3 } }));

        reconcile_map(&map, &object(json!({ "a": 1, "b": { "c": 99 } }))).unwrap();
        doc.commit();

        assert_eq!(
            loro_to_json(&map.get_deep_value()),
            json!({ "a": 1, "b": { "c": 99, "d": 3 } })
        );
    }

    #[test]
    fn test_list_is_truncated() {
        let (doc, map) = seeded(json!({ "items": [1, 2, 3, 4] }));

        reconcile_map(&map, &object(json!({ "items": [9, 9] }))).unwrap();
        doc.commit();

        assert_eq!(loro_to_json(&map.get_deep_value()), json!({ "items": [9, 9] }));
    }

    #[test]
    fn test_list_grows() {
        let (doc, map) = seeded(json!({ "items": [1] }));

        reconcile_map(&map, &object(json!({ "items": [1, { "k": true }, [2]] }))).unwrap();
        doc.commit();

        assert_eq!(
            loro_to_json(&map.get_deep_value()),
            json!({ "items": [1, { "k": true }, [2]] })
        );
    }

    #[test]
    fn test_type_mismatch_replaces_value() {
        let (doc, map) = seeded(json!({ "a": 5, "b": { "x": 1 }, "c": [1, 2] }));

        reconcile_map(&map, &object(json!({ "a": { "nested": 1 }, "b": "flat", "c": { "o": 1 } })))
            .unwrap();
        doc.commit();

        assert_eq!(
            loro_to_json(&map.get_deep_value()),
            json!({ "a": { "nested": 1 }, "b": "flat", "c": { "o": 1 } })
        );
    }

    #[test]
    fn test_nested_list_elements_are_reconciled_in_place() {
        let (doc, map) = seeded(json!({ "points": [{ "x": 0, "y": 0, "z": 7 }, { "x": 1, "y": 1 }] }));

        reconcile_map(&map, &object(json!({ "points": [{ "x": 5, "y": 0 }] }))).unwrap();
        doc.commit();

        assert_eq!(
            loro_to_json(&map.get_deep_value()),
            json!({ "points": [{ "x": 5, "y": 0, "z": 7 }] })
        );
    }

    #[test]
    fn test_unchanged_payload_records_no_operations() {
        let (doc, map) = seeded(json!({ "a": 1, "b": { "c": [1, 2] }, "s": "text" }));
        let before = doc.oplog_vv();

        reconcile_map(&map, &object(json!({ "a": 1, "b": { "c": [1, 2] }, "s": "text" }))).unwrap();
        doc.commit();

        assert_eq!(doc.oplog_vv(), before);
    }

    #[test]
    fn test_concurrent_edits_to_different_fields_both_survive() {
        let (doc_a, map_a) = seeded(json!({ "x": 0, "y": 0 }));
        let doc_b = doc_a.fork();
        let map_b = doc_b.get_map("record");

        reconcile_map(&map_a, &object(json!({ "x": 10, "y": 0 }))).unwrap();
        doc_a.commit();
        reconcile_map(&map_b, &object(json!({ "x": 0, "y": 20 }))).unwrap();
        doc_b.commit();

        let updates = doc_b.export(loro::ExportMode::updates(&doc_a.oplog_vv())).unwrap();
        doc_a.import(&updates).unwrap();

        assert_eq!(loro_to_json(&map_a.get_deep_value()), json!({ "x": 10, "y": 20 }));
    }
}
