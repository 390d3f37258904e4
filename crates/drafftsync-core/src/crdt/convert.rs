//! Conversion between JSON record payloads and Loro values.

use loro::{LoroList, LoroMap, LoroResult, LoroValue};
use serde_json::{Map, Number, Value};

/// Convert a JSON scalar to a Loro value.
///
/// Objects, arrays and integers that do not fit in an `i64` return `None`.
pub fn scalar_to_loro(value: &Value) -> Option<LoroValue> {
    match value {
        Value::Null => Some(LoroValue::Null),
        Value::Bool(b) => Some(LoroValue::Bool(*b)),
        Value::Number(n) if n.is_f64() => n.as_f64().map(LoroValue::Double),
        Value::Number(n) => n.as_i64().map(LoroValue::I64),
        Value::String(s) => Some(LoroValue::from(s.as_str())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Convert a deep Loro value back to plain JSON.
pub fn loro_to_json(value: &LoroValue) -> Value {
    match value {
        LoroValue::Null => Value::Null,
        LoroValue::Bool(b) => Value::Bool(*b),
        LoroValue::I64(i) => Value::Number((*i).into()),
        LoroValue::Double(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
        LoroValue::String(s) => Value::String(s.to_string()),
        LoroValue::List(list) => Value::Array(list.iter().map(loro_to_json).collect()),
        LoroValue::Map(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.to_string(), loro_to_json(value)))
                .collect(),
        ),
        // Binary blobs and unresolved container ids never appear in record payloads.
        _ => Value::Null,
    }
}

/// Write `value` under `key`, creating nested containers for objects and arrays.
pub fn insert_json(map: &LoroMap, key: &str, value: &Value) -> LoroResult<()> {
    match value {
        Value::Object(fields) => {
            let child = map.insert_container(key, LoroMap::new())?;
            fill_map(&child, fields)
        }
        Value::Array(items) => {
            let child = map.insert_container(key, LoroList::new())?;
            fill_list(&child, items)
        }
        scalar => {
            if let Some(v) = scalar_to_loro(scalar) {
                map.insert(key, v)?;
            }
            Ok(())
        }
    }
}

/// Insert `value` at `pos`, creating nested containers for objects and arrays.
pub fn insert_json_at(list: &LoroList, pos: usize, value: &Value) -> LoroResult<()> {
    match value {
        Value::Object(fields) => {
            let child = list.insert_container(pos, LoroMap::new())?;
            fill_map(&child, fields)
        }
        Value::Array(items) => {
            let child = list.insert_container(pos, LoroList::new())?;
            fill_list(&child, items)
        }
        scalar => {
            if let Some(v) = scalar_to_loro(scalar) {
                list.insert(pos, v)?;
            }
            Ok(())
        }
    }
}

/// Populate an empty map with the fields of a JSON object.
pub fn fill_map(map: &LoroMap, fields: &Map<String, Value>) -> LoroResult<()> {
    for (key, value) in fields {
        insert_json(map, key, value)?;
    }
    Ok(())
}

/// Populate an empty list with JSON items.
pub fn fill_list(list: &LoroList, items: &[Value]) -> LoroResult<()> {
    for (pos, item) in items.iter().enumerate() {
        insert_json_at(list, pos, item)?;
    }
    Ok(())
}
