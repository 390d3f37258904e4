//! Record definitions for the document store.
//!
//! A record is a JSON object with a stable `id` and a `typeName`. The prefix of
//! the id before the first `:` names the record type (`shape:abc`, `page:page`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

/// Key holding the record identifier inside a payload.
pub const KEY_ID: &str = "id";
/// Key holding the record type name inside a payload.
pub const KEY_TYPE_NAME: &str = "typeName";

/// Unique identifier of a record within a document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh id for the given record type.
    pub fn generate(record_type: &RecordType) -> Self {
        Self(format!("{}:{}", record_type.as_str(), Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Record type encoded in the id prefix.
    pub fn record_type(&self) -> RecordType {
        let prefix = self.0.split(':').next().unwrap_or_default();
        RecordType::from_name(prefix)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether a record belongs to the persisted document or to the local session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordScope {
    /// Shared document content, synchronized through the CRDT.
    Document,
    /// Per-session state (camera, pointer, preferences). Never synchronized.
    Session,
}

/// Known record types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordType {
    Document,
    Page,
    Shape,
    Binding,
    Asset,
    Camera,
    Instance,
    InstancePageState,
    Pointer,
    UserPreferences,
    Unknown(String),
}

impl RecordType {
    pub fn from_name(name: &str) -> Self {
        match name {
            "document" => Self::Document,
            "page" => Self::Page,
            "shape" => Self::Shape,
            "binding" => Self::Binding,
            "asset" => Self::Asset,
            "camera" => Self::Camera,
            "instance" => Self::Instance,
            "instance_page_state" => Self::InstancePageState,
            "pointer" => Self::Pointer,
            "user_preferences" => Self::UserPreferences,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Document => "document",
            Self::Page => "page",
            Self::Shape => "shape",
            Self::Binding => "binding",
            Self::Asset => "asset",
            Self::Camera => "camera",
            Self::Instance => "instance",
            Self::InstancePageState => "instance_page_state",
            Self::Pointer => "pointer",
            Self::UserPreferences => "user_preferences",
            Self::Unknown(name) => name,
        }
    }

    /// Unknown types are treated as document content so they are never lost.
    pub fn scope(&self) -> RecordScope {
        match self {
            Self::Camera
            | Self::Instance
            | Self::InstancePageState
            | Self::Pointer
            | Self::UserPreferences => RecordScope::Session,
            _ => RecordScope::Document,
        }
    }
}

/// A single record: an identified JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Create a record with the given id and extra fields.
    ///
    /// `id` and `typeName` are always written from `id`, overriding any
    /// values present in `fields`.
    pub fn new(id: RecordId, mut fields: Map<String, Value>) -> Self {
        fields.insert(KEY_ID.to_string(), Value::String(id.to_string()));
        fields.insert(
            KEY_TYPE_NAME.to_string(),
            Value::String(id.record_type().as_str().to_string()),
        );
        Self { id, fields }
    }

    /// Build a record from an arbitrary JSON value.
    ///
    /// A `typeName` must agree with the id prefix. A missing one is filled in.
    pub fn from_value(value: Value) -> SyncResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(SyncError::InvalidRecord("record payload is not an object".into()));
        };
        let id = match fields.get(KEY_ID) {
            Some(Value::String(id)) if !id.is_empty() => RecordId::new(id.clone()),
            _ => return Err(SyncError::InvalidRecord("record has no id".into())),
        };
        let type_name = id.record_type().as_str().to_string();
        match fields.get(KEY_TYPE_NAME) {
            None => {
                fields.insert(KEY_TYPE_NAME.to_string(), Value::String(type_name));
            }
            Some(Value::String(name)) if *name == type_name => {}
            Some(other) => {
                return Err(SyncError::InvalidRecord(format!(
                    "record {} has typeName {} but its id says {}",
                    id, other, type_name
                )));
            }
        }
        let record = Self { id, fields };
        record.validate()?;
        Ok(record)
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    /// Record type, taken from the id prefix.
    pub fn record_type(&self) -> RecordType {
        self.id.record_type()
    }

    pub fn scope(&self) -> RecordScope {
        self.record_type().scope()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field. The `id` and `typeName` fields cannot be changed.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if key != KEY_ID && key != KEY_TYPE_NAME {
            self.fields.insert(key, value);
        }
    }

    /// Shallow-merge the fields of `patch` into this record.
    pub fn patch(&mut self, patch: Map<String, Value>) {
        for (key, value) in patch {
            self.set(key, value);
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Check that every value can be stored without loss.
    ///
    /// Integers must fit in an `i64`. Larger ones would come back from the
    /// document as floats.
    pub fn validate(&self) -> SyncResult<()> {
        for (key, value) in &self.fields {
            if !is_storable(value) {
                return Err(SyncError::InvalidRecord(format!(
                    "record {} field {} holds an integer outside the i64 range",
                    self.id, key
                )));
            }
        }
        Ok(())
    }
}

fn is_storable(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_f64() || n.is_i64(),
        Value::Array(items) => items.iter().all(is_storable),
        Value::Object(fields) => fields.values().all(is_storable),
        _ => true,
    }
}

impl TryFrom<Value> for Record {
    type Error = SyncError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.fields)
    }
}

/// The full collection of records, keyed by id.
pub type RecordSet = BTreeMap<RecordId, Record>;

/// Build a record set from a list of records. Later duplicates win.
pub fn record_set<I: IntoIterator<Item = Record>>(records: I) -> RecordSet {
    records.into_iter().map(|r| (r.id().clone(), r)).collect()
}
