//! CRDT integration using Loro for mergeable persistence.
//!
//! This module provides the bridge between the record model and Loro's CRDT document.
//!
//! # Schema
//!
//! ```text
//! LoroDoc
//! └── "records": LoroMap<RecordId, LoroMap> (record payloads)
//! ```
//!
//! Each record payload is stored as a tree of Loro containers mirroring its
//! JSON shape: objects become `LoroMap`, arrays become `LoroList` and every
//! other value is a scalar entry. Keeping payloads structured (rather than as
//! opaque strings) lets concurrent edits to different fields of one record merge.

mod convert;
mod reconcile;
mod schema;

pub use convert::{loro_to_json, scalar_to_loro};
pub use reconcile::{reconcile_list, reconcile_map};
pub use schema::{CrdtDocument, RECORDS_KEY};

pub use loro::VersionVector;
