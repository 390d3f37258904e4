//! DrafftSync Core Library
//!
//! Synchronizes a mutable record store with a Loro CRDT document so that
//! drawings can be saved, exchanged as files and merged offline.

pub mod config;
pub mod crdt;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod project;
pub mod record;
pub mod snapshot;
pub mod storage;
pub mod store;

pub use config::SyncConfig;
pub use crdt::{CrdtDocument, reconcile_list, reconcile_map};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use persistence::{load, merge, save};
pub use project::project;
pub use record::{Record, RecordId, RecordScope, RecordSet, RecordType, record_set};
pub use snapshot::{cold_start, rebuild, refresh, scaffold_records};
pub use store::{ChangeSource, ListenFilter, RecordStore, StoreDiff, Subscription};
