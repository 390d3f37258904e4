//! In-memory record store with change listeners.
//!
//! Every mutation batch produces one [`StoreDiff`] which is delivered
//! synchronously to the subscribed listeners whose [`ListenFilter`] matches.

use crate::record::{Record, RecordId, RecordScope, RecordSet};

/// Where a mutation batch originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// A local edit made by the user.
    User,
    /// A change applied by the sync layer (load, merge, refresh).
    Remote,
}

/// Selects which mutation batches a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListenFilter {
    /// Only batches from this source. `None` matches every source.
    pub source: Option<ChangeSource>,
    /// Only records in this scope. `None` matches every scope.
    pub scope: Option<RecordScope>,
}

impl ListenFilter {
    /// Every batch, every record.
    pub fn all() -> Self {
        Self::default()
    }

    /// User edits to document content; what the sync engine projects.
    pub fn user_document() -> Self {
        Self {
            source: Some(ChangeSource::User),
            scope: Some(RecordScope::Document),
        }
    }

    fn matches_source(&self, source: ChangeSource) -> bool {
        self.source.is_none_or(|s| s == source)
    }
}

/// One batch of store changes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreDiff {
    pub added: Vec<Record>,
    /// `(old, new)` pairs.
    pub updated: Vec<(Record, Record)>,
    pub removed: Vec<RecordId>,
}

impl StoreDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Keep only the records belonging to `scope`.
    pub fn filter_scope(&self, scope: RecordScope) -> StoreDiff {
        StoreDiff {
            added: self
                .added
                .iter()
                .filter(|r| r.scope() == scope)
                .cloned()
                .collect(),
            updated: self
                .updated
                .iter()
                .filter(|(_, new)| new.scope() == scope)
                .cloned()
                .collect(),
            removed: self
                .removed
                .iter()
                .filter(|id| id.record_type().scope() == scope)
                .cloned()
                .collect(),
        }
    }
}

/// Handle returned by [`RecordStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

type Handler = Box<dyn FnMut(&StoreDiff)>;

struct Listener {
    id: u64,
    filter: ListenFilter,
    handler: Handler,
}

/// The live, mutable set of records.
#[derive(Default)]
pub struct RecordStore {
    records: RecordSet,
    listeners: Vec<Listener>,
    next_listener: u64,
}

impl RecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-filled with `records`. No listeners observe the seeding.
    pub fn with_records<I: IntoIterator<Item = Record>>(records: I) -> Self {
        Self {
            records: crate::record::record_set(records),
            ..Self::default()
        }
    }

    /// Register a listener invoked after every matching mutation batch.
    pub fn subscribe(
        &mut self,
        filter: ListenFilter,
        handler: impl FnMut(&StoreDiff) + 'static,
    ) -> Subscription {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.push(Listener {
            id,
            filter,
            handler: Box::new(handler),
        });
        Subscription(id)
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != subscription.0);
        self.listeners.len() != before
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn records(&self) -> &RecordSet {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert or overwrite records as one batch. Unchanged records are not reported.
    pub fn put<I: IntoIterator<Item = Record>>(&mut self, records: I, source: ChangeSource) {
        let mut diff = StoreDiff::default();
        for record in records {
            self.stage_put(record, &mut diff);
        }
        self.emit(diff, source);
    }

    /// Modify one record in place. Returns false if it does not exist.
    pub fn update(
        &mut self,
        id: &RecordId,
        source: ChangeSource,
        f: impl FnOnce(&mut Record),
    ) -> bool {
        let Some(mut record) = self.records.get(id).cloned() else {
            return false;
        };
        f(&mut record);
        self.put([record], source);
        true
    }

    /// Remove records as one batch. Unknown ids are ignored.
    pub fn remove<'a, I: IntoIterator<Item = &'a RecordId>>(&mut self, ids: I, source: ChangeSource) {
        let mut diff = StoreDiff::default();
        for id in ids {
            if self.records.remove(id).is_some() {
                diff.removed.push(id.clone());
            }
        }
        self.emit(diff, source);
    }

    /// Remove every record.
    pub fn clear(&mut self, source: ChangeSource) {
        let removed = std::mem::take(&mut self.records).into_keys().collect();
        self.emit(
            StoreDiff {
                removed,
                ..StoreDiff::default()
            },
            source,
        );
    }

    /// Replace the whole content with `records` as one batch.
    pub fn replace_all(&mut self, records: RecordSet, source: ChangeSource) {
        let mut diff = StoreDiff::default();
        let stale: Vec<RecordId> = self
            .records
            .keys()
            .filter(|id| !records.contains_key(id))
            .cloned()
            .collect();
        for id in stale {
            self.records.remove(&id);
            diff.removed.push(id);
        }
        for record in records.into_values() {
            self.stage_put(record, &mut diff);
        }
        self.emit(diff, source);
    }

    fn stage_put(&mut self, record: Record, diff: &mut StoreDiff) {
        match self.records.insert(record.id().clone(), record.clone()) {
            None => diff.added.push(record),
            Some(old) if old != record => diff.updated.push((old, record)),
            Some(_) => {}
        }
    }

    fn emit(&mut self, diff: StoreDiff, source: ChangeSource) {
        if diff.is_empty() {
            return;
        }
        for listener in &mut self.listeners {
            if !listener.filter.matches_source(source) {
                continue;
            }
            match listener.filter.scope {
                Some(scope) => {
                    let scoped = diff.filter_scope(scope);
                    if !scoped.is_empty() {
                        (listener.handler)(&scoped);
                    }
                }
                None => (listener.handler)(&diff),
            }
        }
    }
}
