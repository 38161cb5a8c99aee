//! Device-local cache of saved items.
//!
//! The cache is the zero-latency read path and the whole truth for guest
//! mode. It is a convenience layer, never the durability guarantee:
//! persistence failures are logged and swallowed.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use log::warn;

use crate::errors::Result;
use crate::saved_items::model::{EntityKind, SavedItemKey, SavedItemRecord};

/// Persistence seam for the cache, implemented by the storage crate.
///
/// One serialized record list per entity kind; `store` replaces the whole
/// list atomically.
pub trait CachePersistence: Send + Sync {
    fn load(&self, kind: EntityKind) -> Result<Option<Vec<SavedItemRecord>>>;
    fn store(&self, kind: EntityKind, records: &[SavedItemRecord]) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// No-op persistence for cache instances that live purely in memory.
pub struct NoOpCachePersistence;

impl CachePersistence for NoOpCachePersistence {
    fn load(&self, _kind: EntityKind) -> Result<Option<Vec<SavedItemRecord>>> {
        Ok(None)
    }

    fn store(&self, _kind: EntityKind, _records: &[SavedItemRecord]) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<EntityKind, Vec<SavedItemRecord>>,
    hydrated: HashSet<EntityKind>,
}

/// In-memory saved-items cache with write-through persistence.
///
/// Mutations replace the whole per-kind list; no partial state is ever
/// observable. Lists are ordered most-recent first.
pub struct LocalCacheStore {
    state: Mutex<CacheState>,
    persistence: Arc<dyn CachePersistence>,
}

impl LocalCacheStore {
    pub fn new(persistence: Arc<dyn CachePersistence>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            persistence,
        }
    }

    /// Cache without device persistence (tests, ephemeral sessions).
    pub fn in_memory() -> Self {
        Self::new(Arc::new(NoOpCachePersistence))
    }

    fn hydrate_locked(&self, state: &mut CacheState, kind: EntityKind) {
        if !state.hydrated.insert(kind) {
            return;
        }
        match self.persistence.load(kind) {
            Ok(Some(records)) => {
                state.entries.insert(kind, records);
            }
            Ok(None) => {}
            Err(e) => {
                warn!("Failed to hydrate saved-items cache for {}: {}", kind.as_str(), e);
            }
        }
    }

    fn persist(&self, kind: EntityKind, records: &[SavedItemRecord]) {
        if let Err(e) = self.persistence.store(kind, records) {
            warn!("Failed to persist saved-items cache for {}: {}", kind.as_str(), e);
        }
    }

    /// Current cached list for `kind`, most-recent first.
    pub fn read(&self, kind: EntityKind) -> Vec<SavedItemRecord> {
        let mut state = self.state.lock().unwrap();
        self.hydrate_locked(&mut state, kind);
        state.entries.get(&kind).cloned().unwrap_or_default()
    }

    /// Replace the whole set for `kind` atomically.
    pub fn write(&self, kind: EntityKind, records: Vec<SavedItemRecord>) {
        let mut state = self.state.lock().unwrap();
        state.hydrated.insert(kind);
        self.persist(kind, &records);
        state.entries.insert(kind, records);
    }

    /// Add `record` to its kind's set, deduplicating on the item key.
    ///
    /// Re-adding an existing key replaces the old record and moves it to the
    /// front (set semantics, newest-first ordering).
    pub fn apply_add(&self, record: SavedItemRecord) {
        let kind = record.entity_kind;
        let key = record.key();
        let mut state = self.state.lock().unwrap();
        self.hydrate_locked(&mut state, kind);
        let entry = state.entries.entry(kind).or_default();
        entry.retain(|existing| existing.key() != key);
        entry.insert(0, record);
        let snapshot = entry.clone();
        self.persist(kind, &snapshot);
    }

    /// Remove the record for `key` if present; absence is a no-op.
    pub fn apply_remove(&self, key: &SavedItemKey) {
        let mut state = self.state.lock().unwrap();
        self.hydrate_locked(&mut state, key.entity_kind);
        let Some(entry) = state.entries.get_mut(&key.entity_kind) else {
            return;
        };
        let before = entry.len();
        entry.retain(|existing| existing.key() != *key);
        if entry.len() != before {
            let snapshot = entry.clone();
            self.persist(key.entity_kind, &snapshot);
        }
    }

    /// Whether `key` is currently cached.
    pub fn contains(&self, key: &SavedItemKey) -> bool {
        let mut state = self.state.lock().unwrap();
        self.hydrate_locked(&mut state, key.entity_kind);
        state
            .entries
            .get(&key.entity_kind)
            .is_some_and(|records| records.iter().any(|record| record.key() == *key))
    }

    /// Drop every cached kind. Sign-out hook.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.entries.clear();
        for kind in EntityKind::ALL {
            state.hydrated.insert(kind);
        }
        if let Err(e) = self.persistence.clear() {
            warn!("Failed to clear persisted saved-items cache: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record(kind: EntityKind, key: &str) -> SavedItemRecord {
        SavedItemRecord::new(kind, key, key.to_uppercase())
    }

    #[test]
    fn add_orders_most_recent_first_and_dedups() {
        let cache = LocalCacheStore::in_memory();
        cache.apply_add(record(EntityKind::Exam, "e1"));
        cache.apply_add(record(EntityKind::Exam, "e2"));
        cache.apply_add(record(EntityKind::Exam, "e1"));

        let items = cache.read(EntityKind::Exam);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].external_key, "e1");
        assert_eq!(items[1].external_key, "e2");
    }

    #[test]
    fn remove_absent_key_is_noop() {
        let cache = LocalCacheStore::in_memory();
        cache.apply_add(record(EntityKind::Course, "c1"));
        cache.apply_remove(&SavedItemKey::new(EntityKind::Course, "never-saved"));
        assert_eq!(cache.read(EntityKind::Course).len(), 1);
    }

    #[test]
    fn kinds_are_isolated() {
        let cache = LocalCacheStore::in_memory();
        cache.apply_add(record(EntityKind::Exam, "e1"));
        assert!(cache.read(EntityKind::Scholarship).is_empty());
    }

    struct FailingPersistence {
        stores: AtomicUsize,
    }

    impl CachePersistence for FailingPersistence {
        fn load(&self, _kind: EntityKind) -> Result<Option<Vec<SavedItemRecord>>> {
            Err(Error::storage("quota exceeded"))
        }

        fn store(&self, _kind: EntityKind, _records: &[SavedItemRecord]) -> Result<()> {
            self.stores.fetch_add(1, Ordering::SeqCst);
            Err(Error::storage("quota exceeded"))
        }

        fn clear(&self) -> Result<()> {
            Err(Error::storage("quota exceeded"))
        }
    }

    #[test]
    fn persistence_failures_are_swallowed() {
        let persistence = Arc::new(FailingPersistence {
            stores: AtomicUsize::new(0),
        });
        let cache = LocalCacheStore::new(persistence.clone());

        cache.apply_add(record(EntityKind::Exam, "e1"));
        assert_eq!(cache.read(EntityKind::Exam).len(), 1);
        assert_eq!(persistence.stores.load(Ordering::SeqCst), 1);

        cache.clear();
        assert!(cache.read(EntityKind::Exam).is_empty());
    }

    struct SeededPersistence {
        records: Vec<SavedItemRecord>,
    }

    impl CachePersistence for SeededPersistence {
        fn load(&self, kind: EntityKind) -> Result<Option<Vec<SavedItemRecord>>> {
            if kind == EntityKind::Exam {
                Ok(Some(self.records.clone()))
            } else {
                Ok(None)
            }
        }

        fn store(&self, _kind: EntityKind, _records: &[SavedItemRecord]) -> Result<()> {
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn first_read_hydrates_from_persistence() {
        let cache = LocalCacheStore::new(Arc::new(SeededPersistence {
            records: vec![record(EntityKind::Exam, "e1")],
        }));
        assert_eq!(cache.read(EntityKind::Exam).len(), 1);
        assert!(cache.read(EntityKind::Scholarship).is_empty());
    }

    #[test]
    fn contains_answers_the_save_state_query_after_hydration() {
        let cache = LocalCacheStore::new(Arc::new(SeededPersistence {
            records: vec![record(EntityKind::Exam, "e1")],
        }));
        assert!(cache.contains(&SavedItemKey::new(EntityKind::Exam, "e1")));
        assert!(!cache.contains(&SavedItemKey::new(EntityKind::Exam, "e2")));
        assert!(!cache.contains(&SavedItemKey::new(EntityKind::Course, "e1")));
    }
}
