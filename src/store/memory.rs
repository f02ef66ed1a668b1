//! In-process record store.
//!
//! Same filter semantics as the remote store. Used for offline runs and as the
//! store behind scheduler and workflow tests.

use crate::error::{AssistantError, Result};
use crate::store::{Collection, Fields, Filter, Record, RecordStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<Collection, Vec<Record>>>,
    next_id: AtomicU64,
    fail_queries: AtomicBool,
    query_count: AtomicUsize,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent queries fail (simulates an unreachable store).
    pub fn set_unreachable(&self, unreachable: bool) {
        self.fail_queries.store(unreachable, Ordering::SeqCst);
    }

    /// Number of queries served so far (including failed ones).
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::SeqCst)
    }

    /// Snapshot of a collection.
    #[must_use]
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.records
            .lock()
            .map(|guard| guard.get(&collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String> {
        let id = format!("mem-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut guard = self
            .records
            .lock()
            .map_err(|_| AssistantError::Store("memory store lock poisoned".to_owned()))?;
        guard.entry(collection).or_default().push(Record {
            id: id.clone(),
            fields,
        });
        Ok(id)
    }

    async fn query(&self, collection: Collection, filter: &Filter) -> Result<Vec<Record>> {
        self.query_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(AssistantError::Store(format!(
                "{collection} collection unreachable"
            )));
        }
        let guard = self
            .records
            .lock()
            .map_err(|_| AssistantError::Store("memory store lock poisoned".to_owned()))?;
        Ok(guard
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| filter.matches(&r.fields))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::store::FieldValue;

    #[tokio::test]
    async fn create_assigns_unique_ids_per_store() {
        let store = MemoryStore::new();
        let a = store.create(Collection::Tasks, Fields::new()).await.unwrap();
        let b = store.create(Collection::Tasks, Fields::new()).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(store.records(Collection::Tasks).len(), 2);
        assert!(store.records(Collection::Reminders).is_empty());
    }

    #[tokio::test]
    async fn query_is_scoped_to_collection() {
        let store = MemoryStore::new();
        let mut fields = Fields::new();
        fields.insert("Actif".to_owned(), FieldValue::Checkbox(true));
        store.create(Collection::Tasks, fields).await.unwrap();

        let found = store
            .query(Collection::Reminders, &Filter::all())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn unreachable_store_fails_queries() {
        let store = MemoryStore::new();
        store.set_unreachable(true);
        let err = store
            .query(Collection::Reminders, &Filter::all())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unreachable"), "got: {err}");
        assert_eq!(store.query_count(), 1);
    }
}
