use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{Collection, Document, DocumentStore, FieldFilter, StoreError, StoredDocument};

type Collections = HashMap<Collection, BTreeMap<String, Document>>;

/// Process-local store used by the API service, demos and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryDocumentStore {
    collections: Arc<Mutex<Collections>>,
    sequence: Arc<AtomicU64>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a document under a caller-chosen key.
    pub fn seed(
        &self,
        collection: Collection,
        id: impl Into<String>,
        data: Document,
    ) -> Result<(), StoreError> {
        self.lock()?
            .entry(collection)
            .or_default()
            .insert(id.into(), data);
        Ok(())
    }

    /// Synchronous read for assertions and CLI rendering.
    pub fn snapshot(&self, collection: Collection, id: &str) -> Option<Document> {
        self.lock()
            .ok()
            .and_then(|guard| guard.get(&collection).and_then(|docs| docs.get(id)).cloned())
    }

    pub fn len(&self, collection: Collection) -> usize {
        self.lock()
            .map(|guard| guard.get(&collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn next_id(&self, collection: Collection) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{id:06}", collection.name())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        let guard = self.lock()?;
        Ok(guard
            .get(&collection)
            .and_then(|docs| docs.get(id))
            .map(|data| StoredDocument::new(id, data.clone())))
    }

    async fn query(
        &self,
        collection: Collection,
        filters: &[FieldFilter],
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let guard = self.lock()?;
        let Some(docs) = guard.get(&collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .iter()
            .filter(|(_, data)| filters.iter().all(|filter| filter.matches(data)))
            .map(|(id, data)| StoredDocument::new(id.clone(), data.clone()))
            .collect())
    }

    async fn create(&self, collection: Collection, data: Document) -> Result<String, StoreError> {
        let id = self.next_id(collection);
        self.lock()?
            .entry(collection)
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn update_merge(
        &self,
        collection: Collection,
        id: &str,
        patch: Document,
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let document = guard
            .get_mut(&collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.name(),
                id: id.to_string(),
            })?;
        for (field, value) in patch {
            document.insert(field, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        guard
            .get_mut(&collection)
            .and_then(|docs| docs.remove(id))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.name(),
                id: id.to_string(),
            })
    }
}
