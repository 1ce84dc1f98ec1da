//! In-process document store

use std::collections::HashMap;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, FieldFilter, StoreError, StoreResult};

/// Document store kept in memory. Collections preserve insertion order so
/// listings are stable across calls.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, IndexMap<String, Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    async fn list(&self, collection: &str, filter: Option<FieldFilter>) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| filter.as_ref().map_or(true, |f| f.matches(doc)))
            .cloned()
            .collect())
    }

    async fn set(&self, collection: &str, key: &str, document: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.contains_key(key) {
            return Err(StoreError::already_exists(collection, key));
        }
        docs.insert(key.to_string(), document);
        Ok(())
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(key))
            .ok_or_else(|| StoreError::missing(collection, key))?;
        for (field, value) in fields {
            doc.insert(field, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .and_then(|docs| docs.shift_remove(key))
            .is_some())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
