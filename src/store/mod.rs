//! Document store abstraction
//!
//! Record services never talk to a concrete database client. They go through
//! [`DocumentStore`], a small capability trait over named collections of
//! schema-less JSON documents keyed by string identifiers.

pub mod credentials;
pub mod firestore;
pub mod memory;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

/// A stored document: a flat JSON object of field name to value
pub type Document = Map<String, Value>;

/// Single-field equality predicate used by [`DocumentStore::list`]
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: Value,
}

impl FieldFilter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Whether the document carries `field` with exactly `value`
    pub fn matches(&self, document: &Document) -> bool {
        document.get(&self.field) == Some(&self.value)
    }
}

/// Errors reported by store adapters
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{collection} {key} already exists")]
    AlreadyExists { collection: String, key: String },

    #[error("{collection} {key} not found")]
    Missing { collection: String, key: String },

    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Document store rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed document: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn already_exists(collection: &str, key: &str) -> Self {
        Self::AlreadyExists {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    pub fn missing(collection: &str, key: &str) -> Self {
        Self::Missing {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Capability interface over a key/document database.
///
/// Every call is a single point read or write; no operation spans more than
/// one document and nothing is transactional.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document by key, `None` when absent
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>>;

    /// Fetch every document of a collection, optionally restricted to those
    /// matching one equality filter. Order is whatever the store yields.
    async fn list(&self, collection: &str, filter: Option<FieldFilter>) -> StoreResult<Vec<Document>>;

    /// Create a document. Fails with [`StoreError::AlreadyExists`] rather
    /// than overwriting an existing key.
    async fn set(&self, collection: &str, key: &str, document: Document) -> StoreResult<()>;

    /// Merge `fields` into an existing document. Fails with
    /// [`StoreError::Missing`] when the key is absent.
    async fn update(&self, collection: &str, key: &str, fields: Document) -> StoreResult<()>;

    /// Remove a document, returning whether it existed
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool>;

    /// Cheap connectivity probe used by the readiness endpoint
    async fn ping(&self) -> StoreResult<()>;
}

/// Build the store selected by configuration
pub fn connect(config: &StoreConfig) -> StoreResult<Arc<dyn DocumentStore>> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory document store, data will not survive a restart");
            Ok(Arc::new(memory::MemoryStore::new()))
        }
        StoreBackend::Firestore => {
            let store = firestore::FirestoreStore::new(config)?;
            tracing::info!(
                "Using Firestore document store at {} ({})",
                store.documents_root(),
                store.credentials()
            );
            Ok(Arc::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_exact_value_only() {
        let filter = FieldFilter::equals("EquipmentType", "fire extinguisher");
        let mut doc = Document::new();
        doc.insert("EquipmentType".into(), json!("fire extinguisher"));
        assert!(filter.matches(&doc));

        doc.insert("EquipmentType".into(), json!("Fire Extinguisher"));
        assert!(!filter.matches(&doc));

        doc.remove("EquipmentType");
        assert!(!filter.matches(&doc));
    }

    #[test]
    fn error_messages_name_the_record() {
        let err = StoreError::already_exists("Employee", "E-1");
        assert_eq!(err.to_string(), "Employee E-1 already exists");
        let err = StoreError::missing("Equipment", "abc");
        assert_eq!(err.to_string(), "Equipment abc not found");
    }
}
