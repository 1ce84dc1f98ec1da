//! Repository layer for document store operations

pub mod employees;
pub mod equipment;

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    store::{Document, DocumentStore},
};

pub const EMPLOYEE_COLLECTION: &str = "Employee";
pub const EQUIPMENT_COLLECTION: &str = "Equipment";

/// Main repository struct holding the document store handle
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn DocumentStore>,
}

impl Repository {
    /// Create a new repository over the given store
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Check that the store answers
    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await?;
        Ok(())
    }
}

fn to_document<T: Serialize>(value: &T) -> AppResult<Document> {
    match serde_json::to_value(value) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => Err(AppError::Internal(format!(
            "Expected a JSON object for a document, got {}",
            other
        ))),
        Err(e) => Err(AppError::Internal(format!("Failed to encode document: {}", e))),
    }
}

fn from_document<T: DeserializeOwned>(collection: &str, document: Document) -> AppResult<T> {
    serde_json::from_value(Value::Object(document))
        .map_err(|e| AppError::Internal(format!("Malformed {} document: {}", collection, e)))
}
