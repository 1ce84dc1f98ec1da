//! Data models for employee and equipment records

pub mod employee;
pub mod equipment;
pub mod patch;

use serde::Serialize;
use utoipa::ToSchema;
use validator::ValidationError;

// Re-export commonly used types
pub use employee::{Employee, EmployeeRecord};
pub use equipment::{Equipment, EquipmentRecord};
pub use patch::Patch;

/// Plain confirmation message
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Rejects empty and whitespace-only text
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}
