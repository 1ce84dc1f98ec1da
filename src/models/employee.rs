//! Employee model and related types

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::patch::Patch;

/// Employee as persisted in the `Employee` collection.
///
/// Field names are PascalCase to stay readable alongside documents written
/// by earlier versions. `password` holds an Argon2 PHC string (or a legacy
/// plaintext value that has not been reset yet).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EmployeeRecord {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub password: String,
    pub is_admin: bool,
    pub is_super_admin: bool,
}

/// Employee returned by the API (never includes the password)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: String,
    pub is_admin: bool,
    pub is_super_admin: bool,
}

impl From<EmployeeRecord> for Employee {
    fn from(record: EmployeeRecord) -> Self {
        Self {
            employee_id: record.employee_id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            role: record.role,
            is_admin: record.is_admin,
            is_super_admin: record.is_super_admin,
        }
    }
}

/// Create employee request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    #[validate(custom(function = "validate_document_key"))]
    pub employee_id: String,
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
}

/// Update employee request.
///
/// Text fields: omitted or `""` keeps the stored value, `null` clears it.
/// The admin flags are always overwritten.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub first_name: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub last_name: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub email: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub role: Patch<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub password: Patch<String>,
    pub is_admin: bool,
    pub is_super_admin: bool,
    /// Re-key the record under this id
    #[serde(default)]
    pub updated_employee_id: Option<String>,
}

/// Reset password request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ResetPassword {
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub employee_id: String,
    pub password: String,
}

/// Session value handed to the web client after a successful login
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedInEmployee {
    #[serde(flatten)]
    pub employee: Employee,
    /// Whether the client should offer the administrative dashboard
    pub administrative_access: bool,
}

impl From<Employee> for SignedInEmployee {
    fn from(employee: Employee) -> Self {
        let administrative_access = employee.is_admin || employee.is_super_admin;
        Self {
            employee,
            administrative_access,
        }
    }
}

/// Confirmation of a deleted employee
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeletedEmployee {
    pub employee_id: String,
    pub first_name: String,
    pub last_name: String,
    pub message: String,
}

impl From<EmployeeRecord> for DeletedEmployee {
    fn from(record: EmployeeRecord) -> Self {
        let message = format!(
            "Employee {} {} with ID {} deleted",
            record.first_name, record.last_name, record.employee_id
        );
        Self {
            employee_id: record.employee_id,
            first_name: record.first_name,
            last_name: record.last_name,
            message,
        }
    }
}

/// Employee ids double as document keys: non-empty, no `/`, not `.` or `..`
pub fn validate_document_key(key: &str) -> Result<(), ValidationError> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("Employee id is required".into());
        return Err(err);
    }
    if key.contains('/') || key == "." || key == ".." || key.len() > 1500 {
        let mut err = ValidationError::new("document_key");
        err.message = Some(format!("'{}' is not a valid employee id", key).into());
        return Err(err);
    }
    Ok(())
}
