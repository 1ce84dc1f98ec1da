//! Employee domain methods on Repository

use serde_json::Value;

use super::{from_document, to_document, Repository, EMPLOYEE_COLLECTION};
use crate::{
    error::AppResult,
    models::employee::EmployeeRecord,
    store::Document,
};

impl Repository {
    /// Get employee by ID
    pub async fn employees_get(&self, employee_id: &str) -> AppResult<Option<EmployeeRecord>> {
        self.store
            .get(EMPLOYEE_COLLECTION, employee_id)
            .await?
            .map(|doc| from_document(EMPLOYEE_COLLECTION, doc))
            .transpose()
    }

    /// List all employees in store order
    pub async fn employees_list(&self) -> AppResult<Vec<EmployeeRecord>> {
        self.store
            .list(EMPLOYEE_COLLECTION, None)
            .await?
            .into_iter()
            .map(|doc| from_document(EMPLOYEE_COLLECTION, doc))
            .collect()
    }

    /// Create an employee keyed by its id; fails if the id is taken
    pub async fn employees_create(&self, record: &EmployeeRecord) -> AppResult<()> {
        self.store
            .set(EMPLOYEE_COLLECTION, &record.employee_id, to_document(record)?)
            .await?;
        Ok(())
    }

    /// Overwrite every field of an existing employee
    pub async fn employees_replace(&self, record: &EmployeeRecord) -> AppResult<()> {
        self.store
            .update(EMPLOYEE_COLLECTION, &record.employee_id, to_document(record)?)
            .await?;
        Ok(())
    }

    /// Overwrite only the stored password
    pub async fn employees_set_password(&self, employee_id: &str, password_hash: String) -> AppResult<()> {
        let mut fields = Document::new();
        fields.insert("Password".to_string(), Value::String(password_hash));
        self.store.update(EMPLOYEE_COLLECTION, employee_id, fields).await?;
        Ok(())
    }

    /// Delete an employee, returning whether it existed
    pub async fn employees_delete(&self, employee_id: &str) -> AppResult<bool> {
        Ok(self.store.delete(EMPLOYEE_COLLECTION, employee_id).await?)
    }
}
