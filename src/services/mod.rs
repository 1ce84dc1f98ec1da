//! Business logic services

pub mod employees;
pub mod equipment;

use crate::{config::SecurityConfig, error::AppResult, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub employees: employees::EmployeesService,
    pub equipment: equipment::EquipmentService,
    repository: Repository,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, security: &SecurityConfig) -> AppResult<Self> {
        Ok(Self {
            employees: employees::EmployeesService::new(repository.clone(), security)?,
            equipment: equipment::EquipmentService::new(repository.clone()),
            repository,
        })
    }

    /// Readiness probe against the document store
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
