//! Employee records and credential service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use subtle::ConstantTimeEq;
use validator::{Validate, ValidateEmail};

use crate::{
    config::SecurityConfig,
    error::{AppError, AppResult},
    models::{
        employee::{
            validate_document_key, CreateEmployee, DeletedEmployee, Employee, EmployeeRecord,
            LoginRequest, ResetPassword, SignedInEmployee, UpdateEmployee,
        },
        MessageResponse, Patch,
    },
    repository::Repository,
};

const MIN_PASSWORD_LEN: usize = 4;

#[derive(Clone)]
pub struct EmployeesService {
    repository: Repository,
    argon2: Argon2<'static>,
    /// Verified against on unknown ids so lookups cost the same either way
    dummy_hash: String,
}

impl EmployeesService {
    pub fn new(repository: Repository, security: &SecurityConfig) -> AppResult<Self> {
        let params = Params::new(
            security.argon2_memory_kib,
            security.argon2_iterations,
            security.argon2_parallelism,
            None,
        )
        .map_err(|e| AppError::Internal(format!("Invalid Argon2 parameters: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(b"no such employee", &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?
            .to_string();

        Ok(Self {
            repository,
            argon2,
            dummy_hash,
        })
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Check a password against the stored value. Records written before
    /// hashing was introduced still hold plaintext; those are compared in
    /// constant time until the password is reset.
    fn verify_password(&self, stored: &str, password: &str) -> bool {
        if stored.is_empty() {
            return false;
        }
        match PasswordHash::new(stored) {
            Ok(parsed) => self
                .argon2
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => stored.as_bytes().ct_eq(password.as_bytes()).into(),
        }
    }

    async fn load(&self, employee_id: &str) -> AppResult<EmployeeRecord> {
        check_id(employee_id)?;
        self.repository
            .employees_get(employee_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Employee {} not found", employee_id)))
    }

    /// Get employee by ID
    pub async fn get_by_id(&self, employee_id: &str) -> AppResult<Employee> {
        self.load(employee_id).await.map(Employee::from)
    }

    /// List all employees
    pub async fn list(&self) -> AppResult<Vec<Employee>> {
        let records = self.repository.employees_list().await?;
        Ok(records.into_iter().map(Employee::from).collect())
    }

    /// Create a new employee
    pub async fn create(&self, data: CreateEmployee) -> AppResult<Employee> {
        data.validate()?;

        let record = EmployeeRecord {
            password: self.hash_password(&data.password)?,
            employee_id: data.employee_id,
            first_name: data.first_name,
            last_name: data.last_name,
            email: data.email,
            role: data.role,
            is_admin: data.is_admin,
            is_super_admin: data.is_super_admin,
        };
        self.repository.employees_create(&record).await?;

        tracing::info!("Added employee {}", record.employee_id);
        Ok(record.into())
    }

    /// Update an existing employee, optionally moving it to a new id
    pub async fn update(&self, current_id: &str, data: UpdateEmployee) -> AppResult<Employee> {
        let mut record = self.load(current_id).await?;

        let email = data.email.blank_as_keep();
        if let Patch::Set(ref email) = email {
            if !email.validate_email() {
                return Err(AppError::Validation("Invalid email format".to_string()));
            }
        }

        record.password = match data.password.blank_as_keep() {
            Patch::Keep => record.password,
            Patch::Clear => {
                return Err(AppError::Validation("Password cannot be cleared".to_string()));
            }
            Patch::Set(password) => {
                if password.chars().count() < MIN_PASSWORD_LEN {
                    return Err(AppError::Validation(
                        "Password must be at least 4 characters".to_string(),
                    ));
                }
                self.hash_password(&password)?
            }
        };

        record.first_name = data.first_name.blank_as_keep().apply(record.first_name);
        record.last_name = data.last_name.blank_as_keep().apply(record.last_name);
        record.email = email.apply(record.email);
        record.role = data.role.blank_as_keep().apply(record.role);
        record.is_admin = data.is_admin;
        record.is_super_admin = data.is_super_admin;

        let new_id = data
            .updated_employee_id
            .filter(|id| !id.is_empty() && id != current_id);

        match new_id {
            Some(new_id) => {
                check_id(&new_id)?;
                record.employee_id = new_id;
                // Not atomic: a failure between the two writes leaves both ids present
                self.repository.employees_create(&record).await?;
                self.repository.employees_delete(current_id).await?;
                tracing::info!("Re-keyed employee {} as {}", current_id, record.employee_id);
            }
            None => {
                self.repository.employees_replace(&record).await?;
                tracing::info!("Updated employee {}", record.employee_id);
            }
        }

        Ok(record.into())
    }

    /// Delete an employee
    pub async fn delete(&self, employee_id: &str) -> AppResult<DeletedEmployee> {
        let record = self.load(employee_id).await?;
        if !self.repository.employees_delete(employee_id).await? {
            return Err(AppError::NotFound(format!("Employee {} not found", employee_id)));
        }

        tracing::info!("Deleted employee {}", employee_id);
        Ok(record.into())
    }

    /// Overwrite only the password of an employee
    pub async fn reset_password(&self, employee_id: &str, data: ResetPassword) -> AppResult<MessageResponse> {
        check_id(employee_id)?;
        data.validate()?;
        let hash = self.hash_password(&data.password)?;
        self.repository.employees_set_password(employee_id, hash).await?;

        tracing::info!("Reset password of employee {}", employee_id);
        Ok(MessageResponse::new(format!("Password of {} reset", employee_id)))
    }

    /// Check credentials and return the signed-in session value
    pub async fn verify_credentials(&self, request: LoginRequest) -> AppResult<SignedInEmployee> {
        let record = match check_id(&request.employee_id) {
            Ok(()) => self.repository.employees_get(&request.employee_id).await?,
            Err(_) => None,
        };

        let Some(record) = record else {
            self.verify_password(&self.dummy_hash, &request.password);
            return Err(AppError::InvalidCredentials);
        };

        if !self.verify_password(&record.password, &request.password) {
            tracing::warn!("Failed login for employee {}", request.employee_id);
            return Err(AppError::InvalidCredentials);
        }

        Ok(Employee::from(record).into())
    }
}

fn check_id(employee_id: &str) -> AppResult<()> {
    validate_document_key(employee_id).map_err(|e| AppError::Validation(e.to_string()))
}
