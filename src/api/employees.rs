//! Employee management endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    api::extract::{AppJson, AppPath},
    error::AppResult,
    models::{
        employee::{CreateEmployee, DeletedEmployee, Employee, ResetPassword, UpdateEmployee},
        MessageResponse,
    },
    AppState,
};

/// List all employees
#[utoipa::path(
    get,
    path = "/employees",
    tag = "employees",
    responses(
        (status = 200, description = "List of employees", body = Vec<Employee>),
        (status = 503, description = "Document store unavailable", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_employees(State(state): State<AppState>) -> AppResult<Json<Vec<Employee>>> {
    let employees = state.services.employees.list().await?;
    Ok(Json(employees))
}

/// Get employee details by ID
#[utoipa::path(
    get,
    path = "/employees/{employee_id}",
    tag = "employees",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee details", body = Employee),
        (status = 404, description = "Employee not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_employee(
    State(state): State<AppState>,
    AppPath(employee_id): AppPath<String>,
) -> AppResult<Json<Employee>> {
    let employee = state.services.employees.get_by_id(&employee_id).await?;
    Ok(Json(employee))
}

/// Create a new employee
#[utoipa::path(
    post,
    path = "/employees",
    tag = "employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 409, description = "Employee ID already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_employee(
    State(state): State<AppState>,
    AppJson(employee): AppJson<CreateEmployee>,
) -> AppResult<(StatusCode, Json<Employee>)> {
    let created = state.services.employees.create(employee).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update an existing employee
#[utoipa::path(
    put,
    path = "/employees/{employee_id}",
    tag = "employees",
    params(
        ("employee_id" = String, Path, description = "Current employee ID")
    ),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Employee not found", body = crate::error::ErrorResponse),
        (status = 409, description = "New employee ID already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_employee(
    State(state): State<AppState>,
    AppPath(employee_id): AppPath<String>,
    AppJson(employee): AppJson<UpdateEmployee>,
) -> AppResult<Json<Employee>> {
    let updated = state.services.employees.update(&employee_id, employee).await?;
    Ok(Json(updated))
}

/// Delete an employee
#[utoipa::path(
    delete,
    path = "/employees/{employee_id}",
    tag = "employees",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Employee deleted", body = DeletedEmployee),
        (status = 404, description = "Employee not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_employee(
    State(state): State<AppState>,
    AppPath(employee_id): AppPath<String>,
) -> AppResult<Json<DeletedEmployee>> {
    let deleted = state.services.employees.delete(&employee_id).await?;
    Ok(Json(deleted))
}

/// Reset the password of an employee
#[utoipa::path(
    put,
    path = "/employees/{employee_id}/password",
    tag = "employees",
    params(
        ("employee_id" = String, Path, description = "Employee ID")
    ),
    request_body = ResetPassword,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Invalid password", body = crate::error::ErrorResponse),
        (status = 404, description = "Employee not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reset_password(
    State(state): State<AppState>,
    AppPath(employee_id): AppPath<String>,
    AppJson(request): AppJson<ResetPassword>,
) -> AppResult<Json<MessageResponse>> {
    let message = state
        .services
        .employees
        .reset_password(&employee_id, request)
        .await?;
    Ok(Json(message))
}
