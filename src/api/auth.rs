//! Sign-in endpoint
//!
//! Credentials are checked server side and the signed-in employee is handed
//! back to the client as an explicit session value. No endpoint requires it.

use axum::{extract::State, Json};

use crate::{
    api::extract::AppJson,
    error::AppResult,
    models::employee::{LoginRequest, SignedInEmployee},
    AppState,
};

/// Check an employee id and password
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SignedInEmployee),
        (status = 401, description = "Invalid employee id or password", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> AppResult<Json<SignedInEmployee>> {
    let session = state.services.employees.verify_credentials(request).await?;
    Ok(Json(session))
}
