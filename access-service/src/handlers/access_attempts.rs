use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{services::AccessAttemptStore, AppState};

/// Active records of denied network access, one per address
#[utoipa::path(
    get,
    path = "/admin/access-attempts",
    responses(
        (status = 200, description = "Active access attempt records", body = [AccessAttemptRecord]),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    tag = "Admission",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_access_attempts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let records = state.store.list_active_attempts().await?;
    Ok(Json(records))
}
