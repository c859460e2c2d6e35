use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::alerts::{AttentionStateResponse, ReconcileAllResponse},
    middleware::AuthSession,
    AppState,
};

/// Current attention summary
///
/// Principals needing attention, principals inactive past the threshold,
/// and principals whose attention was acknowledged.
#[utoipa::path(
    get,
    path = "/admin/alerts",
    responses(
        (status = 200, description = "Attention summary", body = AlertSummary),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn summary(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let summary = state.attention.summary().await?;
    Ok(Json(summary))
}

/// Reconcile attention flags for every principal
#[utoipa::path(
    post,
    path = "/admin/alerts/reconcile",
    responses(
        (status = 200, description = "Reconcile report", body = ReconcileAllResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 403, description = "Access denied", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reconcile_all(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let report = state.attention.reconcile_all().await?;
    Ok(Json(ReconcileAllResponse::from(report)))
}

/// Reconcile attention flags for one principal after an assignment change
#[utoipa::path(
    post,
    path = "/admin/users/{id}/reconcile",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    responses(
        (status = 200, description = "Attention state", body = AttentionStateResponse),
        (status = 404, description = "Principal not found", body = ErrorResponse),
        (status = 409, description = "Concurrent update", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn reconcile_one(
    State(state): State<AppState>,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attention = state.attention.reconcile(principal_id).await?;
    Ok(Json(AttentionStateResponse {
        principal_id,
        attention,
    }))
}

/// Record that a principal was registered
///
/// Opens an attention episode for the new account.
#[utoipa::path(
    post,
    path = "/admin/users/{id}/registered",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    responses(
        (status = 200, description = "Attention state", body = AttentionStateResponse),
        (status = 404, description = "Principal not found", body = ErrorResponse),
        (status = 409, description = "Concurrent update", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn registered(
    State(state): State<AppState>,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attention = state.attention.mark_new_user(principal_id).await?;
    Ok(Json(AttentionStateResponse {
        principal_id,
        attention,
    }))
}

/// Acknowledge a principal's attention flag
#[utoipa::path(
    post,
    path = "/admin/alerts/{id}/acknowledge",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    responses(
        (status = 200, description = "Attention state", body = AttentionStateResponse),
        (status = 404, description = "Principal not found", body = ErrorResponse),
        (status = 409, description = "Concurrent update", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn acknowledge(
    State(state): State<AppState>,
    AuthSession(caps): AuthSession,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let acknowledged_by = caps.principal_id.to_string();
    let attention = state
        .attention
        .acknowledge(principal_id, &acknowledged_by)
        .await?;

    tracing::info!(
        principal_id = %principal_id,
        acknowledged_by = %acknowledged_by,
        "Attention acknowledged"
    );

    Ok(Json(AttentionStateResponse {
        principal_id,
        attention,
    }))
}

/// Clear an acknowledgement so the principal is listed again
#[utoipa::path(
    delete,
    path = "/admin/alerts/{id}/acknowledge",
    params(
        ("id" = Uuid, Path, description = "Principal ID")
    ),
    responses(
        (status = 200, description = "Attention state", body = AttentionStateResponse),
        (status = 404, description = "Principal not found", body = ErrorResponse),
        (status = 409, description = "Concurrent update", body = ErrorResponse)
    ),
    tag = "Alerts",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn unacknowledge(
    State(state): State<AppState>,
    Path(principal_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attention = state.attention.unacknowledge(principal_id).await?;
    Ok((
        StatusCode::OK,
        Json(AttentionStateResponse {
            principal_id,
            attention,
        }),
    ))
}
