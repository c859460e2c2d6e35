use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    dtos::authz::{AuthzCheckRequest, AuthzCheckResponse},
    middleware::AuthSession,
    utils::ValidatedJson,
    AppState,
};

/// Evaluate a policy for the current session
///
/// Permission names are evaluated directly against the session's tags; no
/// registration is needed.
#[utoipa::path(
    post,
    path = "/authz/check",
    request_body = AuthzCheckRequest,
    responses(
        (status = 200, description = "Authorization decision", body = AuthzCheckResponse),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Authorization",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn check(
    State(state): State<AppState>,
    AuthSession(caps): AuthSession,
    ValidatedJson(req): ValidatedJson<AuthzCheckRequest>,
) -> Result<impl IntoResponse, AppError> {
    let policy = state.policies.resolve(&req.policy);
    let allowed = policy.permits(&caps, req.resource_id.as_deref());

    tracing::debug!(
        principal_id = %caps.principal_id,
        policy = %req.policy,
        resource_id = req.resource_id.as_deref().unwrap_or(""),
        allowed,
        "Authorization check"
    );

    Ok(Json(AuthzCheckResponse {
        allowed,
        policy_kind: policy.kind().to_string(),
    }))
}
