use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::{error::AppError, middleware::client_addr::resolve_client_addr};
use std::net::SocketAddr;

use crate::{
    dtos::session::{LoginRequest, LoginResponse},
    middleware::AuthSession,
    services::{ServiceError, SignInOutcome},
    utils::{Password, ValidatedJson},
    AppState,
};

/// Sign in with email or user name and password
///
/// The network origin must be allow-listed for this principal before the
/// password is checked.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 403, description = "Sign-in not allowed", body = ErrorResponse),
        (status = 422, description = "Validation error", body = ErrorResponse),
        (status = 429, description = "Too many login attempts", body = ErrorResponse),
        (status = 503, description = "Service unavailable", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let client_addr = resolve_client_addr(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    let password = Password::new(req.password);

    let principal = match state.sign_in.sign_in(&req.login, &password, client_addr).await {
        SignInOutcome::Success(principal) => principal,
        SignInOutcome::Failed => return Err(ServiceError::InvalidCredentials.into()),
        SignInOutcome::NotAllowed(_) | SignInOutcome::BindingConflict { .. } => {
            return Err(ServiceError::AccessDenied.into())
        }
    };

    let capabilities = state.projector.project(&principal).await.map_err(|e| {
        tracing::error!(principal_id = %principal.principal_id, error = %e, "Failed to project session capabilities");
        AppError::ServiceUnavailable
    })?;

    let token = state.jwt.issue_session_token(&capabilities)?;

    if let Err(e) = state.attention.record_login(principal.principal_id).await {
        tracing::warn!(principal_id = %principal.principal_id, error = %e, "Failed to record login for attention tracking");
    }

    tracing::info!(
        principal_id = %principal.principal_id,
        role = capabilities.role.as_deref().unwrap_or(""),
        permissions = capabilities.permissions.len(),
        scopes = capabilities.resource_scopes.len(),
        "Session issued"
    );

    Ok((StatusCode::OK, Json(LoginResponse { token, capabilities })))
}

/// Capabilities of the current session
#[utoipa::path(
    get,
    path = "/auth/session",
    responses(
        (status = 200, description = "Current session capabilities", body = SessionCapabilities),
        (status = 401, description = "Invalid or expired token", body = ErrorResponse)
    ),
    tag = "Authentication",
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn current_session(AuthSession(caps): AuthSession) -> impl IntoResponse {
    Json(caps)
}
