use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::models::SessionCapabilities;
use crate::services::PermissionPolicyResolver;

/// Policy a route requires, resolved by name at request time.
#[derive(Debug, Clone, Copy)]
pub struct RequiredPolicy {
    pub name: &'static str,
    resolver: PermissionPolicyResolver,
}

impl RequiredPolicy {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            resolver: PermissionPolicyResolver,
        }
    }
}

/// Middleware to require a named policy. Runs after `session_middleware`.
pub async fn require_policy(
    State(required): State<RequiredPolicy>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let caps = req.extensions().get::<SessionCapabilities>().ok_or_else(|| {
        AppError::Unauthorized(anyhow::anyhow!("Authentication required"))
    })?;

    if !required.resolver.authorize(caps, required.name, None) {
        tracing::warn!(
            principal_id = %caps.principal_id,
            policy = required.name,
            "Policy check failed"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!("Access denied")));
    }

    Ok(next.run(req).await)
}
