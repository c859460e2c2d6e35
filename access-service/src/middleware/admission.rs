use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use service_core::middleware::client_addr::client_addr_from_request;

use super::auth::bearer_token;
use crate::services::{AdmissionDecision, AdmissionRequest, DENIAL_REDIRECT_URL};
use crate::AppState;

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Redirect sent to every denied request. Carries no body and no reason.
pub fn denial_response() -> Response {
    (StatusCode::FOUND, [(header::LOCATION, DENIAL_REDIRECT_URL)]).into_response()
}

/// Network admission gate applied ahead of every route.
pub async fn admission_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let headers = req.headers();

    // Only a valid token identifies a principal; anything else is anonymous.
    let principal_id = bearer_token(headers)
        .and_then(|token| state.jwt.validate_session_token(token).ok())
        .and_then(|claims| claims.sub.parse().ok());

    let admission = AdmissionRequest {
        client_addr: client_addr_from_request(&req),
        principal_id,
        user_agent: header_str(headers, header::USER_AGENT),
        request_path: Some(
            req.uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| req.uri().path().to_string()),
        ),
        referer: header_str(headers, header::REFERER),
    };

    match state.admission.evaluate(&admission).await {
        AdmissionDecision::Admit => next.run(req).await,
        AdmissionDecision::Deny(_) => denial_response(),
    }
}
