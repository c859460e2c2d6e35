pub mod config;
pub mod db;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{openapi::security::SecurityScheme, Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AccessConfig;
use crate::middleware::{RequiredPolicy, require_policy};
use crate::services::{
    AccessStore, AdmissionGate, AttentionEngine, JwtService, PermissionPolicyResolver, SessionClaimsProjector,
    SignInGate,
};
use crate::utils::Argon2Verifier;
use service_core::error::AppError;
use std::sync::Arc;

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::session::login,
        handlers::session::current_session,
        handlers::authz::check,
        handlers::alerts::summary,
        handlers::alerts::reconcile_all,
        handlers::alerts::reconcile_one,
        handlers::alerts::registered,
        handlers::alerts::acknowledge,
        handlers::alerts::unacknowledge,
        handlers::access_attempts::list_access_attempts,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::session::LoginRequest,
            dtos::session::LoginResponse,
            dtos::authz::AuthzCheckRequest,
            dtos::authz::AuthzCheckResponse,
            dtos::alerts::ReconcileAllResponse,
            dtos::alerts::AttentionStateResponse,
            services::SessionToken,
            models::SessionCapabilities,
            models::AttentionState,
            models::AlertSummary,
            models::AlertItem,
            models::AttentionReason,
            models::AccessAttemptRecord,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Sign-in and session capabilities"),
        (name = "Authorization", description = "Policy evaluation against session capabilities"),
        (name = "Alerts", description = "Account attention tracking"),
        (name = "Admission", description = "Network admission records"),
        (name = "Observability", description = "Service health and monitoring"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: AccessConfig,
    pub store: Arc<dyn AccessStore>,
    pub jwt: JwtService,
    pub admission: AdmissionGate,
    pub sign_in: SignInGate,
    pub projector: SessionClaimsProjector,
    pub attention: AttentionEngine,
    pub policies: PermissionPolicyResolver,
    pub login_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every gate and engine over one store.
    pub fn new<S>(config: AccessConfig, store: Arc<S>, jwt: JwtService) -> Self
    where
        S: AccessStore + 'static,
    {
        let admission = AdmissionGate::new(store.clone(), store.clone(), store.clone());
        let sign_in = SignInGate::new(store.clone(), store.clone(), Arc::new(Argon2Verifier));
        let projector = SessionClaimsProjector::new(store.clone());
        let attention = AttentionEngine::new(store.clone(), store.clone(), config.attention.inactive_days);
        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
        );

        Self {
            config,
            store,
            jwt,
            admission,
            sign_in,
            projector,
            attention,
            policies: PermissionPolicyResolver,
            login_rate_limiter,
        }
    }
}

/// Routes guarded by a session plus one named policy.
fn admin_route(
    state: &AppState,
    path: &str,
    method_router: service_core::axum::routing::MethodRouter<AppState>,
    policy: &'static str,
) -> Router<AppState> {
    Router::new()
        .route(path, method_router)
        .route_layer(from_fn_with_state(RequiredPolicy::new(policy), require_policy))
        .route_layer(from_fn_with_state(state.clone(), middleware::session_middleware))
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    let admin_routes = Router::new()
        .merge(admin_route(&state, "/admin/alerts", get(handlers::alerts::summary), "User.Read"))
        .merge(admin_route(
            &state,
            "/admin/alerts/reconcile",
            post(handlers::alerts::reconcile_all),
            "User.Update",
        ))
        .merge(admin_route(
            &state,
            "/admin/users/:id/reconcile",
            post(handlers::alerts::reconcile_one),
            "User.Update",
        ))
        .merge(admin_route(
            &state,
            "/admin/users/:id/registered",
            post(handlers::alerts::registered),
            "User.Create",
        ))
        .merge(admin_route(
            &state,
            "/admin/alerts/:id/acknowledge",
            post(handlers::alerts::acknowledge).delete(handlers::alerts::unacknowledge),
            "User.Update",
        ))
        .merge(admin_route(
            &state,
            "/admin/access-attempts",
            get(handlers::access_attempts::list_access_attempts),
            "IPSafeListing.Read",
        ));

    // Login route with per-address rate limiting
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::session::login))
        .route_layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let session_routes = Router::new()
        .route("/auth/session", get(handlers::session::current_session))
        .route("/authz/check", post(handlers::authz::check))
        .route_layer(from_fn_with_state(state.clone(), middleware::session_middleware));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics));

    let swagger_enabled = match state.config.environment {
        crate::config::Environment::Dev => true,
        crate::config::Environment::Prod => match state.config.swagger.enabled {
            crate::config::SwaggerMode::Public | crate::config::SwaggerMode::Authenticated => true,
            crate::config::SwaggerMode::Disabled => false,
        },
    };

    if swagger_enabled {
        app = app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // Keep the OpenAPI JSON for programmatic access
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { service_core::axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .merge(login_route)
        .merge(session_routes)
        .merge(admin_routes)
        .with_state(state.clone())
        // Network admission ahead of every route
        .layer(from_fn_with_state(state.clone(), middleware::admission_middleware))
        .layer(from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.security.allowed_origins));

    Ok(app)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    use service_core::axum::http::{header, HeaderValue, Method};

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 503, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<service_core::axum::Json<serde_json::Value>, AppError> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        AppError::ServiceUnavailable
    })?;

    Ok(service_core::axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": "up"
        }
    })))
}
