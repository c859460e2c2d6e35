//! Test helpers for access-service integration tests.
//!
//! Builds the full router over the in-process store and drives it with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use access_service::{
    build_router,
    config::{
        AccessConfig, AttentionConfig, Environment, JwtConfig, RateLimitConfig, SecurityConfig, SwaggerConfig,
        SwaggerMode,
    },
    models::{AllowListEntry, Principal, Role, RolePermissionGrant, RoleWithGrants, SessionCapabilities},
    services::MemoryStore,
    utils::{hash_password, Password},
    AppState,
};
use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tower::util::ServiceExt;
use uuid::Uuid;

const TEST_PRIVATE_KEY: &str = include_str!("../fixtures/test_private_key.pem");
const TEST_PUBLIC_KEY: &str = include_str!("../fixtures/test_public_key.pem");

/// Address covered by the office range every test app starts with.
pub const OFFICE_IP: &str = "10.20.0.15";
pub const OFFICE_RANGE: &str = "10.20.0.0/16";
/// Address no entry covers.
pub const OUTSIDE_IP: &str = "203.0.113.50";

pub const TEST_PASSWORD: &str = "correct horse battery staple";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    _key_files: (NamedTempFile, NamedTempFile),
}

fn write_key(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create key file");
    file.write_all(contents.as_bytes()).expect("Failed to write key file");
    file
}

pub fn test_config(private_key_path: String, public_key_path: String) -> AccessConfig {
    AccessConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "access-service-test".to_string(),
        service_version: "0.0.0".to_string(),
        log_level: "error".to_string(),
        otlp_endpoint: None,
        database: None,
        jwt: JwtConfig {
            private_key_path,
            public_key_path,
            session_expiry_minutes: 60,
        },
        attention: AttentionConfig { inactive_days: 30 },
        security: SecurityConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
        },
        swagger: SwaggerConfig {
            enabled: SwaggerMode::Disabled,
        },
        rate_limit: RateLimitConfig {
            login_attempts: 100,
            login_window_seconds: 60,
        },
    }
}

impl TestApp {
    /// Spawn an app whose allow-list holds the office range.
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn an app, adjusting the configuration first.
    pub async fn spawn_with(adjust: impl FnOnce(&mut AccessConfig)) -> Self {
        let private_key = write_key(TEST_PRIVATE_KEY);
        let public_key = write_key(TEST_PUBLIC_KEY);

        let mut config = test_config(
            private_key.path().to_string_lossy().into_owned(),
            public_key.path().to_string_lossy().into_owned(),
        );
        adjust(&mut config);

        let _ = access_service::services::metrics::init_metrics();

        let jwt = access_service::services::JwtService::new(&config.jwt).expect("Failed to load JWT keys");
        let store = Arc::new(MemoryStore::new());
        store
            .insert_allow_list_entry(AllowListEntry::office(OFFICE_RANGE, Some("Head office".to_string())))
            .expect("Failed to seed allow-list");

        let state = AppState::new(config, store.clone(), jwt);
        let router = build_router(state.clone()).await.expect("Failed to build router");

        Self {
            router,
            state,
            store,
            _key_files: (private_key, public_key),
        }
    }

    /// Add a role holding `permissions`.
    pub fn seed_role(&self, name: &str, permissions: &[&str]) -> Role {
        let role = Role::new(name);
        let grants = permissions
            .iter()
            .map(|p| RolePermissionGrant::new(role.role_id, *p))
            .collect();
        self.store
            .insert_role(RoleWithGrants {
                role: role.clone(),
                grants,
            })
            .expect("Failed to seed role");
        role
    }

    /// Add an active principal whose password is `TEST_PASSWORD`.
    pub fn seed_principal(&self, user_name: &str, role: Option<&Role>) -> Principal {
        let hash = hash_password(&Password::new(TEST_PASSWORD.to_string())).expect("Failed to hash password");
        let mut principal = Principal::new(user_name, format!("{}@example.com", user_name), hash);
        principal.role_id = role.map(|r| r.role_id);
        self.store
            .insert_principal(principal.clone())
            .expect("Failed to seed principal");
        principal
    }

    pub fn allow(&self, entry: AllowListEntry) {
        self.store
            .insert_allow_list_entry(entry)
            .expect("Failed to seed allow-list entry");
    }

    /// Session token for an arbitrary capability set.
    pub fn token_for(&self, caps: &SessionCapabilities) -> String {
        self.state
            .jwt
            .issue_session_token(caps)
            .expect("Failed to issue token")
            .access_token
    }

    /// Token for a principal that exists in the store with `permissions`.
    pub fn admin_token(&self, permissions: &[&str]) -> (Principal, String) {
        let principal = self.seed_principal(&format!("admin-{}", Uuid::new_v4().simple()), None);
        let caps = SessionCapabilities {
            principal_id: principal.principal_id,
            role: Some("Administrator".to_string()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            resource_scopes: Default::default(),
        };
        let token = self.token_for(&caps);
        (principal, token)
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        from_ip: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", from_ip);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("Failed to build request");

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, uri: &str, from_ip: &str, token: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, from_ip, token, None).await
    }

    pub async fn login(&self, login: &str, password: &str, from_ip: &str) -> Response<Body> {
        self.send(
            Method::POST,
            "/auth/login",
            from_ip,
            None,
            Some(serde_json::json!({ "login": login, "password": password })),
        )
        .await
    }

    /// Sign in with `TEST_PASSWORD` and return the access token.
    pub async fn login_token(&self, login: &str, from_ip: &str) -> String {
        let response = self.login(login, TEST_PASSWORD, from_ip).await;
        assert_eq!(response.status(), StatusCode::OK, "login should succeed");
        let body = read_json(response).await;
        body["access_token"]
            .as_str()
            .expect("access_token missing")
            .to_string()
    }
}

pub async fn read_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Assert the bare redirect sent to denied requests.
pub fn assert_denied(response: &Response<Body>) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).expect("Location header"),
        "https://www.InsureDaily.co.uk"
    );
}
