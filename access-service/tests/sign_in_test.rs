//! Sign-in gate and session issuance integration tests.

mod common;

use access_service::models::{AllowListEntry, ResourceScopeGrant};
use access_service::services::PrincipalStore;
use axum::http::{Method, StatusCode};
use common::{read_json, TestApp, OFFICE_IP, TEST_PASSWORD};
use uuid::Uuid;

#[tokio::test]
async fn test_login_from_office_issues_capabilities() {
    let app = TestApp::spawn().await;
    let role = app.seed_role("Underwriter", &["User.Read", "Quote.Create"]);
    let principal = app.seed_principal("jsmith", Some(&role));
    let site = Uuid::new_v4();
    app.store
        .update_principal(principal.principal_id, |p| {
            p.scope_grants.push(ResourceScopeGrant::new(p.principal_id, site))
        })
        .unwrap();

    let response = app.login("jsmith@example.com", TEST_PASSWORD, OFFICE_IP).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["capabilities"]["role"], "Underwriter");
    assert_eq!(
        body["capabilities"]["permissions"],
        serde_json::json!(["Quote.Create", "User.Read"])
    );
    assert_eq!(
        body["capabilities"]["resource_scopes"],
        serde_json::json!([site.to_string()])
    );

    let stored = app.store.find_principal(principal.principal_id).await.unwrap().unwrap();
    assert!(stored.last_login_utc.is_some());
}

#[tokio::test]
async fn test_login_by_user_name_is_case_insensitive() {
    let app = TestApp::spawn().await;
    app.seed_principal("mjones", None);

    let response = app.login("MJones", TEST_PASSWORD, OFFICE_IP).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert!(body["capabilities"]["role"].is_null());
    assert_eq!(body["capabilities"]["permissions"], serde_json::json!([]));
}

#[tokio::test]
async fn test_wrong_password_and_unknown_login_look_the_same() {
    let app = TestApp::spawn().await;
    app.seed_principal("agent", None);

    let wrong = app.login("agent", "not the password", OFFICE_IP).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    let wrong_body = read_json(wrong).await;

    let unknown = app.login("nobody", "whatever", OFFICE_IP).await;
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);
    let unknown_body = read_json(unknown).await;

    assert_eq!(wrong_body, unknown_body);
}

#[tokio::test]
async fn test_individual_binding_admits_its_owner() {
    let app = TestApp::spawn().await;
    let owner = app.seed_principal("homeworker", None);
    app.allow(AllowListEntry::bound_to("198.51.100.30", owner.principal_id));

    let response = app.login("homeworker", TEST_PASSWORD, "198.51.100.30").await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_address_bound_to_someone_else_is_refused() {
    let app = TestApp::spawn().await;
    let owner = app.seed_principal("owner", None);
    app.seed_principal("intruder", None);
    app.allow(AllowListEntry::bound_to("198.51.100.31", owner.principal_id));

    let refused = app.login("intruder", TEST_PASSWORD, "198.51.100.31").await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    // Wrong password does not change the answer: binding is checked first.
    let refused = app.login("intruder", "bad password", "198.51.100.31").await;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_office_range_wins_over_foreign_binding() {
    let app = TestApp::spawn().await;
    let owner = app.seed_principal("desk-owner", None);
    app.seed_principal("colleague", None);
    app.allow(AllowListEntry::bound_to(OFFICE_IP, owner.principal_id));

    let response = app.login("colleague", TEST_PASSWORD, OFFICE_IP).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_inactive_principal_cannot_sign_in() {
    let app = TestApp::spawn().await;
    let principal = app.seed_principal("leaver", None);
    app.store
        .update_principal(principal.principal_id, |p| p.is_deleted = true)
        .unwrap();

    let response = app.login("leaver", TEST_PASSWORD, OFFICE_IP).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_blank_login_is_rejected() {
    let app = TestApp::spawn().await;

    let response = app.login("", TEST_PASSWORD, OFFICE_IP).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_session_endpoint_returns_token_capabilities() {
    let app = TestApp::spawn().await;
    let role = app.seed_role("Support", &["User.Read"]);
    app.seed_principal("helpdesk", Some(&role));
    let token = app.login_token("helpdesk", OFFICE_IP).await;

    let response = app.get("/auth/session", OFFICE_IP, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["role"], "Support");
    assert_eq!(body["permissions"], serde_json::json!(["User.Read"]));

    let missing = app.get("/auth/session", OFFICE_IP, None).await;
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

    let garbage = app.get("/auth/session", OFFICE_IP, Some("not-a-token")).await;
    assert_eq!(garbage.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_is_rate_limited_per_address() {
    let app = TestApp::spawn_with(|config| {
        config.rate_limit.login_attempts = 2;
        config.rate_limit.login_window_seconds = 60;
    })
    .await;
    app.seed_principal("busy", None);

    for _ in 0..2 {
        let response = app.login("busy", "bad password", OFFICE_IP).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let limited = app.login("busy", TEST_PASSWORD, OFFICE_IP).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));

    // Other routes are not limited.
    let health = app.send(Method::GET, "/health", OFFICE_IP, None, None).await;
    assert_eq!(health.status(), StatusCode::OK);
}
