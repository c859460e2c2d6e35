//! Account attention tracking integration tests.

mod common;

use access_service::models::ResourceScopeGrant;
use access_service::services::PrincipalStore;
use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{read_json, TestApp, OFFICE_IP, OUTSIDE_IP};
use uuid::Uuid;

const ADMIN_PERMISSIONS: &[&str] = &["User.Read", "User.Update", "User.Create", "IPSafeListing.Read"];

async fn summary(app: &TestApp, token: &str) -> serde_json::Value {
    let response = app.get("/admin/alerts", OFFICE_IP, Some(token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await
}

fn listed(list: &serde_json::Value, principal_id: Uuid) -> Option<serde_json::Value> {
    list.as_array()?
        .iter()
        .find(|item| item["principal_id"] == principal_id.to_string())
        .cloned()
}

#[tokio::test]
async fn test_registration_opens_an_attention_episode() {
    let app = TestApp::spawn().await;
    let (_, token) = app.admin_token(ADMIN_PERMISSIONS);
    let newcomer = app.seed_principal("newcomer", None);

    let response = app
        .send(
            Method::POST,
            &format!("/admin/users/{}/registered", newcomer.principal_id),
            OFFICE_IP,
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["attention"]["is_new_user"], true);
    assert_eq!(body["attention"]["needs_attention"], true);

    let alerts = summary(&app, &token).await;
    let item = listed(&alerts["attention_needed"], newcomer.principal_id).expect("newcomer listed");
    assert_eq!(item["reason_label"], "New user - no role and website assigned");
    assert_eq!(item["days_since"], 0);
}

#[tokio::test]
async fn test_completing_assignments_and_reconciling_clears_the_flag() {
    let app = TestApp::spawn().await;
    let (_, token) = app.admin_token(ADMIN_PERMISSIONS);
    let role = app.seed_role("Agent", &["Quote.Read"]);
    let principal = app.seed_principal("trainee", None);
    app.state.attention.mark_new_user(principal.principal_id).await.unwrap();

    app.store
        .update_principal(principal.principal_id, |p| p.role_id = Some(role.role_id))
        .unwrap();
    let alerts = summary(&app, &token).await;
    let item = listed(&alerts["attention_needed"], principal.principal_id).unwrap();
    assert_eq!(item["reason_label"], "New user - no website assigned");

    app.store
        .update_principal(principal.principal_id, |p| {
            p.scope_grants.push(ResourceScopeGrant::new(p.principal_id, Uuid::new_v4()))
        })
        .unwrap();

    let response = app
        .send(
            Method::POST,
            &format!("/admin/users/{}/reconcile", principal.principal_id),
            OFFICE_IP,
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["attention"]["needs_attention"], false);
    assert_eq!(body["attention"]["is_new_user"], false);

    let alerts = summary(&app, &token).await;
    assert!(listed(&alerts["attention_needed"], principal.principal_id).is_none());
}

#[tokio::test]
async fn test_acknowledge_and_unacknowledge() {
    let app = TestApp::spawn().await;
    let (admin, token) = app.admin_token(ADMIN_PERMISSIONS);
    let principal = app.seed_principal("ignored", None);
    app.state.attention.mark_new_user(principal.principal_id).await.unwrap();

    let uri = format!("/admin/alerts/{}/acknowledge", principal.principal_id);
    let response = app.send(Method::POST, &uri, OFFICE_IP, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["attention"]["attention_ignored_by"], admin.principal_id.to_string());

    let alerts = summary(&app, &token).await;
    assert!(listed(&alerts["attention_needed"], principal.principal_id).is_none());
    let item = listed(&alerts["acknowledged"], principal.principal_id).expect("acknowledged listed");
    assert_eq!(item["reason_label"], "Admin acknowledged");

    let response = app.send(Method::DELETE, &uri, OFFICE_IP, Some(&token), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let alerts = summary(&app, &token).await;
    assert!(listed(&alerts["acknowledged"], principal.principal_id).is_none());
    assert!(listed(&alerts["attention_needed"], principal.principal_id).is_some());
}

#[tokio::test]
async fn test_login_resets_flags_once_assignments_are_complete() {
    let app = TestApp::spawn().await;
    let role = app.seed_role("Broker", &["Quote.Read"]);
    let principal = app.seed_principal("broker", Some(&role));
    app.store
        .update_principal(principal.principal_id, |p| {
            p.scope_grants.push(ResourceScopeGrant::new(p.principal_id, Uuid::new_v4()))
        })
        .unwrap();
    app.state.attention.mark_new_user(principal.principal_id).await.unwrap();

    app.login_token("broker", OFFICE_IP).await;

    let stored = app.store.find_principal(principal.principal_id).await.unwrap().unwrap();
    assert!(!stored.attention.needs_attention);
    assert!(!stored.attention.is_new_user);
    assert!(stored.last_login_utc.is_some());
}

#[tokio::test]
async fn test_login_keeps_flags_while_assignments_are_missing() {
    let app = TestApp::spawn().await;
    let principal = app.seed_principal("unassigned", None);
    app.state.attention.mark_new_user(principal.principal_id).await.unwrap();

    app.login_token("unassigned", OFFICE_IP).await;

    let stored = app.store.find_principal(principal.principal_id).await.unwrap().unwrap();
    assert!(stored.attention.needs_attention);
    assert!(stored.attention.is_new_user);
}

#[tokio::test]
async fn test_reconcile_all_resets_completed_principals() {
    let app = TestApp::spawn().await;
    let (_, token) = app.admin_token(ADMIN_PERMISSIONS);
    let role = app.seed_role("Agent", &["Quote.Read"]);
    let ready = app.seed_principal("ready", Some(&role));
    app.store
        .update_principal(ready.principal_id, |p| {
            p.scope_grants.push(ResourceScopeGrant::new(p.principal_id, Uuid::new_v4()))
        })
        .unwrap();
    app.state.attention.mark_new_user(ready.principal_id).await.unwrap();
    let pending = app.seed_principal("pending", None);
    app.state.attention.mark_new_user(pending.principal_id).await.unwrap();

    let response = app
        .send(Method::POST, "/admin/alerts/reconcile", OFFICE_IP, Some(&token), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = read_json(response).await;
    assert_eq!(report["reset"], 1);
    assert!(report["examined"].as_u64().unwrap() >= 2);

    let alerts = summary(&app, &token).await;
    assert!(listed(&alerts["attention_needed"], ready.principal_id).is_none());
    assert!(listed(&alerts["attention_needed"], pending.principal_id).is_some());
}

#[tokio::test]
async fn test_dormant_principals_are_reported_and_flagged() {
    let app = TestApp::spawn().await;
    let (_, token) = app.admin_token(ADMIN_PERMISSIONS);
    let role = app.seed_role("Agent", &["Quote.Read"]);
    let dormant = app.seed_principal("dormant", Some(&role));
    app.store
        .update_principal(dormant.principal_id, |p| {
            p.scope_grants.push(ResourceScopeGrant::new(p.principal_id, Uuid::new_v4()));
            p.last_login_utc = Some(Utc::now() - Duration::days(35));
        })
        .unwrap();

    let alerts = summary(&app, &token).await;
    let inactive = listed(&alerts["inactive"], dormant.principal_id).expect("dormant listed as inactive");
    assert_eq!(inactive["reason_label"], "User inactive for 30+ days");
    assert_eq!(inactive["days_since"], 35);
    assert!(listed(&alerts["attention_needed"], dormant.principal_id).is_none());

    let response = app
        .send(
            Method::POST,
            &format!("/admin/users/{}/reconcile", dormant.principal_id),
            OFFICE_IP,
            Some(&token),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let alerts = summary(&app, &token).await;
    let flagged = listed(&alerts["attention_needed"], dormant.principal_id).expect("dormant flagged");
    assert_eq!(flagged["reason_label"], "User inactive for 30+ days");
}

#[tokio::test]
async fn test_unknown_principal_is_not_found() {
    let app = TestApp::spawn().await;
    let (_, token) = app.admin_token(ADMIN_PERMISSIONS);

    let response = app
        .send(
            Method::POST,
            &format!("/admin/users/{}/reconcile", Uuid::new_v4()),
            OFFICE_IP,
            Some(&token),
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_access_attempts_are_listed_for_auditors() {
    let app = TestApp::spawn().await;
    let (_, token) = app.admin_token(ADMIN_PERMISSIONS);

    app.get("/health", OUTSIDE_IP, None).await;
    app.get("/metrics", OUTSIDE_IP, None).await;

    let response = app.get("/admin/access-attempts", OFFICE_IP, Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let records = read_json(response).await;
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["ip_address"], OUTSIDE_IP);
    assert_eq!(records[0]["access_attempts"], 2);
    assert_eq!(records[0]["request_path"], "/metrics");
}
