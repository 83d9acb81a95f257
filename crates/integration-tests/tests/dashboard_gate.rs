//! Integration tests for the protected dashboard.
//!
//! Run with: cargo test -p kiosk-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::http::StatusCode;
use chrono::TimeDelta;
use kiosk_integration_tests::{Outcome, StubIdentity, TEST_EMAIL, TestApp};
use serde_json::json;

async fn signed_in(identity: &Arc<StubIdentity>) -> TestApp {
    let mut app = TestApp::with_identity(identity.clone());
    let resp = app.sign_in().await;
    assert_eq!(resp.status, StatusCode::OK);
    app
}

// ============================================================================
// Access Gate
// ============================================================================

#[tokio::test]
async fn test_anonymous_dashboard_redirects_without_content() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = TestApp::with_identity(identity.clone());

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login"));
    assert!(!resp.text().contains("Welcome"));
    assert_eq!(identity.calls.user_lookups(), 0);
}

#[tokio::test]
async fn test_anonymous_dashboard_actions_redirect() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = TestApp::with_identity(identity);

    for uri in ["/dashboard/preferences", "/dashboard/clear"] {
        let resp = app.post_form(uri, "theme=dark").await;
        assert_eq!(resp.status, StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(resp.location(), Some("/login"), "{uri}");
    }
}

#[tokio::test]
async fn test_dashboard_renders_for_signed_in_user() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::OK);
    let page = resp.text();
    assert!(page.contains(&format!("Welcome, {TEST_EMAIL}!")));
    assert!(page.contains("You are signed in and can see this protected page."));
    assert_eq!(identity.calls.user_lookups(), 1);
}

#[tokio::test]
async fn test_revoked_token_is_sent_to_login() {
    let identity =
        Arc::new(StubIdentity::new().with_get_user(Outcome::reject(401, "invalid JWT")));
    let mut app = signed_in(&identity).await;

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login"));
}

#[tokio::test]
async fn test_unreachable_identity_service_is_sent_to_login() {
    let identity = Arc::new(StubIdentity::new().with_get_user(Outcome::Fail));
    let mut app = signed_in(&identity).await;

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/login"));
}

#[tokio::test]
async fn test_unknown_api_path_is_not_found() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = TestApp::with_identity(identity);

    let resp = app.get("/api/nothing-here").await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Session Storage
// ============================================================================

#[tokio::test]
async fn test_preferences_are_saved_and_shown() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;

    let resp = app
        .post_form(
            "/dashboard/preferences",
            "theme=dark&language=fr&notifications=on",
        )
        .await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/dashboard?notice=saved"));

    let resp = app.get("/dashboard?notice=saved").await;
    let page = resp.text();
    assert!(page.contains("Preferences saved."));
    assert!(page.contains(r#"<option value="dark" selected>"#));
    assert!(page.contains(r#"<option value="fr" selected>"#));
    assert!(page.contains(r#"name="notifications" checked"#));
}

#[tokio::test]
async fn test_invalid_preference_is_reported() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;

    let resp = app
        .post_form("/dashboard/preferences", "theme=sepia")
        .await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert!(resp.location().unwrap().starts_with("/dashboard?error="));
}

#[tokio::test]
async fn test_second_visit_shows_last_visit() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;

    let first = app.get("/dashboard").await;
    assert!(!first.text().contains("Last visit:"));

    let second = app.get("/dashboard").await;
    assert!(second.text().contains("Last visit:"));
}

#[tokio::test]
async fn test_clear_keeps_user_signed_in() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;
    app.post_form("/dashboard/preferences", "theme=dark&language=es")
        .await;
    app.get("/dashboard").await;

    let resp = app.post_form("/dashboard/clear", "").await;
    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(resp.location(), Some("/dashboard?notice=cleared"));

    let resp = app.get("/dashboard?notice=cleared").await;
    assert_eq!(resp.status, StatusCode::OK);
    let page = resp.text();
    assert!(page.contains("Session data cleared."));
    assert!(!page.contains("Last visit:"));
    assert!(!page.contains(r#"<option value="dark" selected>"#));
    assert!(page.contains(r#"<option value="en" selected>"#));
}

#[tokio::test]
async fn test_storage_does_not_survive_sign_in_from_new_browser() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;
    app.post_form("/dashboard/preferences", "theme=dark").await;

    app.forget_cookie();
    app.sign_in().await;

    let page = app.get("/dashboard").await.text();
    assert!(!page.contains(r#"<option value="dark" selected>"#));
}

// ============================================================================
// Session Refresh
// ============================================================================

#[tokio::test]
async fn test_expiring_session_is_refreshed() {
    let identity = Arc::new(StubIdentity::new().with_lifetime(TimeDelta::seconds(30)));
    let mut app = signed_in(&identity).await;

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(identity.calls.refreshes(), 1);
}

#[tokio::test]
async fn test_fresh_session_is_not_refreshed() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = signed_in(&identity).await;

    app.get("/dashboard").await;

    assert_eq!(identity.calls.refreshes(), 0);
}

#[tokio::test]
async fn test_rejected_refresh_drops_session() {
    let identity = Arc::new(
        StubIdentity::new()
            .with_lifetime(TimeDelta::seconds(30))
            .with_refresh(Outcome::reject(400, "Invalid Refresh Token")),
    );
    let mut app = signed_in(&identity).await;

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::SEE_OTHER);
    assert_eq!(identity.calls.user_lookups(), 0);
}

#[tokio::test]
async fn test_failed_refresh_lets_request_through() {
    let identity = Arc::new(
        StubIdentity::new()
            .with_lifetime(TimeDelta::seconds(30))
            .with_refresh(Outcome::Fail),
    );
    let mut app = signed_in(&identity).await;

    let resp = app.get("/dashboard").await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(identity.calls.refreshes(), 1);
}

#[tokio::test]
async fn test_static_paths_skip_refresh() {
    let identity = Arc::new(StubIdentity::new().with_lifetime(TimeDelta::seconds(30)));
    let mut app = signed_in(&identity).await;

    app.get("/static/does-not-exist.png").await;
    app.get("/favicon.ico").await;

    assert_eq!(identity.calls.refreshes(), 0);
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::with_identity(Arc::new(StubIdentity::new()));
    let resp = app.get("/health").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.text(), "ok");

    let resp = app.get("/health/ready").await;
    assert_eq!(resp.status, StatusCode::OK);

    let mut app = TestApp::with_identity(Arc::new(StubIdentity::new().with_health(Outcome::Fail)));
    let resp = app.get("/health/ready").await;
    assert_eq!(resp.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_responses_carry_request_id_and_security_headers() {
    let mut app = TestApp::with_identity(Arc::new(StubIdentity::new()));

    let resp = app.get("/health").await;

    assert!(resp.headers.contains_key("x-request-id"));
    assert_eq!(resp.headers["x-frame-options"], "DENY");
    assert_eq!(resp.headers["x-content-type-options"], "nosniff");
    assert!(resp.headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_session_cookie_is_http_only() {
    let identity = Arc::new(StubIdentity::new());
    let mut app = TestApp::with_identity(identity);

    let resp = app
        .post_json(
            "/auth/signin",
            &json!({ "email": TEST_EMAIL, "password": "pw" }),
        )
        .await;

    let cookie = resp.headers["set-cookie"].to_str().unwrap();
    assert!(cookie.starts_with("kiosk_session="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
}
