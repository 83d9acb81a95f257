//! Integration tests for Kiosk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p kiosk-integration-tests
//! ```
//!
//! The full storefront router is driven in-process with `tower::ServiceExt`;
//! no port is bound. The identity service and the product catalog are
//! replaced by the stubs in this crate, or by `wiremock` servers standing in
//! for Supabase.
//!
//! # Test Categories
//!
//! - `auth_endpoints` - JSON and form sign-in / sign-out
//! - `dashboard_gate` - protected routes and session storage
//! - `products` - product listing, HTML and JSON
//! - `supabase_client` - Supabase clients against a mock server

#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, Bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::{TimeDelta, Utc};
use kiosk_core::{Product, User, UserId};
use kiosk_storefront::catalog::{CatalogError, CatalogSource, MockCatalog, ProductCatalog};
use kiosk_storefront::config::AppConfig;
use kiosk_storefront::identity::{
    AuthSession, IdentityError, IdentityProvider, PasswordCredentials,
};
use kiosk_storefront::middleware::session::SESSION_COOKIE_NAME;
use kiosk_storefront::state::AppState;
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Email the stub identity service signs in.
pub const TEST_EMAIL: &str = "ana@example.com";

/// Password accepted by tests that sign in.
pub const TEST_PASSWORD: &str = "correct horse";

/// Access token issued on sign-in.
pub const ACCESS_TOKEN: &str = "access-token-1";

/// Access token issued on refresh.
pub const REFRESHED_ACCESS_TOKEN: &str = "access-token-2";

/// Fixed id of the stub user.
#[must_use]
pub fn test_user_id() -> UserId {
    UserId::new(Uuid::from_u128(0x8d0f_d2b3_9ca7_4d9e_a95f_9e13_dc3a_3f8a))
}

/// The user the stub identity service reports.
#[must_use]
pub fn test_user() -> User {
    User {
        id: test_user_id(),
        email: Some(TEST_EMAIL.to_string()),
        created_at: None,
        last_sign_in_at: None,
    }
}

/// Configuration pointing at an unroutable Supabase project.
///
/// Tests that use it never reach the network; the clients are stubbed.
#[must_use]
pub fn test_config() -> AppConfig {
    config_for("http://127.0.0.1:9")
}

/// Configuration pointing at `supabase_url`, e.g. a `wiremock` server.
#[must_use]
pub fn config_for(supabase_url: &str) -> AppConfig {
    let url = supabase_url.to_string();
    AppConfig::from_lookup(move |key| match key {
        "SUPABASE_URL" => Some(url.clone()),
        "SUPABASE_ANON_KEY" => Some("test-anon-key".to_string()),
        _ => None,
    })
    .expect("test configuration is valid")
}

// =============================================================================
// Stub Identity Service
// =============================================================================

/// How a stubbed identity call answers.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Answer successfully.
    Succeed,
    /// Refuse with an error status and message, as the identity service does
    /// for bad credentials or revoked tokens.
    Reject { status: u16, message: String },
    /// Fail without an answer the storefront can relay.
    Fail,
}

impl Outcome {
    /// Shorthand for [`Outcome::Reject`].
    #[must_use]
    pub fn reject(status: u16, message: &str) -> Self {
        Self::Reject {
            status,
            message: message.to_string(),
        }
    }

    fn answer<T>(&self, value: impl FnOnce() -> T) -> Result<T, IdentityError> {
        match self {
            Self::Succeed => Ok(value()),
            Self::Reject { status, message } => Err(IdentityError::rejected(*status, message)),
            Self::Fail => Err(IdentityError::Parse("stubbed transport failure".to_string())),
        }
    }
}

/// Number of calls made to each identity operation.
#[derive(Debug, Default)]
pub struct IdentityCalls {
    pub sign_in: AtomicUsize,
    pub get_user: AtomicUsize,
    pub refresh: AtomicUsize,
    pub sign_out: AtomicUsize,
}

impl IdentityCalls {
    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sign_ins(&self) -> usize {
        self.sign_in.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn user_lookups(&self) -> usize {
        self.get_user.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn refreshes(&self) -> usize {
        self.refresh.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn sign_outs(&self) -> usize {
        self.sign_out.load(Ordering::SeqCst)
    }

    /// Total calls across all operations.
    #[must_use]
    pub fn total(&self) -> usize {
        self.sign_ins() + self.user_lookups() + self.refreshes() + self.sign_outs()
    }
}

/// Identity service with scripted answers.
///
/// Every operation succeeds unless configured otherwise. Issued sessions are
/// valid for `lifetime`, one hour by default.
#[derive(Debug)]
pub struct StubIdentity {
    sign_in: Outcome,
    get_user: Outcome,
    refresh: Outcome,
    sign_out: Outcome,
    health: Outcome,
    lifetime: TimeDelta,
    pub calls: IdentityCalls,
}

impl Default for StubIdentity {
    fn default() -> Self {
        Self {
            sign_in: Outcome::Succeed,
            get_user: Outcome::Succeed,
            refresh: Outcome::Succeed,
            sign_out: Outcome::Succeed,
            health: Outcome::Succeed,
            lifetime: TimeDelta::hours(1),
            calls: IdentityCalls::default(),
        }
    }
}

impl StubIdentity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sign_in(mut self, outcome: Outcome) -> Self {
        self.sign_in = outcome;
        self
    }

    #[must_use]
    pub fn with_get_user(mut self, outcome: Outcome) -> Self {
        self.get_user = outcome;
        self
    }

    #[must_use]
    pub fn with_refresh(mut self, outcome: Outcome) -> Self {
        self.refresh = outcome;
        self
    }

    #[must_use]
    pub fn with_sign_out(mut self, outcome: Outcome) -> Self {
        self.sign_out = outcome;
        self
    }

    #[must_use]
    pub fn with_health(mut self, outcome: Outcome) -> Self {
        self.health = outcome;
        self
    }

    /// Issue sessions that expire `lifetime` from now.
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: TimeDelta) -> Self {
        self.lifetime = lifetime;
        self
    }

    fn session(&self, access_token: &str) -> AuthSession {
        AuthSession {
            access_token: SecretString::from(access_token),
            refresh_token: SecretString::from("refresh-token"),
            expires_at: Utc::now() + self.lifetime,
            user: test_user(),
        }
    }
}

#[async_trait]
impl IdentityProvider for StubIdentity {
    async fn sign_in_with_password(
        &self,
        _credentials: &PasswordCredentials,
    ) -> Result<AuthSession, IdentityError> {
        IdentityCalls::bump(&self.calls.sign_in);
        self.sign_in.answer(|| self.session(ACCESS_TOKEN))
    }

    async fn get_user(&self, _access_token: &SecretString) -> Result<User, IdentityError> {
        IdentityCalls::bump(&self.calls.get_user);
        self.get_user.answer(test_user)
    }

    async fn refresh_session(
        &self,
        _refresh_token: &SecretString,
    ) -> Result<AuthSession, IdentityError> {
        IdentityCalls::bump(&self.calls.refresh);
        self.refresh.answer(|| self.session(REFRESHED_ACCESS_TOKEN))
    }

    async fn sign_out(&self, _access_token: &SecretString) -> Result<(), IdentityError> {
        IdentityCalls::bump(&self.calls.sign_out);
        self.sign_out.answer(|| ())
    }

    async fn health_check(&self) -> Result<(), IdentityError> {
        self.health.answer(|| ())
    }
}

// =============================================================================
// Stub Catalog
// =============================================================================

/// Catalog that always fails with a database rejection.
#[derive(Debug)]
pub struct FailingCatalog {
    pub message: String,
}

impl FailingCatalog {
    #[must_use]
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ProductCatalog for FailingCatalog {
    fn source(&self) -> CatalogSource {
        CatalogSource::Supabase
    }

    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Err(CatalogError::Rejected {
            status: 404,
            message: self.message.clone(),
        })
    }
}

// =============================================================================
// In-process Client
// =============================================================================

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body parsed as JSON.
    #[must_use]
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body is JSON")
    }

    /// Body as text.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The `Location` header of a redirect.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// One browser talking to one storefront instance.
///
/// The router is built once, so its in-memory session store lives as long as
/// this value. The session cookie is carried between requests like a browser
/// would.
pub struct TestApp {
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    /// Storefront over the given backends.
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self::from_state(AppState::with_backends(test_config(), identity, catalog))
    }

    /// Storefront over a fully built state.
    #[must_use]
    pub fn from_state(state: AppState) -> Self {
        Self {
            router: kiosk_storefront::app(state),
            cookie: None,
        }
    }

    /// Storefront over `identity` and the mock catalog.
    #[must_use]
    pub fn with_identity(identity: Arc<dyn IdentityProvider>) -> Self {
        Self::new(identity, Arc::new(MockCatalog))
    }

    /// Current session cookie, as sent in the `Cookie` header.
    #[must_use]
    pub fn cookie(&self) -> Option<&str> {
        self.cookie.as_deref()
    }

    /// Drop the session cookie, like opening a fresh browser.
    pub fn forget_cookie(&mut self) {
        self.cookie = None;
    }

    /// Send a request, attaching and then updating the session cookie.
    pub async fn send(&mut self, mut request: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            request.headers_mut().insert(
                header::COOKIE,
                cookie.parse().expect("cookie is a valid header value"),
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        self.update_cookie(response.headers());

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body is readable");

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = Request::get(uri)
            .body(Body::empty())
            .expect("request is valid");
        self.send(request).await
    }

    pub async fn post_json(&mut self, uri: &str, body: &Value) -> TestResponse {
        self.post_raw(uri, "application/json", body.to_string())
            .await
    }

    pub async fn post_form(&mut self, uri: &str, body: &str) -> TestResponse {
        self.post_raw(uri, "application/x-www-form-urlencoded", body.to_string())
            .await
    }

    pub async fn post_raw(&mut self, uri: &str, content_type: &str, body: String) -> TestResponse {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("request is valid");
        self.send(request).await
    }

    /// Sign in through the JSON endpoint with the test credentials.
    pub async fn sign_in(&mut self) -> TestResponse {
        self.post_json(
            "/auth/signin",
            &serde_json::json!({ "email": TEST_EMAIL, "password": TEST_PASSWORD }),
        )
        .await
    }

    fn update_cookie(&mut self, headers: &HeaderMap) {
        let prefix = format!("{SESSION_COOKIE_NAME}=");
        for value in headers.get_all(header::SET_COOKIE) {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let Some(pair) = value.split(';').next() else {
                continue;
            };
            if !pair.starts_with(&prefix) {
                continue;
            }

            let removed = pair.len() == prefix.len() || value.contains("Max-Age=0");
            self.cookie = if removed {
                None
            } else {
                Some(pair.to_string())
            };
        }
    }
}
