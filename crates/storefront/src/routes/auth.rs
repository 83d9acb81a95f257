//! Authentication route handlers.
//!
//! Credential exchange with the identity service, as a JSON API
//! (`/auth/signin`, `/auth/signout`) and as plain HTML forms (`/login`,
//! `/logout`). Both flows share the same session handling: on success the
//! session id is cycled and the identity tokens are stored server-side.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    body::Bytes,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use kiosk_core::User;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::identity::{IdentityProvider, PasswordCredentials};
use crate::middleware::{OptionalAuth, clear_auth_session, get_auth_session, set_auth_session};
use crate::state::AppState;
use crate::storage::{TabStorage, keys};

/// Message returned when either credential is missing.
pub const CREDENTIALS_REQUIRED: &str = "Email and password are required";

/// Message shown when sign-out fails without an upstream explanation.
pub const SIGN_OUT_FAILED: &str = "Sign out failed";

// =============================================================================
// Request Types
// =============================================================================

/// JSON sign-in body.
///
/// Fields are optional so that missing and `null` values reach validation
/// instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
pub struct SignInRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl SignInRequest {
    /// Credentials, if both fields are present and non-empty.
    #[must_use]
    pub fn credentials(self) -> Option<PasswordCredentials> {
        let email = self.email.filter(|e| !e.is_empty())?;
        let password = self.password.filter(|p| !p.is_empty())?;
        Some(PasswordCredentials::new(email, password))
    }
}

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Sign-in draft kept in tab storage after a failed attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignInDraft {
    pub email: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    /// Email prefilled from the sign-in draft.
    pub email: String,
    pub signed_in: bool,
}

// =============================================================================
// Shared Session Handling
// =============================================================================

/// Exchange credentials for a session and store it.
///
/// The session id is cycled before the tokens are written.
async fn sign_in(
    identity: &dyn IdentityProvider,
    session: &Session,
    credentials: &PasswordCredentials,
) -> Result<User> {
    let auth = identity.sign_in_with_password(credentials).await?;

    session.cycle_id().await?;
    set_auth_session(session, &auth).await?;
    set_sentry_user(&auth.user.id, auth.user.email.as_deref());

    tracing::info!(user_id = %auth.user.id, "User signed in");
    Ok(auth.user)
}

/// Revoke the stored session upstream, then forget it locally.
///
/// A token the identity service no longer recognises counts as signed out.
/// On any other failure the stored session is kept.
async fn sign_out(identity: &dyn IdentityProvider, session: &Session) -> Result<()> {
    if let Some(stored) = get_auth_session(session).await.map_err(sign_out_fault)? {
        match identity.sign_out(&stored.access_token()).await {
            Ok(()) => {}
            Err(e) if e.is_invalid_token() => {
                tracing::debug!(error = %e, "Token already invalid, treating as signed out");
            }
            Err(e) => {
                tracing::warn!(error = %e, user_id = %stored.user_id, "Sign out failed");
                let message = e.rejection_message().unwrap_or(SIGN_OUT_FAILED);
                return Err(AppError::BadRequest(message.to_string()));
            }
        }
        tracing::info!(user_id = %stored.user_id, "User signed out");
    }

    clear_auth_session(session).await.map_err(sign_out_fault)?;
    clear_sentry_user();
    Ok(())
}

/// Sign-out only answers 200 or 400, so an unreadable session store is
/// reported as a failed sign-out.
fn sign_out_fault(e: tower_sessions::session::Error) -> AppError {
    let event_id = sentry::capture_error(&e);
    tracing::error!(
        error = %e,
        sentry_event_id = %event_id,
        "Session store failed during sign out"
    );
    AppError::BadRequest(SIGN_OUT_FAILED.to_string())
}

fn login_redirect(error: &str) -> Response {
    Redirect::to(&format!("/login?error={}", urlencoding::encode(error))).into_response()
}

// =============================================================================
// JSON API
// =============================================================================

/// `POST /auth/signin`
///
/// Returns `{ "user": ... }` on success, `{ "error": ... }` otherwise.
#[instrument(skip_all)]
pub async fn api_signin(
    State(state): State<AppState>,
    session: Session,
    body: Bytes,
) -> Result<Json<Value>> {
    let request: SignInRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Internal(format!("unreadable sign-in body: {e}")))?;

    let credentials = request
        .credentials()
        .ok_or_else(|| AppError::BadRequest(CREDENTIALS_REQUIRED.to_string()))?;

    let user = sign_in(state.identity(), &session, &credentials).await?;
    Ok(Json(json!({ "user": user })))
}

/// `POST /auth/signout`
///
/// Returns `{ "success": true }` on success, `{ "error": ... }` otherwise.
#[instrument(skip_all)]
pub async fn api_signout(State(state): State<AppState>, session: Session) -> Result<Json<Value>> {
    sign_out(state.identity(), &session).await?;
    Ok(Json(json!({ "success": true })))
}

// =============================================================================
// HTML Forms
// =============================================================================

/// Display the login page.
pub async fn login_page(
    OptionalAuth(stored): OptionalAuth,
    TabStorage(storage): TabStorage,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    let draft: SignInDraft = storage
        .app_data()
        .get_form_data(keys::SIGNIN_FORM)
        .await
        .unwrap_or_default();

    LoginTemplate {
        error: query.error,
        email: draft.email,
        signed_in: stored.is_some(),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    TabStorage(storage): TabStorage,
    Form(form): Form<LoginForm>,
) -> Response {
    let data = storage.app_data();
    let draft = SignInDraft {
        email: form.email.clone(),
    };

    let request = SignInRequest {
        email: Some(form.email),
        password: Some(form.password),
    };
    let Some(credentials) = request.credentials() else {
        data.save_form_data(keys::SIGNIN_FORM, &draft).await;
        return login_redirect(CREDENTIALS_REQUIRED);
    };

    match sign_in(state.identity(), &session, &credentials).await {
        Ok(_) => {
            data.clear_form_data(keys::SIGNIN_FORM).await;
            Redirect::to("/dashboard").into_response()
        }
        Err(e) => {
            data.save_form_data(keys::SIGNIN_FORM, &draft).await;
            if e.is_internal() {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Login failed");
            }
            login_redirect(&e.client_message())
        }
    }
}

/// Handle logout form submission.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    match sign_out(state.identity(), &session).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(e) => {
            if e.is_internal() {
                let event_id = sentry::capture_error(&e);
                tracing::error!(error = %e, sentry_event_id = %event_id, "Logout failed");
            }
            Redirect::to(&format!(
                "/dashboard?error={}",
                urlencoding::encode(&e.client_message())
            ))
            .into_response()
        }
    }
}
