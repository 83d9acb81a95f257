//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in user in route handlers. The
//! session only holds tokens; the user is resolved from the identity service
//! on every protected request, so a revoked token is noticed immediately.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use kiosk_core::User;
use serde_json::json;
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::identity::{AuthSession, IdentityProvider};
use crate::models::{StoredSession, session_keys};
use crate::state::AppState;

/// Path unauthenticated page requests are sent to.
pub const LOGIN_PATH: &str = "/login";

/// Extractor that requires a signed-in user.
///
/// Page requests without a valid session are redirected to the login page;
/// requests under `/api/` get a 401 instead. The handler body never runs for
/// a rejected request.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.display_name())
/// }
/// ```
pub struct RequireAuth(pub User);

/// Error returned when authentication is required but the user is not signed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl AuthRejection {
    /// The rejection suited to a request for `path`.
    #[must_use]
    pub fn for_path(path: &str) -> Self {
        if path.starts_with("/api/") {
            Self::Unauthorized
        } else {
            Self::RedirectToLogin
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to(LOGIN_PATH).into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Authentication required" })),
            )
                .into_response(),
        }
    }
}

/// Resolve the signed-in user for a session.
///
/// Fails when no tokens are stored, the session cannot be read, or the
/// identity service does not accept the stored access token. There is no
/// retry.
///
/// # Errors
///
/// Returns [`AuthRejection::Unauthorized`]; callers pick the response shape
/// with [`AuthRejection::for_path`].
pub async fn require_auth(
    identity: &dyn IdentityProvider,
    session: &Session,
) -> Result<User, AuthRejection> {
    let stored = get_auth_session(session)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Failed to read auth session");
            AuthRejection::Unauthorized
        })?
        .ok_or(AuthRejection::Unauthorized)?;

    let user = identity
        .get_user(&stored.access_token())
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, user_id = %stored.user_id, "Stored session not accepted");
            AuthRejection::Unauthorized
        })?;

    set_sentry_user(&user.id, user.email.as_deref());
    Ok(user)
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let rejection = AuthRejection::for_path(parts.uri.path());

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts.extensions.get::<Session>().ok_or(rejection)?;

        require_auth(state.identity(), session)
            .await
            .map(Self)
            .map_err(|_| rejection)
    }
}

/// Extractor that optionally gets the stored session.
///
/// Unlike `RequireAuth`, this neither rejects nor calls the identity service;
/// it only reports whether tokens are present, for navigation state.
pub struct OptionalAuth(pub Option<StoredSession>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let stored = match parts.extensions.get::<Session>() {
            Some(session) => get_auth_session(session).await.ok().flatten(),
            None => None,
        };

        Ok(Self(stored))
    }
}

/// Read the stored identity tokens.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn get_auth_session(
    session: &Session,
) -> Result<Option<StoredSession>, tower_sessions::session::Error> {
    session.get(session_keys::AUTH_SESSION).await
}

/// Store identity tokens in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_session(
    session: &Session,
    auth: &AuthSession,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(session_keys::AUTH_SESSION, StoredSession::from(auth))
        .await
}

/// Remove the identity tokens from the session (logout).
///
/// Other session entries, including the visitor's storage map, are kept.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<StoredSession>(session_keys::AUTH_SESSION)
        .await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{TimeDelta, Utc};
    use secrecy::{ExposeSecret, SecretString};
    use tower_sessions::MemoryStore;

    use super::*;
    use crate::identity::{IdentityError, PasswordCredentials};

    /// Identity service that accepts exactly one access token.
    struct OneToken {
        calls: AtomicUsize,
    }

    fn user() -> User {
        User {
            id: "8d0fd2b3-9ca7-4d9e-a95f-9e13dc3a3f8a".parse().unwrap(),
            email: Some("ana@example.com".to_string()),
            created_at: None,
            last_sign_in_at: None,
        }
    }

    #[async_trait]
    impl IdentityProvider for OneToken {
        async fn sign_in_with_password(
            &self,
            _credentials: &PasswordCredentials,
        ) -> Result<AuthSession, IdentityError> {
            unreachable!()
        }

        async fn get_user(&self, access_token: &SecretString) -> Result<User, IdentityError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if access_token.expose_secret() == "good" {
                Ok(user())
            } else {
                Err(IdentityError::rejected(401, "invalid JWT"))
            }
        }

        async fn refresh_session(
            &self,
            _refresh_token: &SecretString,
        ) -> Result<AuthSession, IdentityError> {
            unreachable!()
        }

        async fn sign_out(&self, _access_token: &SecretString) -> Result<(), IdentityError> {
            unreachable!()
        }

        async fn health_check(&self) -> Result<(), IdentityError> {
            Ok(())
        }
    }

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn auth_session(token: &str) -> AuthSession {
        AuthSession {
            access_token: SecretString::from(token.to_string()),
            refresh_token: SecretString::from("refresh"),
            expires_at: Utc::now() + TimeDelta::hours(1),
            user: user(),
        }
    }

    #[test]
    fn test_rejection_for_path() {
        assert_eq!(
            AuthRejection::for_path("/dashboard"),
            AuthRejection::RedirectToLogin
        );
        assert_eq!(
            AuthRejection::for_path("/api/products"),
            AuthRejection::Unauthorized
        );
    }

    #[test]
    fn test_rejection_responses() {
        let response = AuthRejection::RedirectToLogin.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], LOGIN_PATH);

        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_require_auth_without_session_skips_identity() {
        let identity = OneToken {
            calls: AtomicUsize::new(0),
        };
        let result = require_auth(&identity, &session()).await;
        assert_eq!(result.unwrap_err(), AuthRejection::Unauthorized);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_require_auth_resolves_user() {
        let identity = OneToken {
            calls: AtomicUsize::new(0),
        };
        let session = session();
        set_auth_session(&session, &auth_session("good")).await.unwrap();

        let user = require_auth(&identity, &session).await.unwrap();
        assert_eq!(user.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn test_require_auth_rejects_revoked_token() {
        let identity = OneToken {
            calls: AtomicUsize::new(0),
        };
        let session = session();
        set_auth_session(&session, &auth_session("revoked")).await.unwrap();

        let result = require_auth(&identity, &session).await;
        assert_eq!(result.unwrap_err(), AuthRejection::Unauthorized);
        assert_eq!(identity.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clear_auth_session() {
        let session = session();
        set_auth_session(&session, &auth_session("good")).await.unwrap();
        clear_auth_session(&session).await.unwrap();
        assert!(get_auth_session(&session).await.unwrap().is_none());
    }
}
