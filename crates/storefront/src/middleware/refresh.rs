//! Session refresh middleware.
//!
//! Keeps the stored identity tokens fresh: when the access token is about to
//! expire, the refresh token is traded for a new session before the request
//! reaches its handler. Any failure here is logged and the request continues
//! unchanged.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, TimeDelta, Utc};
use tower_sessions::Session;

use super::auth::{clear_auth_session, get_auth_session, set_auth_session};
use crate::error::AppError;
use crate::identity::IdentityProvider;
use crate::state::AppState;

/// Tokens expiring within this many seconds are refreshed.
pub const REFRESH_WINDOW_SECS: i64 = 60;

/// Path suffixes of static assets that never need a session.
const STATIC_EXTENSIONS: [&str; 6] = [".svg", ".png", ".jpg", ".jpeg", ".gif", ".webp"];

/// What the refresh check did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// No tokens stored.
    Anonymous,
    /// The access token is still good.
    Fresh,
    /// New tokens were stored.
    Refreshed,
    /// The identity service refused the refresh token; the tokens were removed.
    Dropped,
}

/// Whether `path` is a static asset that skips the refresh check.
#[must_use]
pub fn is_static_path(path: &str) -> bool {
    path.starts_with("/static/")
        || path == "/favicon.ico"
        || STATIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

/// Refresh the stored tokens if they expire within [`REFRESH_WINDOW_SECS`] of `now`.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written, or the identity
/// service cannot be reached. The stored tokens are left as they were.
pub async fn refresh_if_expiring(
    identity: &dyn IdentityProvider,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<RefreshOutcome, AppError> {
    let Some(stored) = get_auth_session(session).await? else {
        return Ok(RefreshOutcome::Anonymous);
    };

    if !stored.expires_within(now, TimeDelta::seconds(REFRESH_WINDOW_SECS)) {
        return Ok(RefreshOutcome::Fresh);
    }

    match identity.refresh_session(&stored.refresh_token()).await {
        Ok(refreshed) => {
            set_auth_session(session, &refreshed).await?;
            tracing::debug!(user_id = %refreshed.user.id, "Refreshed auth session");
            Ok(RefreshOutcome::Refreshed)
        }
        Err(e) if e.is_rejection() => {
            tracing::info!(
                user_id = %stored.user_id,
                error = %e,
                "Refresh rejected, dropping session"
            );
            clear_auth_session(session).await?;
            Ok(RefreshOutcome::Dropped)
        }
        Err(e) => Err(e.into()),
    }
}

/// Middleware that refreshes expiring identity tokens.
///
/// Skips static assets. Never blocks a request: failures are logged and the
/// request is passed through.
pub async fn session_refresh_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if is_static_path(request.uri().path()) {
        return next.run(request).await;
    }

    if let Some(session) = request.extensions().get::<Session>().cloned()
        && let Err(e) = refresh_if_expiring(state.identity(), &session, Utc::now()).await
    {
        tracing::warn!(error = %e, "Session refresh failed, continuing without refresh");
    }

    next.run(request).await
}
