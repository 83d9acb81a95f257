//! Session-related types.
//!
//! Types stored in the session for authentication state.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use kiosk_core::UserId;

use crate::identity::AuthSession;

/// Session-stored identity tokens.
///
/// Only the tokens and enough of the user to label logs are kept; the full
/// user record is fetched from the identity service on each protected request.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredSession {
    access_token: String,
    refresh_token: String,
    /// When the access token stops being accepted.
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
    pub email: Option<String>,
}

impl StoredSession {
    #[must_use]
    pub fn access_token(&self) -> SecretString {
        SecretString::from(self.access_token.clone())
    }

    #[must_use]
    pub fn refresh_token(&self) -> SecretString {
        SecretString::from(self.refresh_token.clone())
    }

    /// Whether the access token expires before `now + window`.
    #[must_use]
    pub fn expires_within(&self, now: DateTime<Utc>, window: TimeDelta) -> bool {
        self.expires_at <= now + window
    }
}

impl From<&AuthSession> for StoredSession {
    fn from(session: &AuthSession) -> Self {
        use secrecy::ExposeSecret;

        Self {
            access_token: session.access_token.expose_secret().to_string(),
            refresh_token: session.refresh_token.expose_secret().to_string(),
            expires_at: session.expires_at,
            user_id: session.user.id,
            email: session.user.email.clone(),
        }
    }
}

impl fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Session keys.
pub mod keys {
    /// Key for the signed-in user's [`super::StoredSession`].
    pub const AUTH_SESSION: &str = "auth_session";

    /// Key for the visitor's ephemeral key/value map.
    pub const TAB_STORAGE: &str = "tab_storage";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use kiosk_core::User;
    use secrecy::ExposeSecret;

    use super::*;

    fn auth_session(expires_at: DateTime<Utc>) -> AuthSession {
        AuthSession {
            access_token: SecretString::from("access-1"),
            refresh_token: SecretString::from("refresh-1"),
            expires_at,
            user: User {
                id: "8d0fd2b3-9ca7-4d9e-a95f-9e13dc3a3f8a".parse().unwrap(),
                email: Some("ana@example.com".to_string()),
                created_at: None,
                last_sign_in_at: None,
            },
        }
    }

    #[test]
    fn test_from_auth_session() {
        let stored = StoredSession::from(&auth_session(Utc::now()));
        assert_eq!(stored.access_token().expose_secret(), "access-1");
        assert_eq!(stored.refresh_token().expose_secret(), "refresh-1");
        assert_eq!(stored.email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_expires_within() {
        let now = Utc::now();
        let stored = StoredSession::from(&auth_session(now + TimeDelta::seconds(30)));
        assert!(stored.expires_within(now, TimeDelta::seconds(60)));
        assert!(!stored.expires_within(now, TimeDelta::seconds(10)));
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let stored = StoredSession::from(&auth_session(Utc::now()));
        let debug_output = format!("{stored:?}");
        assert!(!debug_output.contains("access-1"));
        assert!(!debug_output.contains("refresh-1"));
    }

    #[test]
    fn test_serde_round_trip_keeps_tokens() {
        let stored = StoredSession::from(&auth_session(Utc::now()));
        let json = serde_json::to_string(&stored).unwrap();
        let back: StoredSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back.access_token().expose_secret(), "access-1");
    }
}
