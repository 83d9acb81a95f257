//! Identity service abstraction.
//!
//! The storefront never verifies credentials itself. Every sign-in, session
//! refresh, user lookup and sign-out is forwarded to an [`IdentityProvider`].
//! Production uses [`crate::supabase::SupabaseAuth`]; tests substitute stubs.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiosk_core::User;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur when talking to the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The identity service answered with an error status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The identity service answered with something we could not read.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl IdentityError {
    /// Build a rejection error.
    #[must_use]
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Whether the identity service deliberately refused the request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The identity service's own message, for rejections only.
    #[must_use]
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Whether the rejection means the presented token is no longer valid.
    #[must_use]
    pub const fn is_invalid_token(&self) -> bool {
        matches!(
            self,
            Self::Rejected {
                status: 401 | 403 | 404,
                ..
            }
        )
    }
}

/// Email/password pair submitted for sign-in.
pub struct PasswordCredentials {
    pub email: String,
    pub password: SecretString,
}

impl PasswordCredentials {
    /// Create credentials from raw form or JSON input.
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// A session issued by the identity service.
#[derive(Clone)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user.id)
            .finish()
    }
}

/// Operations the storefront needs from an identity service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange an email and password for a session.
    async fn sign_in_with_password(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthSession, IdentityError>;

    /// Resolve the user that owns an access token.
    async fn get_user(&self, access_token: &SecretString) -> Result<User, IdentityError>;

    /// Trade a refresh token for a new session.
    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, IdentityError>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), IdentityError>;

    /// Check that the identity service is reachable.
    async fn health_check(&self) -> Result<(), IdentityError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_accessors() {
        let err = IdentityError::rejected(400, "Invalid login credentials");
        assert!(err.is_rejection());
        assert_eq!(err.rejection_message(), Some("Invalid login credentials"));
        assert!(!err.is_invalid_token());

        let err = IdentityError::Parse("eof".to_string());
        assert!(!err.is_rejection());
        assert_eq!(err.rejection_message(), None);
    }

    #[test]
    fn test_invalid_token_statuses() {
        for status in [401, 403, 404] {
            assert!(IdentityError::rejected(status, "gone").is_invalid_token());
        }
        assert!(!IdentityError::rejected(500, "oops").is_invalid_token());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = PasswordCredentials::new("ana@example.com", "hunter2");
        let debug_output = format!("{creds:?}");
        assert!(debug_output.contains("ana@example.com"));
        assert!(!debug_output.contains("hunter2"));
    }
}
