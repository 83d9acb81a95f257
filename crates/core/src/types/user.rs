//! Identity-service user record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A user as reported by the identity service.
///
/// The identity service owns this record; the storefront only ever holds the
/// copy returned for the current request and never persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque user ID.
    pub id: UserId,
    /// Email address. Absent for phone-only accounts.
    #[serde(default)]
    pub email: Option<String>,
    /// When the account was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the user last signed in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name to greet the user with.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.email.clone().unwrap_or_else(|| self.id.to_string())
    }
}
