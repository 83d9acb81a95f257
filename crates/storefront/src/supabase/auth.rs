//! Supabase Auth (GoTrue) client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use kiosk_core::User;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};

use super::{SupabaseHttp, body_excerpt, error_message};
use crate::config::SupabaseConfig;
use crate::identity::{AuthSession, IdentityError, IdentityProvider, PasswordCredentials};

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    /// Lifetime in seconds.
    expires_in: i64,
    /// Absolute expiry as a Unix timestamp; newer servers always send it.
    expires_at: Option<i64>,
    user: User,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Result<AuthSession, IdentityError> {
        let expires_at = match self.expires_at.and_then(|ts| DateTime::from_timestamp(ts, 0)) {
            Some(at) => at,
            None => TimeDelta::try_seconds(self.expires_in)
                .and_then(|lifetime| now.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    IdentityError::Parse(format!("expires_in out of range: {}", self.expires_in))
                })?,
        };

        Ok(AuthSession {
            access_token: SecretString::from(self.access_token),
            refresh_token: SecretString::from(self.refresh_token),
            expires_at,
            user: self.user,
        })
    }
}

/// Client for the Supabase Auth API.
#[derive(Clone)]
pub struct SupabaseAuth {
    http: SupabaseHttp,
}

impl SupabaseAuth {
    /// Create a new Auth API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self, IdentityError> {
        Ok(Self {
            http: SupabaseHttp::new(config, timeout)?,
        })
    }

    /// Send a request and decode a JSON success body.
    async fn send_json<T: DeserializeOwned>(
        request: reqwest::RequestBuilder,
    ) -> Result<T, IdentityError> {
        let body = Self::send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body_excerpt(&body),
                "Failed to parse Supabase Auth response"
            );
            IdentityError::Parse(e.to_string())
        })
    }

    /// Send a request, returning the body text of a success response.
    async fn send(request: reqwest::RequestBuilder) -> Result<String, IdentityError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &body);
            debug!(status = %status, message = %message, "Supabase Auth rejected request");
            return Err(IdentityError::rejected(status.as_u16(), message));
        }

        Ok(body)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn sign_in_with_password(
        &self,
        credentials: &PasswordCredentials,
    ) -> Result<AuthSession, IdentityError> {
        let request = self
            .http
            .post("auth/v1/token")
            .query(&[("grant_type", "password")])
            .json(&json!({
                "email": credentials.email,
                "password": credentials.password.expose_secret(),
            }));

        let token: TokenResponse = Self::send_json(request).await?;
        token.into_session(Utc::now())
    }

    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &SecretString) -> Result<User, IdentityError> {
        let request = SupabaseHttp::with_user_token(self.http.get("auth/v1/user"), access_token);
        Self::send_json(request).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(
        &self,
        refresh_token: &SecretString,
    ) -> Result<AuthSession, IdentityError> {
        let request = self
            .http
            .post("auth/v1/token")
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }));

        let token: TokenResponse = Self::send_json(request).await?;
        token.into_session(Utc::now())
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &SecretString) -> Result<(), IdentityError> {
        let request = SupabaseHttp::with_user_token(self.http.post("auth/v1/logout"), access_token);
        Self::send(request).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn health_check(&self) -> Result<(), IdentityError> {
        Self::send(self.http.get("auth/v1/health")).await.map(|_| ())
    }
}
