//! Supabase Auth (GoTrue) and REST (PostgREST) clients.
//!
//! # Architecture
//!
//! - Plain `reqwest` calls against the project's HTTP API
//! - Supabase is the source of truth - no local user or product tables
//! - Catalog reads are cached in memory via `moka` (30 second TTL)
//!
//! # APIs
//!
//! ## Auth (`/auth/v1`)
//! - Password sign-in and refresh via `/token`
//! - User lookup via `/user`, revocation via `/logout`
//!
//! ## REST (`/rest/v1`)
//! - Read-only `select=*` on the configured products table
//!
//! # Example
//!
//! ```rust,ignore
//! use kiosk_storefront::supabase::{SupabaseAuth, SupabaseCatalog};
//!
//! let auth = SupabaseAuth::new(&config.supabase, config.http_timeout)?;
//! let session = auth.sign_in_with_password(&credentials).await?;
//!
//! let catalog = SupabaseCatalog::new(&config.supabase, "products", config.http_timeout)?;
//! let products = catalog.list_products().await?;
//! ```

mod auth;
mod rest;

pub use auth::SupabaseAuth;
pub use rest::SupabaseCatalog;

use std::time::Duration;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::config::SupabaseConfig;

/// HTTP plumbing shared by the auth and REST clients.
#[derive(Clone)]
pub(crate) struct SupabaseHttp {
    client: reqwest::Client,
    base_url: String,
    anon_key: SecretString,
}

impl SupabaseHttp {
    /// Build an HTTP client for the configured project.
    pub(crate) fn new(config: &SupabaseConfig, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.url.as_str().trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
        })
    }

    /// Absolute URL for a path below the project URL.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn get(&self, path: &str) -> RequestBuilder {
        self.with_api_key(self.client.get(self.endpoint(path)))
    }

    pub(crate) fn post(&self, path: &str) -> RequestBuilder {
        self.with_api_key(self.client.post(self.endpoint(path)))
    }

    /// Attach a user's access token as the bearer credential.
    pub(crate) fn with_user_token(request: RequestBuilder, token: &SecretString) -> RequestBuilder {
        request.bearer_auth(token.expose_secret())
    }

    /// Use the anon key as the bearer credential.
    ///
    /// This is what grants the `anon` role on REST requests made without a
    /// signed-in user.
    pub(crate) fn with_anon_token(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.anon_key.expose_secret())
    }

    /// Attach the project API key.
    fn with_api_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", self.anon_key.expose_secret())
    }
}

/// Error body shapes returned by the Supabase APIs.
///
/// GoTrue has used `msg`, `error_description` and `message` across versions;
/// PostgREST uses `message`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<serde_json::Value>,
}

/// Pull the human-readable message out of an error response body.
///
/// Falls back to the HTTP status text when the body has no usable message.
pub(crate) fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    parsed
        .msg
        .or(parsed.error_description)
        .or(parsed.message)
        .or_else(|| match parsed.error {
            Some(serde_json::Value::String(s)) => Some(s),
            _ => None,
        })
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

/// Truncate a response body for logging.
pub(crate) fn body_excerpt(body: &str) -> String {
    body.chars().take(500).collect()
}
