//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SUPABASE_URL` - Supabase project URL (e.g., <https://abc.supabase.co>)
//! - `SUPABASE_ANON_KEY` - Supabase public (anon) API key
//!
//! Both also accept the `NEXT_PUBLIC_` prefixed names used by older deployments.
//!
//! ## Optional
//! - `KIOSK_HOST` - Bind address (default: 127.0.0.1)
//! - `KIOSK_PORT` - Listen port (default: 3000)
//! - `KIOSK_BASE_URL` - Public URL (default: `http://{host}:{port}`)
//! - `KIOSK_PRODUCTS_TABLE` - Catalog table name (default: products)
//! - `KIOSK_MOCK_CATALOG` - When set, serve the built-in mock catalog
//! - `KIOSK_HTTP_TIMEOUT_SECS` - Outbound request timeout (default: 10)
//! - `KIOSK_SESSION_CAPACITY` - Most server-side sessions held at once (default: 10000)
//! - `KIOSK_SESSION_IDLE_MINUTES` - Drop sessions unused for this long (default: 120)
//! - `KIOSK_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::fmt::Display;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PRODUCTS_TABLE: &str = "products";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SESSION_CAPACITY: u64 = 10_000;
const DEFAULT_SESSION_IDLE_MINUTES: u64 = 120;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Missing environment variable: {0}. Set it in your .env file or the deployment environment."
    )]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Supabase project configuration
    pub supabase: SupabaseConfig,
    /// Product catalog configuration
    pub catalog: CatalogConfig,
    /// Timeout for outbound HTTP requests
    pub http_timeout: Duration,
    /// Upper bound on stored sessions
    pub session_capacity: u64,
    /// Sessions untouched for this long are evicted
    pub session_idle_timeout: Duration,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Supabase project configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, without a trailing slash
    pub url: Url,
    /// Public (anon) API key
    pub anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

/// Which backend serves the product listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogConfig {
    /// Built-in fixture data.
    Mock,
    /// Rows from a Supabase table.
    Supabase { table: String },
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration using a custom variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);

        let host = env
            .or_default("KIOSK_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("KIOSK_HOST".to_string(), e.to_string()))?;
        let port = env
            .or_default("KIOSK_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("KIOSK_PORT".to_string(), e.to_string()))?;
        let base_url = env
            .optional("KIOSK_BASE_URL")
            .unwrap_or_else(|| format!("http://{host}:{port}"));

        let supabase = SupabaseConfig::from_env(&env)?;
        let catalog = CatalogConfig::from_env(&env);

        let timeout_secs = env.parsed("KIOSK_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)?;
        let session_capacity = env.parsed("KIOSK_SESSION_CAPACITY", DEFAULT_SESSION_CAPACITY)?;
        let idle_minutes =
            env.parsed("KIOSK_SESSION_IDLE_MINUTES", DEFAULT_SESSION_IDLE_MINUTES)?;
        if session_capacity == 0 || idle_minutes == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "KIOSK_SESSION_CAPACITY/KIOSK_SESSION_IDLE_MINUTES".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let log_format = match env.optional("KIOSK_LOG_FORMAT").as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "KIOSK_LOG_FORMAT".to_string(),
                    format!("expected 'pretty' or 'json', got '{other}'"),
                ));
            }
        };

        Ok(Self {
            host,
            port,
            base_url,
            supabase,
            catalog,
            http_timeout: Duration::from_secs(timeout_secs),
            session_capacity,
            session_idle_timeout: Duration::from_secs(idle_minutes.saturating_mul(60)),
            log_format,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the storefront is served over HTTPS.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl SupabaseConfig {
    fn from_env(env: &Env<'_, impl Fn(&str) -> Option<String>>) -> Result<Self, ConfigError> {
        let raw_url = env.required_with_fallback("SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL")?;
        let anon_key =
            env.required_with_fallback("SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY")?;

        Ok(Self {
            url: parse_service_url(&raw_url)?,
            anon_key: SecretString::from(anon_key),
        })
    }
}

impl CatalogConfig {
    fn from_env(env: &Env<'_, impl Fn(&str) -> Option<String>>) -> Self {
        if env.optional("KIOSK_MOCK_CATALOG").is_some() {
            return Self::Mock;
        }
        Self::Supabase {
            table: env.or_default("KIOSK_PRODUCTS_TABLE", DEFAULT_PRODUCTS_TABLE),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the usual required/optional/default helpers.
///
/// Empty values are treated as unset.
struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.optional(key).map_or(Ok(default), |v| {
            v.trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
        })
    }

    fn required_with_fallback(&self, primary: &str, fallback: &str) -> Result<String, ConfigError> {
        self.optional(primary)
            .or_else(|| self.optional(fallback))
            .ok_or_else(|| ConfigError::MissingEnvVar(primary.to_string()))
    }
}

/// Parse the Supabase project URL, requiring an absolute http(s) URL.
fn parse_service_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim_end_matches('/'))
        .map_err(|e| ConfigError::InvalidEnvVar("SUPABASE_URL".to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigError::InvalidEnvVar(
            "SUPABASE_URL".to_string(),
            "must be an absolute http(s) URL".to_string(),
        ));
    }

    Ok(url)
}
