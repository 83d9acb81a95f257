//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers
//! 5. Session layer (tower-sessions over a bounded moka store)
//! 6. Session refresh (renew expiring identity tokens)

pub mod auth;
pub mod refresh;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, OptionalAuth, RequireAuth, clear_auth_session, get_auth_session, require_auth,
    set_auth_session,
};
pub use refresh::{RefreshOutcome, refresh_if_expiring, session_refresh_middleware};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{MokaSessionStore, create_session_layer};
