//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page
//! GET  /health                 - Liveness check
//! GET  /health/ready           - Identity service readiness check
//!
//! # Auth
//! GET  /login                  - Login page
//! POST /login                  - Login form action
//! POST /logout                 - Logout form action
//! POST /auth/signin            - JSON sign-in
//! POST /auth/signout           - JSON sign-out
//!
//! # Dashboard (requires auth)
//! GET  /dashboard              - Dashboard
//! POST /dashboard/preferences  - Save preferences
//! POST /dashboard/clear        - Clear stored session data
//!
//! # Products
//! GET  /products               - Product listing
//! GET  /api/products           - Product listing (JSON)
//! ```

pub mod auth;
pub mod dashboard;
pub mod health;
pub mod home;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the JSON credential exchange routes.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signin", post(auth::api_signin))
        .route("/signout", post(auth::api_signout))
}

/// Create the dashboard routes.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::show))
        .route("/preferences", post(dashboard::update_preferences))
        .route("/clear", post(dashboard::clear))
}

/// Create the JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/products", get(products::api_index))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/products", get(products::index))
        .nest("/auth", auth_routes())
        .nest("/dashboard", dashboard_routes())
        .nest("/api", api_routes())
}
