//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use crate::filters;
use crate::middleware::OptionalAuth;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    /// Whether identity tokens are stored for this visitor.
    pub signed_in: bool,
    pub email: Option<String>,
}

/// Display the home page.
pub async fn home(OptionalAuth(stored): OptionalAuth) -> impl IntoResponse {
    HomeTemplate {
        signed_in: stored.is_some(),
        email: stored.and_then(|s| s.email),
    }
}
