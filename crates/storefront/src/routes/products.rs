//! Product listing routes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Json, extract::State, response::IntoResponse};
use kiosk_core::Product;
use serde::Serialize;
use tracing::instrument;

use crate::catalog::CatalogSource;
use crate::error::Result;
use crate::filters;
use crate::state::AppState;

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsTemplate {
    pub products: Vec<Product>,
    pub source: CatalogSource,
    /// `Database error: ...` or `Connection error: ...` when the read failed.
    pub error: Option<String>,
}

/// JSON body of `GET /api/products`.
#[derive(Debug, Serialize)]
pub struct ProductsResponse {
    pub products: Vec<Product>,
    pub source: CatalogSource,
}

/// Display the product listing.
///
/// A failed read renders the page with the error text instead of products.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let catalog = state.catalog();

    let (products, error) = match catalog.list_products().await {
        Ok(products) => (products, None),
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch products");
            (Vec::new(), Some(e.display_message()))
        }
    };

    ProductsTemplate {
        products,
        source: catalog.source(),
        error,
    }
}

/// Product listing as JSON.
#[instrument(skip(state))]
pub async fn api_index(State(state): State<AppState>) -> Result<Json<ProductsResponse>> {
    let catalog = state.catalog();
    let products = catalog.list_products().await?;

    Ok(Json(ProductsResponse {
        products,
        source: catalog.source(),
    }))
}
