//! Product catalog abstraction.
//!
//! The product listing is served by one [`ProductCatalog`], chosen at startup
//! from configuration: the Supabase table reader when a table is configured,
//! or the built-in [`MockCatalog`] when `KIOSK_MOCK_CATALOG` is set.

use async_trait::async_trait;
use kiosk_core::{Price, Product};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when reading the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The database API answered with an error status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Rows could not be decoded into products.
    #[error("Parse error: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Whether the database API deliberately refused the request.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// The database API's own message, for rejections only.
    #[must_use]
    pub fn rejection_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Message shown on the product listing page.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => format!("Database error: {message}"),
            Self::Http(e) => format!("Connection error: {e}"),
            Self::Parse(e) => format!("Connection error: {e}"),
        }
    }
}

/// Where catalog data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    Mock,
    Supabase,
}

impl CatalogSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Supabase => "supabase",
        }
    }
}

/// Read-only access to product records.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Which backend this catalog reads from.
    fn source(&self) -> CatalogSource;

    /// List every product.
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError>;
}

/// Fixed product list used when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog;

impl MockCatalog {
    /// The fixture rows served by the mock catalog.
    #[must_use]
    pub fn products() -> Vec<Product> {
        vec![
            Product::new(1, "produkti1", Price::from_units(20)),
            Product::new(2, "produkti2", Price::from_units(33)),
            Product::new(3, "produkti3", Price::from_units(4_444_444)),
        ]
    }
}

#[async_trait]
impl ProductCatalog for MockCatalog {
    fn source(&self) -> CatalogSource {
        CatalogSource::Mock
    }

    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(Self::products())
    }
}
