//! Supabase REST (PostgREST) product reader.
//!
//! Reads the whole products table with the anon role. The listing is cached
//! for 30 seconds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kiosk_core::Product;
use moka::future::Cache;
use tracing::{debug, instrument};

use super::{SupabaseHttp, body_excerpt, error_message};
use crate::catalog::{CatalogError, CatalogSource, ProductCatalog};
use crate::config::SupabaseConfig;

// =============================================================================
// SupabaseCatalog
// =============================================================================

/// Product catalog backed by a Supabase table.
#[derive(Clone)]
pub struct SupabaseCatalog {
    inner: Arc<SupabaseCatalogInner>,
}

struct SupabaseCatalogInner {
    http: SupabaseHttp,
    table: String,
    cache: Cache<String, Arc<Vec<Product>>>,
}

impl SupabaseCatalog {
    /// Create a catalog reader for `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(
        config: &SupabaseConfig,
        table: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CatalogError> {
        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(Duration::from_secs(30))
            .build();

        Ok(Self {
            inner: Arc::new(SupabaseCatalogInner {
                http: SupabaseHttp::new(config, timeout)?,
                table: table.into(),
                cache,
            }),
        })
    }

    async fn fetch(&self) -> Result<Vec<Product>, CatalogError> {
        let http = &self.inner.http;
        let request = http
            .with_anon_token(http.get(&format!("rest/v1/{}", self.inner.table)))
            .query(&[("select", "*")]);

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = error_message(status, &body);
            tracing::warn!(
                status = %status,
                table = %self.inner.table,
                message = %message,
                "Supabase REST returned non-success status"
            );
            return Err(CatalogError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body_excerpt(&body),
                "Failed to parse product rows"
            );
            CatalogError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl ProductCatalog for SupabaseCatalog {
    fn source(&self) -> CatalogSource {
        CatalogSource::Supabase
    }

    #[instrument(skip(self), fields(table = %self.inner.table))]
    async fn list_products(&self) -> Result<Vec<Product>, CatalogError> {
        if let Some(products) = self.inner.cache.get(&self.inner.table).await {
            debug!("Cache hit for product listing");
            return Ok(products.as_ref().clone());
        }

        let products = self.fetch().await?;
        debug!(count = products.len(), "Fetched product listing");

        self.inner
            .cache
            .insert(self.inner.table.clone(), Arc::new(products.clone()))
            .await;

        Ok(products)
    }
}
