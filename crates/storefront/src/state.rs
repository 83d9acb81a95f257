//! Application state shared across handlers.

use std::sync::Arc;

use crate::catalog::{CatalogError, MockCatalog, ProductCatalog};
use crate::config::{AppConfig, CatalogConfig};
use crate::identity::{IdentityError, IdentityProvider};
use crate::middleware::MokaSessionStore;
use crate::supabase::{SupabaseAuth, SupabaseCatalog};

/// Error building the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("identity client: {0}")]
    Identity(#[from] IdentityError),
    #[error("catalog client: {0}")]
    Catalog(#[from] CatalogError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the session store and the remote service clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    sessions: MokaSessionStore,
    identity: Arc<dyn IdentityProvider>,
    catalog: Arc<dyn ProductCatalog>,
}

impl AppState {
    /// Create the application state with the Supabase clients.
    ///
    /// The catalog is the Supabase table reader unless configuration asks for
    /// the mock catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if an HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, StateError> {
        let identity = Arc::new(SupabaseAuth::new(&config.supabase, config.http_timeout)?);

        let catalog: Arc<dyn ProductCatalog> = match &config.catalog {
            CatalogConfig::Mock => Arc::new(MockCatalog),
            CatalogConfig::Supabase { table } => Arc::new(SupabaseCatalog::new(
                &config.supabase,
                table.as_str(),
                config.http_timeout,
            )?),
        };

        Ok(Self::with_backends(config, identity, catalog))
    }

    /// Create the application state with explicit service implementations.
    #[must_use]
    pub fn with_backends(
        config: AppConfig,
        identity: Arc<dyn IdentityProvider>,
        catalog: Arc<dyn ProductCatalog>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                sessions: MokaSessionStore::from_config(&config),
                config,
                identity,
                catalog,
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get the server-side session store.
    #[must_use]
    pub fn sessions(&self) -> &MokaSessionStore {
        &self.inner.sessions
    }

    /// Get the identity service client.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    /// Get the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn ProductCatalog {
        self.inner.catalog.as_ref()
    }
}
