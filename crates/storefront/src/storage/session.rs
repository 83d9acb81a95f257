//! Session-backed storage and its request extractor.

use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use super::{ClientStorage, StorageBackend, StorageError, TracingSink};
use crate::models::session_keys;

type TabMap = HashMap<String, String>;

/// [`StorageBackend`] over the `tab_storage` map of a visitor's session.
///
/// The map lives beside the authentication entry, so clearing it never signs
/// the visitor out. It lasts as long as the session cookie, which expires when
/// the browser session ends.
#[derive(Debug, Clone)]
pub struct SessionBackend {
    session: Session,
}

impl SessionBackend {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    async fn load(&self) -> Result<TabMap, StorageError> {
        Ok(self
            .session
            .get::<TabMap>(session_keys::TAB_STORAGE)
            .await?
            .unwrap_or_default())
    }

    async fn save(&self, map: &TabMap) -> Result<(), StorageError> {
        self.session.insert(session_keys::TAB_STORAGE, map).await?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for SessionBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut map = self.load().await?;
        map.insert(key.to_string(), value);
        self.save(&map).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut map = self.load().await?;
        if map.remove(key).is_some() {
            self.save(&map).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.session.remove::<TabMap>(session_keys::TAB_STORAGE).await?;
        Ok(())
    }
}

/// Extractor for the current visitor's storage.
///
/// Yields an unavailable store when no session layer is installed.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(TabStorage(storage): TabStorage) -> impl IntoResponse {
///     let theme = storage.app_data().get_theme().await;
///     // ...
/// }
/// ```
pub struct TabStorage(pub ClientStorage<SessionBackend>);

impl<S> FromRequestParts<S> for TabStorage
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let sink = Arc::new(TracingSink);
        let storage = match parts.extensions.get::<Session>() {
            Some(session) => ClientStorage::new(SessionBackend::new(session.clone()), sink),
            None => ClientStorage::unavailable(sink),
        };
        Ok(Self(storage))
    }
}
