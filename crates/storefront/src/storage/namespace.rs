//! Application key namespace over [`ClientStorage`].

use chrono::{DateTime, Utc};
use kiosk_core::{Theme, UserPreferences};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{ClientStorage, StorageBackend};

/// Storage keys and key prefixes used by the application.
pub mod keys {
    /// Prefix for user preference entries.
    pub const PREFERENCE_PREFIX: &str = "pref_";

    /// Prefix for saved form drafts.
    pub const FORM_PREFIX: &str = "form_";

    pub const CART: &str = "cart";

    pub const THEME: &str = "user-theme";

    pub const LANGUAGE: &str = "user-language";

    /// Timestamp of the previous dashboard visit.
    pub const LAST_VISIT: &str = "last-visit";

    /// Preference key (before prefixing) holding [`kiosk_core::UserPreferences`].
    pub const USER_SETTINGS: &str = "user-settings";

    /// Form id of the sign-in draft.
    pub const SIGNIN_FORM: &str = "signin";
}

/// Named accessors for the application's storage entries.
///
/// Values are stored as given; the namespace does not check their shape.
pub struct AppData<'a, B> {
    storage: &'a ClientStorage<B>,
}

impl<'a, B: StorageBackend> AppData<'a, B> {
    #[must_use]
    pub const fn new(storage: &'a ClientStorage<B>) -> Self {
        Self { storage }
    }

    pub async fn set_user_preference<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        self.storage
            .set_item(&format!("{}{key}", keys::PREFERENCE_PREFIX), value)
            .await;
    }

    pub async fn get_user_preference<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.storage
            .get_item(&format!("{}{key}", keys::PREFERENCE_PREFIX))
            .await
    }

    pub async fn save_form_data<T: Serialize + ?Sized>(&self, form_id: &str, value: &T) {
        self.storage
            .set_item(&format!("{}{form_id}", keys::FORM_PREFIX), value)
            .await;
    }

    pub async fn get_form_data<T: DeserializeOwned>(&self, form_id: &str) -> Option<T> {
        self.storage
            .get_item(&format!("{}{form_id}", keys::FORM_PREFIX))
            .await
    }

    pub async fn clear_form_data(&self, form_id: &str) {
        self.storage
            .remove_item(&format!("{}{form_id}", keys::FORM_PREFIX))
            .await;
    }

    pub async fn save_cart<T: Serialize + ?Sized>(&self, cart: &T) {
        self.storage.set_item(keys::CART, cart).await;
    }

    pub async fn get_cart<T: DeserializeOwned>(&self) -> Option<T> {
        self.storage.get_item(keys::CART).await
    }

    pub async fn set_theme(&self, theme: Theme) {
        self.storage.set_item(keys::THEME, &theme).await;
    }

    pub async fn get_theme(&self) -> Option<Theme> {
        self.storage.get_item(keys::THEME).await
    }

    pub async fn set_language(&self, language: &str) {
        self.storage.set_item(keys::LANGUAGE, language).await;
    }

    pub async fn get_language(&self) -> Option<String> {
        self.storage.get_item(keys::LANGUAGE).await
    }

    /// Record a visit at `now`, returning the previous visit time.
    pub async fn record_visit(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let previous = self.storage.get_item(keys::LAST_VISIT).await;
        self.storage.set_item(keys::LAST_VISIT, &now).await;
        previous
    }

    /// Stored preferences, or the defaults when none are stored.
    pub async fn load_preferences(&self) -> UserPreferences {
        self.get_user_preference(keys::USER_SETTINGS)
            .await
            .unwrap_or_default()
    }

    pub async fn save_preferences(&self, preferences: &UserPreferences) {
        self.set_user_preference(keys::USER_SETTINGS, preferences)
            .await;
    }
}
