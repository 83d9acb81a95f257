//! Protected dashboard.
//!
//! Every handler here takes [`RequireAuth`], so nothing is read or rendered
//! for a visitor without a valid session.

use std::str::FromStr;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::Query,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use kiosk_core::{PreferenceUpdate, Theme, UserPreferences};
use serde::Deserialize;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireAuth;
use crate::storage::{ClientStorage, SessionBackend, TabStorage};

// =============================================================================
// Form and Query Types
// =============================================================================

/// Preferences form data.
///
/// Browsers omit unchecked checkboxes, so `notifications` is present only
/// when ticked.
#[derive(Debug, Deserialize)]
pub struct PreferencesForm {
    pub theme: Option<String>,
    pub language: Option<String>,
    pub notifications: Option<String>,
}

impl PreferencesForm {
    /// Validate the form into an update.
    ///
    /// # Errors
    ///
    /// Returns a message naming the rejected field.
    pub fn into_update(self) -> Result<PreferenceUpdate, String> {
        let theme = self
            .theme
            .as_deref()
            .map(Theme::from_str)
            .transpose()
            .map_err(|e| e.to_string())?;

        let language = match self.language {
            Some(code) if !code.is_empty() && !UserPreferences::is_supported_language(&code) => {
                return Err(format!("Unsupported language: {code}"));
            }
            other => other,
        };

        Ok(PreferenceUpdate {
            theme,
            language,
            notifications: Some(self.notifications.is_some()),
        })
    }
}

/// Query parameters for status display.
#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub error: Option<String>,
    pub notice: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// One `<option>` of a preference select.
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl SelectOption {
    fn themes(current: Theme) -> Vec<Self> {
        Theme::ALL
            .iter()
            .map(|theme| Self {
                value: theme.as_str(),
                label: theme.label(),
                selected: *theme == current,
            })
            .collect()
    }

    fn languages(current: &str) -> Vec<Self> {
        UserPreferences::LANGUAGES
            .iter()
            .map(|&(code, label)| Self {
                value: code,
                label,
                selected: code == current,
            })
            .collect()
    }
}

/// Dashboard page template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub email: String,
    pub themes: Vec<SelectOption>,
    pub languages: Vec<SelectOption>,
    pub notifications: bool,
    /// Previous visit, formatted for display.
    pub last_visit: Option<String>,
    pub storage_available: bool,
    pub error: Option<String>,
    pub notice: Option<&'static str>,
}

/// Text for a `notice` query value.
fn notice_text(notice: Option<&str>) -> Option<&'static str> {
    match notice? {
        "saved" => Some("Preferences saved."),
        "cleared" => Some("Session data cleared."),
        _ => None,
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the dashboard.
///
/// Records this visit and shows the previous one.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    RequireAuth(user): RequireAuth,
    TabStorage(storage): TabStorage,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let data = storage.app_data();
    let preferences = data.load_preferences().await;
    let last_visit = data
        .record_visit(Utc::now())
        .await
        .map(|visit| visit.format("%Y-%m-%d %H:%M:%S UTC").to_string());

    DashboardTemplate {
        email: user.display_name(),
        themes: SelectOption::themes(preferences.theme),
        languages: SelectOption::languages(&preferences.language),
        notifications: preferences.notifications,
        last_visit,
        storage_available: storage.is_available().await,
        error: query.error,
        notice: notice_text(query.notice.as_deref()),
    }
}

/// Save preferences.
///
/// Reads the stored preferences, merges the submitted fields, and writes the
/// result back. Theme and language are mirrored to their own keys.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update_preferences(
    RequireAuth(user): RequireAuth,
    TabStorage(storage): TabStorage,
    Form(form): Form<PreferencesForm>,
) -> Response {
    let update = match form.into_update() {
        Ok(update) => update,
        Err(message) => {
            return Redirect::to(&format!(
                "/dashboard?error={}",
                urlencoding::encode(&message)
            ))
            .into_response();
        }
    };

    save_preferences(&storage, update).await;
    Redirect::to("/dashboard?notice=saved").into_response()
}

async fn save_preferences(storage: &ClientStorage<SessionBackend>, update: PreferenceUpdate) {
    let data = storage.app_data();
    let merged = update.apply(data.load_preferences().await);

    data.save_preferences(&merged).await;
    data.set_theme(merged.theme).await;
    data.set_language(&merged.language).await;
}

/// Clear the visitor's stored data.
///
/// Only the storage map is cleared; the user stays signed in.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear(RequireAuth(user): RequireAuth, TabStorage(storage): TabStorage) -> Response {
    storage.clear().await;
    Redirect::to("/dashboard?notice=cleared").into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(theme: Option<&str>, language: Option<&str>, notifications: bool) -> PreferencesForm {
        PreferencesForm {
            theme: theme.map(String::from),
            language: language.map(String::from),
            notifications: notifications.then(|| "on".to_string()),
        }
    }

    #[test]
    fn test_form_into_update() {
        let update = form(Some("dark"), Some("es"), false).into_update().unwrap();
        assert_eq!(update.theme, Some(Theme::Dark));
        assert_eq!(update.language.as_deref(), Some("es"));
        assert_eq!(update.notifications, Some(false));
    }

    #[test]
    fn test_form_rejects_unknown_theme() {
        assert!(form(Some("sepia"), None, true).into_update().is_err());
    }

    #[test]
    fn test_form_rejects_unknown_language() {
        let err = form(None, Some("de"), true).into_update().unwrap_err();
        assert_eq!(err, "Unsupported language: de");
    }

    #[test]
    fn test_select_options_mark_current() {
        let themes = SelectOption::themes(Theme::Dark);
        let selected: Vec<&str> = themes
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec!["dark"]);

        let languages = SelectOption::languages("fr");
        assert!(languages.iter().any(|o| o.value == "fr" && o.selected));
        assert_eq!(languages.iter().filter(|o| o.selected).count(), 1);
    }

    #[test]
    fn test_notice_text() {
        assert_eq!(notice_text(Some("saved")), Some("Preferences saved."));
        assert_eq!(notice_text(Some("<script>")), None);
        assert_eq!(notice_text(None), None);
    }

    #[test]
    fn test_partial_form_keeps_other_fields() {
        let current = UserPreferences {
            theme: Theme::Auto,
            language: "fr".to_string(),
            notifications: false,
        };
        let merged = form(None, None, true).into_update().unwrap().apply(current);
        assert_eq!(merged.theme, Theme::Auto);
        assert_eq!(merged.language, "fr");
        assert!(merged.notifications);
    }
}
