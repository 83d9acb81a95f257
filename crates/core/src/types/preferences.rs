//! Dashboard preferences kept in session storage.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Theme`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown theme: {0}")]
pub struct ThemeParseError(String);

/// Colour theme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    Auto,
}

impl Theme {
    /// All selectable themes, in display order.
    pub const ALL: [Self; 3] = [Self::Light, Self::Dark, Self::Auto];

    /// Lowercase identifier, matching the serialized form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Auto => "auto",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Light => "Light",
            Self::Dark => "Dark",
            Self::Auto => "Auto",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ThemeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "auto" => Ok(Self::Auto),
            other => Err(ThemeParseError(other.to_owned())),
        }
    }
}

/// Per-session user preferences.
///
/// Stored as a single JSON value and always written back whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: String,
    pub notifications: bool,
}

impl UserPreferences {
    /// Languages offered by the dashboard, as `(code, label)`.
    pub const LANGUAGES: [(&'static str, &'static str); 3] =
        [("en", "English"), ("es", "Spanish"), ("fr", "French")];

    /// Whether `code` is one of [`Self::LANGUAGES`].
    #[must_use]
    pub fn is_supported_language(code: &str) -> bool {
        Self::LANGUAGES.iter().any(|(c, _)| *c == code)
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
            notifications: true,
        }
    }
}

/// A partial change to [`UserPreferences`].
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PreferenceUpdate {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub notifications: Option<bool>,
}

impl PreferenceUpdate {
    /// Merge this update into `current`, returning the new preferences.
    #[must_use]
    pub fn apply(self, current: UserPreferences) -> UserPreferences {
        UserPreferences {
            theme: self.theme.unwrap_or(current.theme),
            language: self
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or(current.language),
            notifications: self.notifications.unwrap_or(current.notifications),
        }
    }
}
