//! Core types for Kiosk.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod preferences;
pub mod price;
pub mod product;
pub mod user;

pub use id::{ProductId, UserId};
pub use preferences::{PreferenceUpdate, Theme, ThemeParseError, UserPreferences};
pub use price::Price;
pub use product::Product;
pub use user::User;
