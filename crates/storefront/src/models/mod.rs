//! Types the storefront keeps in the server-side session.

pub mod session;

pub use session::{StoredSession, keys as session_keys};
