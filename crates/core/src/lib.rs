//! Kiosk Core - Shared types library.
//!
//! This crate provides the domain types used by the Kiosk storefront:
//! - product records read from the remote catalog table
//! - the user record returned by the identity service
//! - dashboard preferences kept in session storage
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no session
//! handling. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids and prices, plus product, user and
//!   preference records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
