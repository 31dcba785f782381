//! Shared types for the cipherbook order lifecycle API.
//!
//! The `objects` module is always available; the typed HTTP client lives
//! behind the `client` feature.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
