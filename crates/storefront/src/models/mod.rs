//! Storefront models that live outside the domain crate.

pub mod session;

pub use session::{CurrentUser, keys as session_keys};
