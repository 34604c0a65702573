//! Business logic services for the storefront.
//!
//! Each service borrows a store and is generic over the storage ports it
//! needs, so handlers run them against [`crate::db::PgStore`] and tests run
//! them against the in-memory store.
//!
//! - `cart` - identity resolution, merge on login, line operations
//! - `checkout` - order placement and status changes
//! - `inventory` - stock writes and restock notifications
//! - `wishlist` - wishlist and notification inbox
//! - `catalog` - browse pages and catalog import
//! - `auth` - email/password accounts

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
mod error;
pub mod inventory;
pub mod wishlist;

pub use auth::{AuthError, AuthService, Registration};
pub use cart::{CartService, Identity, ResolvedCart};
pub use catalog::{CatalogService, HomeListing};
pub use checkout::CheckoutService;
pub use error::ShopError;
pub use inventory::InventoryService;
pub use wishlist::WishlistService;
