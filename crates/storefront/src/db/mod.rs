//! Storage ports for the storefront.
//!
//! # Schema: `shop`
//!
//! - `genre`, `member`, `media_type`, `artist`, `artist_member`, `album` - catalog
//! - `app_user`, `customer` - login identities and buyer profiles
//! - `cart`, `cart_line` - carts, one active per identity
//! - `customer_order` - placed orders
//! - `wishlist`, `notification` - back-in-stock reactor state
//! - `tower_sessions.session` - session storage (created by the store itself)
//!
//! Services talk to the traits in this module. [`PgStore`] backs them with
//! `PostgreSQL`; `MemoryStore` (feature `test-support`) keeps everything in
//! process for tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p musicshop-cli -- migrate
//! ```

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod postgres;
pub mod seed;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use musicshop_core::{
    Album, AlbumId, Artist, ArtistId, Cart, CartId, CartOwner, CartToken, CheckoutDetails, Customer,
    CustomerId, Email, Genre, GenreId, MediaType, Notification, NotificationId, Order, OrderId,
    OrderStatus, StockTransition, User, UserId,
};

#[cfg(any(test, feature = "test-support"))]
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use seed::{CatalogSeed, ImportSummary};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or lost optimistic-concurrency race.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The stored cart already belongs to an order.
    #[error("cart {0} is already part of an order")]
    FrozenCart(CartId),
}

impl RepositoryError {
    /// Map a unique-violation into `Conflict`, anything else into `Database`.
    pub(crate) fn from_unique_violation(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(err)
    }

    /// The cart changed since it was loaded.
    pub(crate) fn stale_cart(cart: &Cart) -> Self {
        Self::Conflict(format!(
            "cart {} was modified concurrently (version {})",
            cart.id(),
            cart.version()
        ))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Fields for a new account. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: Email,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

/// Result of one stock write.
#[derive(Debug, Clone)]
pub struct StockUpdate {
    /// The album after the write.
    pub album: Album,
    pub transition: StockTransition,
    /// Customers that received a back-in-stock notification.
    pub notified: Vec<CustomerId>,
}

// =============================================================================
// Ports
// =============================================================================

/// Read access to the catalog, plus bulk import.
pub trait CatalogStore: Send + Sync {
    fn genres(&self) -> impl Future<Output = Result<Vec<Genre>, RepositoryError>> + Send;

    fn genre_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Genre>, RepositoryError>> + Send;

    fn media_types(&self) -> impl Future<Output = Result<Vec<MediaType>, RepositoryError>> + Send;

    /// Artists ordered by name, optionally restricted to one genre.
    fn artists(
        &self,
        genre: Option<GenreId>,
    ) -> impl Future<Output = Result<Vec<Artist>, RepositoryError>> + Send;

    fn artist_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Artist>, RepositoryError>> + Send;

    /// Albums of one artist, newest release first.
    fn albums_by_artist(
        &self,
        artist: ArtistId,
    ) -> impl Future<Output = Result<Vec<Album>, RepositoryError>> + Send;

    fn album(&self, id: AlbumId)
    -> impl Future<Output = Result<Option<Album>, RepositoryError>> + Send;

    fn album_by_slug(
        &self,
        artist_slug: &str,
        album_slug: &str,
    ) -> impl Future<Output = Result<Option<Album>, RepositoryError>> + Send;

    fn offers_of_the_week(
        &self,
    ) -> impl Future<Output = Result<Vec<Album>, RepositoryError>> + Send;

    /// Upsert every record of `seed` by slug. Existing album stock is kept.
    fn import_catalog(
        &self,
        seed: &CatalogSeed,
    ) -> impl Future<Output = Result<ImportSummary, RepositoryError>> + Send;
}

/// Users and their customer profiles.
pub trait CustomerStore: Send + Sync {
    fn user(&self, id: UserId) -> impl Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// The user with `email` together with their password hash.
    fn user_credentials(
        &self,
        email: &Email,
    ) -> impl Future<Output = Result<Option<(User, String)>, RepositoryError>> + Send;

    /// Create a user and its customer in one step.
    ///
    /// Fails with `Conflict` when the email is taken.
    fn register(
        &self,
        account: NewAccount,
    ) -> impl Future<Output = Result<(User, Customer), RepositoryError>> + Send;

    fn customer(
        &self,
        id: CustomerId,
    ) -> impl Future<Output = Result<Option<Customer>, RepositoryError>> + Send;

    /// Find the user's customer, creating one with empty profile fields.
    ///
    /// The flag is `true` when the customer was created. Fails with
    /// `NotFound` when the user does not exist.
    fn ensure_customer(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<(Customer, bool), RepositoryError>> + Send;
}

/// Carts and their lines.
pub trait CartStore: Send + Sync {
    /// The customer's cart that is not yet part of an order.
    fn active_cart_for_customer(
        &self,
        customer: CustomerId,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// The anonymous cart for `token` that is not yet part of an order.
    fn active_cart_for_token(
        &self,
        token: &CartToken,
    ) -> impl Future<Output = Result<Option<Cart>, RepositoryError>> + Send;

    /// Create an empty cart. Fails with `Conflict` when the owner already
    /// has an active cart.
    fn create_cart(
        &self,
        owner: &CartOwner,
    ) -> impl Future<Output = Result<Cart, RepositoryError>> + Send;

    /// Persist lines and totals if the stored version still matches, then
    /// bump the version on `cart`.
    fn save_cart(&self, cart: &mut Cart)
    -> impl Future<Output = Result<(), RepositoryError>> + Send;

    /// Save `merged` and delete `absorbed` atomically, both version-checked.
    fn save_merged_cart(
        &self,
        merged: &mut Cart,
        absorbed: &Cart,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Order placement and status.
pub trait OrderStore: Send + Sync {
    /// Insert the order and freeze the cart in one transaction.
    ///
    /// `cart` must still be active in storage at its loaded version; on
    /// success its version is bumped.
    fn place_order(
        &self,
        cart: &mut Cart,
        customer: CustomerId,
        details: &CheckoutDetails,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;

    fn order(&self, id: OrderId)
    -> impl Future<Output = Result<Option<Order>, RepositoryError>> + Send;

    /// A customer's orders, newest first.
    fn orders_for_customer(
        &self,
        customer: CustomerId,
    ) -> impl Future<Output = Result<Vec<Order>, RepositoryError>> + Send;

    /// Compare-and-set the status. Fails with `Conflict` when the stored
    /// status is no longer `from`.
    fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> impl Future<Output = Result<Order, RepositoryError>> + Send;
}

/// Wishlists and notifications.
pub trait WishlistStore: Send + Sync {
    /// Returns `false` when the album was already wish-listed.
    fn add_to_wishlist(
        &self,
        customer: CustomerId,
        album: AlbumId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Returns `false` when the album was not wish-listed.
    fn remove_from_wishlist(
        &self,
        customer: CustomerId,
        album: AlbumId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    fn wishlist(
        &self,
        customer: CustomerId,
    ) -> impl Future<Output = Result<Vec<Album>, RepositoryError>> + Send;

    /// Newest first.
    fn notifications(
        &self,
        customer: CustomerId,
        unread_only: bool,
    ) -> impl Future<Output = Result<Vec<Notification>, RepositoryError>> + Send;

    /// Returns `false` when no unread notification with that id belongs to
    /// the customer.
    fn mark_notification_read(
        &self,
        customer: CustomerId,
        id: NotificationId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// Returns how many notifications changed.
    fn mark_all_notifications_read(
        &self,
        customer: CustomerId,
    ) -> impl Future<Output = Result<u64, RepositoryError>> + Send;
}

/// Stock writes with the back-in-stock reaction.
pub trait InventoryStore: Send + Sync {
    /// Write `stock` (already validated) and react to the transition, all
    /// in one unit: on a restock every wish-lister gets one notification
    /// and the album leaves their wishlist.
    fn apply_stock_level(
        &self,
        album: AlbumId,
        stock: i32,
    ) -> impl Future<Output = Result<StockUpdate, RepositoryError>> + Send;
}

/// Everything the storefront needs from storage.
pub trait Store:
    CatalogStore + CustomerStore + CartStore + OrderStore + WishlistStore + InventoryStore
{
}

impl<T> Store for T where
    T: CatalogStore + CustomerStore + CartStore + OrderStore + WishlistStore + InventoryStore
{
}
