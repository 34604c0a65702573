//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                   - Home: genres, artists, offers of the week
//!
//! # Catalog
//! GET  /genres/{slug}                      - Artists in a genre
//! GET  /artists/{artist_slug}              - Artist detail with albums
//! GET  /artists/{artist_slug}/{album_slug} - Album detail
//!
//! # Cart (forms, or HTMX fragments)
//! GET  /cart                               - Cart page
//! POST /cart/add                           - Add a product
//! POST /cart/update                        - Set a line's quantity
//! POST /cart/remove                        - Remove a line
//! GET  /cart/count                         - Count badge fragment
//!
//! # Checkout (requires auth)
//! GET  /checkout                           - Order form
//! POST /checkout                           - Place the order
//!
//! # Account (requires auth)
//! GET  /account                            - Profile, cart, orders, wishlist, notifications
//! POST /account/notifications/clear        - Mark all notifications read
//! POST /account/notifications/{id}/read    - Mark one notification read
//! POST /wishlist/{album_id}/add            - Add an album to the wishlist
//! POST /wishlist/{album_id}/remove         - Remove an album from the wishlist
//!
//! # Auth
//! GET  /auth/login, POST /auth/login
//! GET  /auth/register, POST /auth/register
//! POST /auth/logout
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod home;
pub mod wishlist;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", post(auth::logout))
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/genres/{slug}", get(catalog::genre))
        .route("/artists/{artist_slug}", get(catalog::artist))
        .route("/artists/{artist_slug}/{album_slug}", get(catalog::album))
}

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(account::index))
        .route(
            "/notifications/clear",
            post(account::clear_notifications),
        )
        .route(
            "/notifications/{id}/read",
            post(account::read_notification),
        )
}

pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/{album_id}/add", post(wishlist::add))
        .route("/{album_id}/remove", post(wishlist::remove))
}

/// Every storefront page and form action.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::place))
        .nest("/account", account_routes())
        .nest("/wishlist", wishlist_routes())
        .nest("/auth", auth_routes())
}
