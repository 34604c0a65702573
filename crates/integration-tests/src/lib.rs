//! Scenario tests for the Music Shop storefront.
//!
//! Most tests in `tests/` drive the storefront services end to end against
//! the in-memory store, which follows the same rules as the `PostgreSQL`
//! store (one active cart per identity, version checks, atomic restock).
//!
//! `tests/postgres_store.rs` runs the same rules against `PgStore`. Each of
//! those tests gets a fresh database with the migrations applied, so they
//! need a running `PostgreSQL` server named by `DATABASE_URL`:
//!
//! ```bash
//! cargo test -p musicshop-integration-tests
//!
//! # Including the database-backed tests
//! DATABASE_URL=postgres://localhost/musicshop \
//!     cargo test -p musicshop-integration-tests -- --include-ignored
//! ```
//!
//! This module holds the shared fixtures.

use chrono::NaiveDate;

use musicshop_core::{Album, BuyingType, CheckoutDetails, User};
use musicshop_storefront::db::{CatalogSeed, CatalogStore, CustomerStore, MemoryStore, PgStore};
use sqlx::PgPool;
use musicshop_storefront::services::{AuthService, CatalogService, Registration};

/// The demo catalog shipped in `data/catalog.yaml`.
pub const CATALOG_YAML: &str = include_str!("../../../data/catalog.yaml");

/// Parse the demo catalog.
///
/// # Panics
///
/// Panics if the shipped file does not parse.
#[must_use]
pub fn demo_catalog() -> CatalogSeed {
    serde_yaml::from_str(CATALOG_YAML).expect("data/catalog.yaml parses")
}

/// Import the demo catalog into `store`.
///
/// # Panics
///
/// Panics if the import fails.
pub async fn seed<S: CatalogStore>(store: &S) {
    CatalogService::new(store)
        .import(&demo_catalog())
        .await
        .expect("demo catalog imports");
}

/// A store with the demo catalog imported.
pub async fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();
    seed(&store).await;
    store
}

/// A `PostgreSQL` store over `pool` with the demo catalog imported.
pub async fn seeded_pg_store(pool: PgPool) -> PgStore {
    let store = PgStore::new(pool);
    seed(&store).await;
    store
}

/// Look up a demo album by slugs.
///
/// # Panics
///
/// Panics if the album is missing.
pub async fn album<S: CatalogStore>(store: &S, artist_slug: &str, album_slug: &str) -> Album {
    store
        .album_by_slug(artist_slug, album_slug)
        .await
        .expect("store readable")
        .expect("album exists")
}

/// Register an account with a valid password.
///
/// # Panics
///
/// Panics if registration fails.
pub async fn register<S: CustomerStore>(store: &S, email: &str) -> User {
    let (user, _) = AuthService::new(store)
        .register(Registration {
            email: email.to_string(),
            password: "listen-to-the-records".to_string(),
            first_name: "Test".to_string(),
            last_name: "Listener".to_string(),
            phone: "+7 900 000 00 00".to_string(),
            address: "Nevsky 28".to_string(),
        })
        .await
        .expect("registration succeeds");
    user
}

/// Valid self-pickup checkout details.
#[must_use]
pub fn pickup_details() -> CheckoutDetails {
    CheckoutDetails {
        first_name: "Test".to_string(),
        last_name: "Listener".to_string(),
        phone: "+7 900 000 00 00".to_string(),
        address: String::new(),
        buying_type: BuyingType::SelfPickup,
        comment: "Call before".to_string(),
        order_date: NaiveDate::from_ymd_opt(2026, 10, 20).expect("valid date"),
    }
}
