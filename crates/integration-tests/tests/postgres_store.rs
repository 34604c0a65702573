//! Cart, checkout, and restock rules as `PostgreSQL` enforces them.
//!
//! These tests require a running `PostgreSQL` server named by
//! `DATABASE_URL`. Each test gets its own database with the storefront
//! migrations applied.
//!
//! Run with: `cargo test -p musicshop-integration-tests -- --include-ignored`

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use sqlx::PgPool;

use musicshop_core::{CartError, CartOwner, CartToken, ProductRef, Quantity, UserId};
use musicshop_integration_tests::{album, pickup_details, register, seeded_pg_store};
use musicshop_storefront::db::{CartStore, CustomerStore, PgStore, RepositoryError};
use musicshop_storefront::services::{
    CartService, CheckoutService, Identity, InventoryService, ShopError, WishlistService,
};

async fn cart_count(store: &PgStore) -> i64 {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.cart")
        .fetch_one(store.pool())
        .await
        .unwrap();
    count
}

// ============================================================================
// Restock
// ============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_restock_notifies_each_wisher_once(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let zvezda = album(&store, "kino", "zvezda-po-imeni-solntse").await;
    let wishlist = WishlistService::new(&store);

    let mut wishers = Vec::new();
    for email in ["first@example.com", "second@example.com"] {
        let user = register(&store, email).await;
        let (customer, _) = store.ensure_customer(user.id).await.unwrap();
        assert!(wishlist.add(customer.id, zvezda.id).await.unwrap());
        wishers.push(customer.id);
    }

    let inventory = InventoryService::new(&store);
    let mut update = inventory.set_stock(zvezda.id, 5).await.unwrap();
    assert!(update.transition.is_restock());
    assert!(!update.album.out_of_stock);
    update.notified.sort();
    assert_eq!(update.notified, wishers);

    for customer in &wishers {
        let feed = wishlist.unread_with_albums(*customer).await.unwrap();
        assert_eq!(feed.len(), 1);
        let (notification, linked) = &feed[0];
        assert_eq!(notification.album_id, Some(zvezda.id));
        assert_eq!(notification.text, "Kino - Zvezda po imeni Solntse is back in stock!");
        assert_eq!(linked.as_ref().unwrap().slug, "zvezda-po-imeni-solntse");
        assert!(wishlist.albums(*customer).await.unwrap().is_empty());
    }

    // Positive to positive is not a restock.
    let update = inventory.set_stock(zvezda.id, 3).await.unwrap();
    assert!(update.notified.is_empty());
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM shop.notification")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(total, 2);
}

// ============================================================================
// Cart identity
// ============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_merge_sums_lines_and_deletes_anonymous_cart(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let carts = CartService::new(&store);
    let krovi = ProductRef::Album(album(&store, "kino", "gruppa-krovi").await.id);
    let oktyabr = ProductRef::Album(album(&store, "ddt", "oktyabr").await.id);

    let mut visitor = carts.resolve(&Identity::Anonymous(None)).await.unwrap();
    let token = visitor.issued_token.clone().unwrap();
    carts
        .add_item(&mut visitor.cart, krovi, Quantity::new(2).unwrap())
        .await
        .unwrap();
    carts
        .add_item(&mut visitor.cart, oktyabr, Quantity::ONE)
        .await
        .unwrap();

    let user = register(&store, "fan@example.com").await;
    let mut own = carts
        .resolve(&Identity::Authenticated(user.id))
        .await
        .unwrap();
    carts
        .add_item(&mut own.cart, krovi, Quantity::ONE)
        .await
        .unwrap();

    let merged = carts.merge_anonymous(user.id, &token).await.unwrap();
    assert_eq!(merged.id(), own.cart.id());
    assert_eq!(merged.total_items(), 4);
    let quantities: Vec<(ProductRef, u32)> = merged
        .lines()
        .iter()
        .map(|line| (line.product(), line.quantity().get()))
        .collect();
    assert!(quantities.contains(&(krovi, 3)));
    assert!(quantities.contains(&(oktyabr, 1)));

    let reloaded = carts
        .resolve(&Identity::Authenticated(user.id))
        .await
        .unwrap()
        .cart;
    assert_eq!(reloaded.total_items(), 4);
    assert_eq!(reloaded.total_price(), merged.total_price());
    assert_eq!(reloaded.version(), merged.version());
    assert!(store.active_cart_for_token(&token).await.unwrap().is_none());
    assert_eq!(cart_count(&store).await, 1);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_one_active_cart_per_identity(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let user = register(&store, "owner@example.com").await;
    let (customer, _) = store.ensure_customer(user.id).await.unwrap();

    let owner = CartOwner::Customer(customer.id);
    let mut first = store.create_cart(&owner).await.unwrap();
    assert!(matches!(
        store.create_cart(&owner).await,
        Err(RepositoryError::Conflict(_))
    ));

    let anonymous = CartOwner::Anonymous(CartToken::generate());
    store.create_cart(&anonymous).await.unwrap();
    assert!(matches!(
        store.create_cart(&anonymous).await,
        Err(RepositoryError::Conflict(_))
    ));

    // An ordered cart no longer counts as active.
    let krovi = ProductRef::Album(album(&store, "kino", "gruppa-krovi").await.id);
    CartService::new(&store)
        .add_item(&mut first, krovi, Quantity::ONE)
        .await
        .unwrap();
    CheckoutService::new(&store)
        .place_order(&customer, &mut first, pickup_details())
        .await
        .unwrap();
    let second = store.create_cart(&owner).await.unwrap();
    assert_ne!(second.id(), first.id());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_stale_version_is_a_conflict(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let carts = CartService::new(&store);
    let krovi = ProductRef::Album(album(&store, "kino", "gruppa-krovi").await.id);

    let resolved = carts.resolve(&Identity::Anonymous(None)).await.unwrap();
    let token = resolved.issued_token.unwrap();
    let mut first = resolved.cart.clone();
    let mut second = resolved.cart;

    carts.add_item(&mut first, krovi, Quantity::ONE).await.unwrap();
    assert_eq!(first.version(), second.version() + 1);

    let err = carts
        .add_item(&mut second, krovi, Quantity::ONE)
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let stored = store.active_cart_for_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.total_items(), 1);
    assert_eq!(stored.version(), first.version());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_read_only_lookup_creates_no_cart(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let carts = CartService::new(&store);

    assert!(carts.peek(&Identity::Anonymous(None)).await.unwrap().is_none());
    assert!(
        carts
            .peek(&Identity::Anonymous(Some(CartToken::generate())))
            .await
            .unwrap()
            .is_none()
    );
    assert_eq!(cart_count(&store).await, 0);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_largest_line_is_stored_exactly(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let krovi = album(&store, "kino", "gruppa-krovi").await;
    sqlx::query("UPDATE shop.album SET price = 9999999.99 WHERE id = $1")
        .bind(krovi.id)
        .execute(store.pool())
        .await
        .unwrap();

    let carts = CartService::new(&store);
    let mut resolved = carts.resolve(&Identity::Anonymous(None)).await.unwrap();
    carts
        .add_item(
            &mut resolved.cart,
            ProductRef::Album(krovi.id),
            Quantity::new(Quantity::MAX).unwrap(),
        )
        .await
        .unwrap();

    let token = resolved.issued_token.unwrap();
    let stored = store.active_cart_for_token(&token).await.unwrap().unwrap();
    assert_eq!(stored.total_price(), Decimal::new(99_989_999_900_01, 2));
    assert_eq!(stored.lines()[0].line_total(), stored.total_price());
}

// ============================================================================
// Customers and checkout
// ============================================================================

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_ensure_customer_creates_once(pool: PgPool) {
    let store = PgStore::new(pool);
    let (user,): (UserId,) = sqlx::query_as(
        "INSERT INTO shop.app_user (email, password_hash) VALUES ('plain@example.com', 'hash') RETURNING id",
    )
    .fetch_one(store.pool())
    .await
    .unwrap();

    let (first, created) = store.ensure_customer(user).await.unwrap();
    assert!(created);
    assert_eq!(first.user_id, user);

    let (second, created) = store.ensure_customer(user).await.unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);

    assert!(matches!(
        store.ensure_customer(UserId::new(9_999)).await,
        Err(RepositoryError::NotFound)
    ));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires a running PostgreSQL database (DATABASE_URL)"]
async fn test_checkout_freezes_cart_in_storage(pool: PgPool) {
    let store = seeded_pg_store(pool).await;
    let carts = CartService::new(&store);
    let checkout = CheckoutService::new(&store);
    let krovi = ProductRef::Album(album(&store, "kino", "gruppa-krovi").await.id);

    let user = register(&store, "buyer@example.com").await;
    let mut resolved = carts
        .resolve(&Identity::Authenticated(user.id))
        .await
        .unwrap();
    carts
        .add_item(&mut resolved.cart, krovi, Quantity::new(2).unwrap())
        .await
        .unwrap();
    let customer = resolved.customer.clone().unwrap();
    let mut stale = resolved.cart.clone();

    let order = checkout
        .place_order(&customer, &mut resolved.cart, pickup_details())
        .await
        .unwrap();
    assert_eq!(order.cart_id, resolved.cart.id());
    assert!(resolved.cart.is_in_order());

    let err = carts
        .add_item(&mut resolved.cart, krovi, Quantity::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(_))));
    let err = carts
        .add_item(&mut stale, krovi, Quantity::ONE)
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(_))));
    let err = checkout
        .place_order(&customer, &mut stale, pickup_details())
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(_))));

    let (in_order, version, total_items): (bool, i32, i32) =
        sqlx::query_as("SELECT in_order, version, total_items FROM shop.cart WHERE id = $1")
            .bind(resolved.cart.id())
            .fetch_one(store.pool())
            .await
            .unwrap();
    assert!(in_order);
    assert_eq!(version, resolved.cart.version());
    assert_eq!(total_items, 2);
    assert_eq!(checkout.orders_for(&customer).await.unwrap().len(), 1);

    let next = carts
        .resolve(&Identity::Authenticated(user.id))
        .await
        .unwrap()
        .cart;
    assert_ne!(next.id(), resolved.cart.id());
    assert!(next.is_empty());
}
