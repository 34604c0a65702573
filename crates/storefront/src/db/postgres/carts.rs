//! Carts and cart lines.
//!
//! Every write locks the cart row with `SELECT ... FOR UPDATE`, compares the
//! stored version with the one the caller loaded, and bumps it. A mismatch is
//! a lost race and surfaces as [`RepositoryError::Conflict`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgExecutor};
use tracing::{debug, instrument};

use musicshop_core::{
    Cart, CartId, CartLine, CartOwner, CartToken, CustomerId, ProductRef, Quantity,
};

use super::PgStore;
use crate::db::{CartStore, RepositoryError};

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: CartId,
    owner_id: Option<CustomerId>,
    session_key: Option<String>,
    total_items: i32,
    total_price: Decimal,
    in_order: bool,
    version: i32,
    created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    product_kind: String,
    product_id: i32,
    display_name: String,
    quantity: i32,
    unit_price: Decimal,
    line_total: Decimal,
}

const CART_COLUMNS: &str =
    "id, owner_id, session_key, total_items, total_price, in_order, version, created_at";

fn corrupt(cart: CartId, what: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::DataCorruption(format!("cart {cart}: {what}"))
}

impl LineRow {
    fn into_line(self, cart: CartId) -> Result<CartLine, RepositoryError> {
        let product = ProductRef::from_parts(&self.product_kind, self.product_id)
            .map_err(|e| corrupt(cart, e))?;
        let quantity = u32::try_from(self.quantity)
            .map_err(|_| corrupt(cart, "negative quantity"))
            .and_then(|q| Quantity::new(q).map_err(|e| corrupt(cart, e)))?;
        Ok(CartLine::restore(
            product,
            self.display_name,
            quantity,
            self.unit_price,
            self.line_total,
        ))
    }
}

async fn load_cart(conn: &mut PgConnection, row: CartRow) -> Result<Cart, RepositoryError> {
    let owner = match (row.owner_id, row.session_key) {
        (Some(customer), None) => CartOwner::Customer(customer),
        (None, Some(token)) => CartOwner::Anonymous(CartToken::from_stored(token)),
        _ => return Err(corrupt(row.id, "owner must be a customer or a session key")),
    };
    let total_items =
        u32::try_from(row.total_items).map_err(|_| corrupt(row.id, "negative total_items"))?;

    let lines = sqlx::query_as::<_, LineRow>(
        r"
        SELECT product_kind, product_id, display_name, quantity, unit_price, line_total
        FROM shop.cart_line
        WHERE cart_id = $1
        ORDER BY position
        ",
    )
    .bind(row.id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|line| line.into_line(row.id))
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Cart::restore(
        row.id,
        owner,
        lines,
        total_items,
        row.total_price,
        row.in_order,
        row.version,
        row.created_at,
    ))
}

/// Lock the cart row and check it is still active at `cart`'s version.
///
/// A cart consumed by an order fails with `FrozenCart` whatever the version.
pub(super) async fn lock_active_cart<'e, E>(executor: E, cart: &Cart) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    let stored: Option<(i32, bool)> =
        sqlx::query_as("SELECT version, in_order FROM shop.cart WHERE id = $1 FOR UPDATE")
            .bind(cart.id())
            .fetch_optional(executor)
            .await?;

    match stored {
        None => Err(RepositoryError::NotFound),
        Some((_, true)) => Err(RepositoryError::FrozenCart(cart.id())),
        Some((version, false)) if version != cart.version() => {
            Err(RepositoryError::stale_cart(cart))
        }
        Some(_) => Ok(()),
    }
}

/// Replace the stored lines and totals with `cart`'s and bump the version.
///
/// The caller must hold the row lock.
async fn write_cart(conn: &mut PgConnection, cart: &Cart) -> Result<i32, RepositoryError> {
    sqlx::query("DELETE FROM shop.cart_line WHERE cart_id = $1")
        .bind(cart.id())
        .execute(&mut *conn)
        .await?;

    for (position, line) in (0_i32..).zip(cart.lines()) {
        let quantity = i32::try_from(line.quantity().get())
            .map_err(|_| corrupt(cart.id(), "quantity out of range"))?;
        sqlx::query(
            r"
            INSERT INTO shop.cart_line
                (cart_id, position, product_kind, product_id, display_name,
                 quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(cart.id())
        .bind(position)
        .bind(line.product().kind())
        .bind(line.product().object_id())
        .bind(line.display_name())
        .bind(quantity)
        .bind(line.unit_price())
        .bind(line.line_total())
        .execute(&mut *conn)
        .await?;
    }

    let total_items = i32::try_from(cart.total_items())
        .map_err(|_| corrupt(cart.id(), "total_items out of range"))?;
    let (version,): (i32,) = sqlx::query_as(
        r"
        UPDATE shop.cart
        SET total_items = $2, total_price = $3, version = version + 1
        WHERE id = $1
        RETURNING version
        ",
    )
    .bind(cart.id())
    .bind(total_items)
    .bind(cart.total_price())
    .fetch_one(&mut *conn)
    .await?;

    Ok(version)
}

impl CartStore for PgStore {
    async fn active_cart_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        let sql = format!("SELECT {CART_COLUMNS} FROM shop.cart WHERE owner_id = $1 AND NOT in_order");
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(customer)
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => Ok(Some(load_cart(&mut *conn, row).await?)),
            None => Ok(None),
        }
    }

    async fn active_cart_for_token(
        &self,
        token: &CartToken,
    ) -> Result<Option<Cart>, RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        let sql =
            format!("SELECT {CART_COLUMNS} FROM shop.cart WHERE session_key = $1 AND NOT in_order");
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(token.as_str())
            .fetch_optional(&mut *conn)
            .await?;
        match row {
            Some(row) => Ok(Some(load_cart(&mut *conn, row).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, owner), fields(anonymous = owner.token().is_some()))]
    async fn create_cart(&self, owner: &CartOwner) -> Result<Cart, RepositoryError> {
        let (id, created_at): (CartId, DateTime<Utc>) = sqlx::query_as(
            r"
            INSERT INTO shop.cart (owner_id, session_key)
            VALUES ($1, $2)
            RETURNING id, created_at
            ",
        )
        .bind(owner.customer())
        .bind(owner.token().map(CartToken::as_str))
        .fetch_one(self.pool())
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "active cart"))?;

        debug!(cart_id = %id, "Created cart");
        Ok(Cart::new(id, owner.clone(), created_at))
    }

    #[instrument(skip(self, cart), fields(cart_id = %cart.id(), version = cart.version()))]
    async fn save_cart(&self, cart: &mut Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;
        lock_active_cart(&mut *tx, cart).await?;
        let version = write_cart(&mut *tx, cart).await?;
        tx.commit().await?;

        cart.set_version(version);
        Ok(())
    }

    #[instrument(skip(self, merged, absorbed), fields(cart_id = %merged.id(), absorbed_id = %absorbed.id()))]
    async fn save_merged_cart(
        &self,
        merged: &mut Cart,
        absorbed: &Cart,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // Lock in id order so two concurrent merges cannot deadlock.
        let (first, second) = if merged.id() < absorbed.id() {
            (&*merged, absorbed)
        } else {
            (absorbed, &*merged)
        };
        lock_active_cart(&mut *tx, first).await?;
        lock_active_cart(&mut *tx, second).await?;

        let version = write_cart(&mut *tx, merged).await?;
        sqlx::query("DELETE FROM shop.cart WHERE id = $1")
            .bind(absorbed.id())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        merged.set_version(version);
        debug!("Merged anonymous cart");
        Ok(())
    }
}

/// Bump the version of a locked cart and mark it as part of an order.
pub(super) async fn freeze_cart(conn: &mut PgConnection, cart: CartId) -> Result<i32, RepositoryError> {
    let (version,): (i32,) = sqlx::query_as(
        "UPDATE shop.cart SET in_order = TRUE, version = version + 1 WHERE id = $1 RETURNING version",
    )
    .bind(cart)
    .fetch_one(conn)
    .await?;
    Ok(version)
}
