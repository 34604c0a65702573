//! Order placement and status updates.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, instrument};

use musicshop_core::{
    BuyingType, Cart, CartId, CheckoutDetails, CustomerId, Order, OrderId, OrderStatus,
};

use super::PgStore;
use super::carts::{freeze_cart, lock_active_cart};
use crate::db::{OrderStore, RepositoryError};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    customer_id: CustomerId,
    cart_id: CartId,
    first_name: String,
    last_name: String,
    phone: String,
    address: String,
    buying_type: BuyingType,
    comment: String,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    order_date: NaiveDate,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            customer_id: row.customer_id,
            cart_id: row.cart_id,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            address: row.address,
            buying_type: row.buying_type,
            comment: row.comment,
            status: row.status,
            created_at: row.created_at,
            order_date: row.order_date,
        }
    }
}

const ORDER_COLUMNS: &str = r"
    id, customer_id, cart_id, first_name, last_name, phone, address,
    buying_type, comment, status, created_at, order_date
";

impl OrderStore for PgStore {
    #[instrument(skip(self, cart, details), fields(cart_id = %cart.id(), %customer))]
    async fn place_order(
        &self,
        cart: &mut Cart,
        customer: CustomerId,
        details: &CheckoutDetails,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;
        lock_active_cart(&mut *tx, cart).await?;

        let sql = format!(
            r"
            INSERT INTO shop.customer_order
                (customer_id, cart_id, first_name, last_name, phone, address,
                 buying_type, comment, status, order_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(customer)
            .bind(cart.id())
            .bind(&details.first_name)
            .bind(&details.last_name)
            .bind(&details.phone)
            .bind(&details.address)
            .bind(details.buying_type)
            .bind(&details.comment)
            .bind(OrderStatus::New)
            .bind(details.order_date)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_unique_violation(e, "order for this cart"))?;

        let version = freeze_cart(&mut *tx, cart.id()).await?;
        tx.commit().await?;

        cart.set_version(version);
        debug!(order_id = %row.id, "Placed order");
        Ok(row.into())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE id = $1");
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.map(Order::from))
    }

    async fn orders_for_customer(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<Order>, RepositoryError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM shop.customer_order WHERE customer_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(customer)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let sql = format!(
            "UPDATE shop.customer_order SET status = $3 WHERE id = $1 AND status = $2 RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id)
            .bind(from)
            .bind(to)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(row.into()),
            None => match self.order(id).await? {
                Some(current) => Err(RepositoryError::Conflict(format!(
                    "order {id} is {}, expected {from}",
                    current.status
                ))),
                None => Err(RepositoryError::NotFound),
            },
        }
    }
}
