//! Stock writes and the back-in-stock reaction.

use tracing::{info, instrument};

use musicshop_core::inventory::{is_out_of_stock, restock_message};
use musicshop_core::{AlbumId, CustomerId, StockTransition};

use super::PgStore;
use super::catalog::fetch_album;
use crate::db::{InventoryStore, RepositoryError, StockUpdate};

impl InventoryStore for PgStore {
    #[instrument(skip(self))]
    async fn apply_stock_level(
        &self,
        album: AlbumId,
        stock: i32,
    ) -> Result<StockUpdate, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // The row lock serializes concurrent stock writes for this album.
        let previous: Option<(i32,)> =
            sqlx::query_as("SELECT stock FROM shop.album WHERE id = $1 FOR UPDATE")
                .bind(album)
                .fetch_optional(&mut *tx)
                .await?;
        let (previous,) = previous.ok_or(RepositoryError::NotFound)?;

        sqlx::query("UPDATE shop.album SET stock = $2, out_of_stock = $3 WHERE id = $1")
            .bind(album)
            .bind(stock)
            .bind(is_out_of_stock(stock))
            .execute(&mut *tx)
            .await?;

        let updated = fetch_album(&mut *tx, album)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let transition = StockTransition::new(previous, stock);

        let mut notified = Vec::new();
        if transition.is_restock() {
            let rows: Vec<(CustomerId,)> =
                sqlx::query_as("DELETE FROM shop.wishlist WHERE album_id = $1 RETURNING customer_id")
                    .bind(album)
                    .fetch_all(&mut *tx)
                    .await?;
            notified = rows.into_iter().map(|(customer,)| customer).collect();

            let recipients: Vec<i32> = notified.iter().map(CustomerId::as_i32).collect();
            sqlx::query(
                r"
                INSERT INTO shop.notification (recipient_id, album_id, text)
                SELECT recipient, $2, $3 FROM UNNEST($1::int4[]) AS recipient
                ",
            )
            .bind(&recipients)
            .bind(album)
            .bind(restock_message(&updated))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        if transition.is_restock() {
            info!(notified = notified.len(), "Album back in stock");
        }
        Ok(StockUpdate {
            album: updated,
            transition,
            notified,
        })
    }
}
