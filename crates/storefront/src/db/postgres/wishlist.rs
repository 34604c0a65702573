//! Wishlists and notifications.

use chrono::{DateTime, Utc};

use musicshop_core::{Album, AlbumId, CustomerId, Notification, NotificationId};

use super::PgStore;
use super::catalog::{ALBUM_COLUMNS, ALBUM_JOINS, AlbumRow};
use crate::db::{RepositoryError, WishlistStore};

#[derive(Debug, sqlx::FromRow)]
struct NotificationRow {
    id: NotificationId,
    recipient_id: CustomerId,
    album_id: Option<AlbumId>,
    text: String,
    read: bool,
    created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            recipient: row.recipient_id,
            album_id: row.album_id,
            text: row.text,
            read: row.read,
            created_at: row.created_at,
        }
    }
}

impl WishlistStore for PgStore {
    async fn add_to_wishlist(
        &self,
        customer: CustomerId,
        album: AlbumId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO shop.wishlist (customer_id, album_id) VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(customer)
        .bind(album)
        .execute(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_from_wishlist(
        &self,
        customer: CustomerId,
        album: AlbumId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM shop.wishlist WHERE customer_id = $1 AND album_id = $2")
            .bind(customer)
            .bind(album)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn wishlist(&self, customer: CustomerId) -> Result<Vec<Album>, RepositoryError> {
        let sql = format!(
            r"
            SELECT {ALBUM_COLUMNS} {ALBUM_JOINS}
            JOIN shop.wishlist w ON w.album_id = al.id
            WHERE w.customer_id = $1
            ORDER BY w.added_at DESC, al.id
            "
        );
        let rows = sqlx::query_as::<_, AlbumRow>(&sql)
            .bind(customer)
            .fetch_all(self.pool())
            .await?;
        Ok(rows.into_iter().map(Album::from).collect())
    }

    async fn notifications(
        &self,
        customer: CustomerId,
        unread_only: bool,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            r"
            SELECT id, recipient_id, album_id, text, read, created_at
            FROM shop.notification
            WHERE recipient_id = $1 AND (NOT $2 OR NOT read)
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(customer)
        .bind(unread_only)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }

    async fn mark_notification_read(
        &self,
        customer: CustomerId,
        id: NotificationId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.notification SET read = TRUE WHERE id = $1 AND recipient_id = $2 AND NOT read",
        )
        .bind(id)
        .bind(customer)
        .execute(self.pool())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_notifications_read(
        &self,
        customer: CustomerId,
    ) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE shop.notification SET read = TRUE WHERE recipient_id = $1 AND NOT read")
                .bind(customer)
                .execute(self.pool())
                .await?;
        Ok(result.rows_affected())
    }
}
