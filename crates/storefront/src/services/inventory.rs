//! Stock updates.
//!
//! Setting a stock level is the only trigger for back-in-stock
//! notifications; there is no save hook. See
//! [`InventoryStore::apply_stock_level`] for the atomic unit.

use tracing::{info, instrument};

use musicshop_core::{AlbumId, ProductRef};
use musicshop_core::inventory::validate_stock;

use super::ShopError;
use crate::db::{InventoryStore, RepositoryError, StockUpdate};

pub struct InventoryService<'a, S> {
    store: &'a S,
}

impl<'a, S: InventoryStore> InventoryService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Write an album's stock level and notify wish-listers on a restock.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Stock` for negative levels,
    /// `ShopError::ProductNotFound` for unknown albums, and
    /// `ShopError::Repository` on storage failure.
    #[instrument(skip(self))]
    pub async fn set_stock(&self, album: AlbumId, stock: i32) -> Result<StockUpdate, ShopError> {
        let stock = validate_stock(stock)?;
        let update = self
            .store
            .apply_stock_level(album, stock)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ShopError::ProductNotFound(ProductRef::Album(album)),
                other => other.into(),
            })?;

        info!(
            previous = update.transition.previous,
            current = update.transition.current,
            sold_out = update.transition.is_sellout(),
            notified = update.notified.len(),
            "Stock updated"
        );
        Ok(update)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::seed::tests::sample;
    use crate::db::{CatalogStore, CustomerStore, MemoryStore, NewAccount, WishlistStore};
    use musicshop_core::{CustomerId, Email, StockError};

    async fn setup() -> (MemoryStore, AlbumId, CustomerId) {
        let store = MemoryStore::new();
        store.import_catalog(&sample()).await.unwrap();
        let album = store.offers_of_the_week().await.unwrap()[0].id;
        let (_, customer) = store
            .register(NewAccount {
                email: Email::parse("wisher@example.com").unwrap(),
                password_hash: "hash".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .unwrap();
        (store, album, customer.id)
    }

    #[tokio::test]
    async fn test_negative_stock_rejected() {
        let (store, album, _) = setup().await;
        let err = InventoryService::new(&store)
            .set_stock(album, -1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Stock(StockError::Negative(-1))));
        assert_eq!(store.album(album).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_out_of_stock_tracks_zero() {
        let (store, album, _) = setup().await;
        let service = InventoryService::new(&store);

        let update = service.set_stock(album, 0).await.unwrap();
        assert!(update.album.out_of_stock);
        assert!(update.transition.is_sellout());

        let update = service.set_stock(album, 3).await.unwrap();
        assert!(!update.album.out_of_stock);
    }

    #[tokio::test]
    async fn test_restock_notifies_and_clears_wishlist() {
        let (store, album, customer) = setup().await;
        let service = InventoryService::new(&store);
        service.set_stock(album, 0).await.unwrap();
        store.add_to_wishlist(customer, album).await.unwrap();

        let update = service.set_stock(album, 4).await.unwrap();

        assert_eq!(update.notified, vec![customer]);
        let notifications = store.notifications(customer, true).await.unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(
            notifications[0].text,
            "Kino - Gruppa krovi is back in stock!"
        );
        assert!(store.wishlist(customer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_crossing_edits_notify_nobody() {
        let (store, album, customer) = setup().await;
        let service = InventoryService::new(&store);
        store.add_to_wishlist(customer, album).await.unwrap();

        // 5 -> 2 -> 0 -> 0: no zero-crossing upward.
        for level in [2, 0, 0] {
            let update = service.set_stock(album, level).await.unwrap();
            assert!(update.notified.is_empty());
        }
        assert!(store.notifications(customer, false).await.unwrap().is_empty());
        assert_eq!(store.wishlist(customer).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_album() {
        let (store, _, _) = setup().await;
        let err = InventoryService::new(&store)
            .set_stock(AlbumId::new(4_040), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound(_)));
    }
}
