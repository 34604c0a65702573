//! Wishlist and notification operations for a customer.

use std::collections::BTreeMap;

use tracing::{debug, instrument};

use musicshop_core::{Album, AlbumId, CustomerId, Notification, NotificationId, ProductRef};

use super::ShopError;
use crate::db::{CatalogStore, RepositoryError, WishlistStore};

pub struct WishlistService<'a, S> {
    store: &'a S,
}

impl<'a, S: WishlistStore> WishlistService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add an album. Adding twice is a no-op that returns `false`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ProductNotFound` for unknown albums.
    #[instrument(skip(self))]
    pub async fn add(&self, customer: CustomerId, album: AlbumId) -> Result<bool, ShopError> {
        let added = self
            .store
            .add_to_wishlist(customer, album)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ShopError::ProductNotFound(ProductRef::Album(album)),
                other => other.into(),
            })?;
        debug!(added, "Wishlist add");
        Ok(added)
    }

    /// Remove an album. Removing an absent album returns `false`.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    #[instrument(skip(self))]
    pub async fn remove(&self, customer: CustomerId, album: AlbumId) -> Result<bool, ShopError> {
        Ok(self.store.remove_from_wishlist(customer, album).await?)
    }

    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn albums(&self, customer: CustomerId) -> Result<Vec<Album>, ShopError> {
        Ok(self.store.wishlist(customer).await?)
    }

    /// Unread notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn unread_notifications(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<Notification>, ShopError> {
        Ok(self.store.notifications(customer, true).await?)
    }

    /// # Errors
    ///
    /// Returns `ShopError::NotFound` when the customer has no such unread
    /// notification.
    pub async fn mark_read(
        &self,
        customer: CustomerId,
        notification: NotificationId,
    ) -> Result<(), ShopError> {
        if self
            .store
            .mark_notification_read(customer, notification)
            .await?
        {
            Ok(())
        } else {
            Err(ShopError::NotFound("notification"))
        }
    }

    /// Mark every notification read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    #[instrument(skip(self))]
    pub async fn clear(&self, customer: CustomerId) -> Result<u64, ShopError> {
        Ok(self.store.mark_all_notifications_read(customer).await?)
    }
}

impl<S: WishlistStore + CatalogStore> WishlistService<'_, S> {
    /// Unread notifications, newest first, each with the album it is about
    /// when that album still exists.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn unread_with_albums(
        &self,
        customer: CustomerId,
    ) -> Result<Vec<(Notification, Option<Album>)>, ShopError> {
        let notifications = self.store.notifications(customer, true).await?;
        let mut albums: BTreeMap<AlbumId, Option<Album>> = BTreeMap::new();
        let mut feed = Vec::with_capacity(notifications.len());
        for notification in notifications {
            let album = match notification.album_id {
                Some(id) => match albums.get(&id) {
                    Some(cached) => cached.clone(),
                    None => {
                        let fetched = self.store.album(id).await?;
                        albums.insert(id, fetched.clone());
                        fetched
                    }
                },
                None => None,
            };
            feed.push((notification, album));
        }
        Ok(feed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::db::seed::tests::sample;
    use crate::db::{CatalogStore, CustomerStore, MemoryStore, NewAccount};
    use crate::services::InventoryService;
    use musicshop_core::Email;

    async fn setup() -> (MemoryStore, AlbumId, CustomerId) {
        let store = MemoryStore::new();
        store.import_catalog(&sample()).await.unwrap();
        let album = store.offers_of_the_week().await.unwrap()[0].id;
        let (_, customer) = store
            .register(NewAccount {
                email: Email::parse("list@example.com").unwrap(),
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
    async fn test_add_is_idempotent() {
        let (store, album, customer) = setup().await;
        let service = WishlistService::new(&store);

        assert!(service.add(customer, album).await.unwrap());
        assert!(!service.add(customer, album).await.unwrap());
        assert_eq!(service.albums(customer).await.unwrap().len(), 1);

        assert!(service.remove(customer, album).await.unwrap());
        assert!(!service.remove(customer, album).await.unwrap());
    }

    #[tokio::test]
    async fn test_add_unknown_album() {
        let (store, _, customer) = setup().await;
        let err = WishlistService::new(&store)
            .add(customer, AlbumId::new(777))
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn test_mark_read_and_clear() {
        let (store, album, customer) = setup().await;
        let service = WishlistService::new(&store);
        let inventory = InventoryService::new(&store);

        // Two restocks, each preceded by a fresh wish.
        for _ in 0..2 {
            inventory.set_stock(album, 0).await.unwrap();
            service.add(customer, album).await.unwrap();
            inventory.set_stock(album, 1).await.unwrap();
        }

        let unread = service.unread_notifications(customer).await.unwrap();
        assert_eq!(unread.len(), 2);

        service.mark_read(customer, unread[0].id).await.unwrap();
        assert!(matches!(
            service.mark_read(customer, unread[0].id).await,
            Err(ShopError::NotFound("notification"))
        ));

        assert_eq!(service.clear(customer).await.unwrap(), 1);
        assert!(service.unread_notifications(customer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restock_notification_links_album() {
        let (store, album, customer) = setup().await;
        let service = WishlistService::new(&store);
        let inventory = InventoryService::new(&store);
        inventory.set_stock(album, 0).await.unwrap();
        service.add(customer, album).await.unwrap();
        inventory.set_stock(album, 3).await.unwrap();

        let feed = service.unread_with_albums(customer).await.unwrap();
        assert_eq!(feed.len(), 1);
        let (notification, linked) = &feed[0];
        assert_eq!(notification.album_id, Some(album));
        assert_eq!(linked.as_ref().unwrap().id, album);
    }
}
