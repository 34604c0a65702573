//! Order placement and order status.
//!
//! [`CheckoutService::place_order`] is the only place a cart becomes part of
//! an order. The order insert and the cart freeze are one storage step, so a
//! failed checkout leaves the cart active and editable.

use tracing::{info, instrument};

use musicshop_core::{
    Cart, CartOwner, CheckoutDetails, CheckoutError, Customer, Order, OrderId, OrderStatus,
};

use super::ShopError;
use crate::db::OrderStore;

/// Checkout and order queries over a store.
pub struct CheckoutService<'a, S> {
    store: &'a S,
}

impl<'a, S: OrderStore> CheckoutService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Turn the customer's active cart into a new order.
    ///
    /// On success `cart` is frozen in place and carries the stored version,
    /// so any further mutation through it fails with `FrozenCart`. On
    /// failure it is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Checkout` for invalid details or an empty cart,
    /// `ShopError::NotFound` if the cart belongs to someone else,
    /// `ShopError::Cart` if the cart is already in an order, and
    /// `ShopError::Repository` on storage failure or a concurrent change.
    #[instrument(skip(self, customer, cart, details), fields(customer_id = %customer.id, cart_id = %cart.id()))]
    pub async fn place_order(
        &self,
        customer: &Customer,
        cart: &mut Cart,
        details: CheckoutDetails,
    ) -> Result<Order, ShopError> {
        let details = details.normalized();
        details.validate()?;

        if cart.owner() != &CartOwner::Customer(customer.id) {
            return Err(ShopError::NotFound("cart"));
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart.into());
        }

        let mut frozen = cart.clone();
        frozen.mark_in_order()?;
        let order = self
            .store
            .place_order(&mut frozen, customer.id, &details)
            .await?;
        *cart = frozen;

        info!(
            order_id = %order.id,
            total_items = cart.total_items(),
            total_price = %cart.total_price(),
            "Order placed"
        );
        Ok(order)
    }

    /// A customer's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` on storage failure.
    pub async fn orders_for(&self, customer: &Customer) -> Result<Vec<Order>, ShopError> {
        Ok(self.store.orders_for_customer(customer.id).await?)
    }

    /// Move an order to a later status.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::NotFound` for unknown orders, `ShopError::Order`
    /// for backward or same-status moves, and `ShopError::Repository` if the
    /// status changed concurrently.
    #[instrument(skip(self))]
    pub async fn advance_status(&self, id: OrderId, target: OrderStatus) -> Result<Order, ShopError> {
        let mut order = self
            .store
            .order(id)
            .await?
            .ok_or(ShopError::NotFound("order"))?;
        let from = order.status;
        order.advance_to(target)?;

        let updated = self.store.update_order_status(id, from, target).await?;
        info!(%from, to = %updated.status, "Order status advanced");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::db::seed::tests::sample;
    use crate::db::{CartStore, CatalogStore, CustomerStore, MemoryStore, NewAccount};
    use crate::services::{CartService, Identity};
    use musicshop_core::{BuyingType, CartError, Email, OrderError, ProductRef, Quantity};

    fn details() -> CheckoutDetails {
        CheckoutDetails {
            first_name: "Viktor".to_string(),
            last_name: "Tsoi".to_string(),
            phone: "+7 900 000 00 00".to_string(),
            address: String::new(),
            buying_type: BuyingType::SelfPickup,
            comment: String::new(),
            order_date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
        }
    }

    async fn customer_with_cart(store: &MemoryStore, items: u32) -> (Customer, Cart) {
        store.import_catalog(&sample()).await.unwrap();
        let (user, _) = store
            .register(NewAccount {
                email: Email::parse("buyer@example.com").unwrap(),
                password_hash: "hash".to_string(),
                first_name: "Viktor".to_string(),
                last_name: "Tsoi".to_string(),
                phone: String::new(),
                address: String::new(),
            })
            .await
            .unwrap();

        let carts = CartService::new(store);
        let resolved = carts.resolve(&Identity::Authenticated(user.id)).await.unwrap();
        let mut cart = resolved.cart;
        if items > 0 {
            let album = store.offers_of_the_week().await.unwrap()[0].id;
            carts
                .add_item(&mut cart, ProductRef::Album(album), Quantity::new(items).unwrap())
                .await
                .unwrap();
        }
        (resolved.customer.unwrap(), cart)
    }

    #[tokio::test]
    async fn test_place_order_freezes_cart() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 2).await;

        let order = CheckoutService::new(&store)
            .place_order(&customer, &mut cart, details())
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::New);
        assert_eq!(order.cart_id, cart.id());
        assert!(cart.is_in_order());
        assert!(store.active_cart_for_customer(customer.id).await.unwrap().is_none());

        let stored = store.all_carts().await.pop().unwrap();
        assert!(stored.is_in_order());
        assert_eq!(stored.total_items(), 2);
        assert_eq!(stored.version(), cart.version());
    }

    #[tokio::test]
    async fn test_ordered_cart_rejects_further_items() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 2).await;
        CheckoutService::new(&store)
            .place_order(&customer, &mut cart, details())
            .await
            .unwrap();

        let album = store.offers_of_the_week().await.unwrap()[0].id;
        let err = CartService::new(&store)
            .add_item(&mut cart, ProductRef::Album(album), Quantity::new(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(id)) if id == cart.id()));
        assert!(!err.is_conflict());
        assert_eq!(cart.total_items(), 2);
    }

    #[tokio::test]
    async fn test_stale_copy_of_ordered_cart_is_frozen_not_conflict() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 1).await;
        let mut stale = cart.clone();
        CheckoutService::new(&store)
            .place_order(&customer, &mut cart, details())
            .await
            .unwrap();

        let album = store.offers_of_the_week().await.unwrap()[0].id;
        let err = CartService::new(&store)
            .add_item(&mut stale, ProductRef::Album(album), Quantity::new(1).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(_))));
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn test_next_resolve_after_order_is_fresh_cart() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 1).await;
        CheckoutService::new(&store)
            .place_order(&customer, &mut cart, details())
            .await
            .unwrap();

        let next = CartService::new(&store)
            .resolve(&Identity::Authenticated(customer.user_id))
            .await
            .unwrap()
            .cart;
        assert_ne!(next.id(), cart.id());
        assert!(next.is_empty());
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 0).await;

        let err = CheckoutService::new(&store)
            .place_order(&customer, &mut cart, details())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Checkout(CheckoutError::EmptyCart)));
        assert!(!cart.is_in_order());
        assert!(store.active_cart_for_customer(customer.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_invalid_details_leave_cart_active() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 1).await;
        let mut bad = details();
        bad.buying_type = BuyingType::Delivery;

        let err = CheckoutService::new(&store)
            .place_order(&customer, &mut cart, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Checkout(CheckoutError::AddressRequired)));
        assert!(!cart.is_in_order());

        let active = store.active_cart_for_customer(customer.id).await.unwrap().unwrap();
        assert_eq!(active.total_items(), 1);
    }

    #[tokio::test]
    async fn test_frozen_cart_cannot_order_twice() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 1).await;
        let mut stale = cart.clone();
        let service = CheckoutService::new(&store);
        service.place_order(&customer, &mut cart, details()).await.unwrap();

        let err = service
            .place_order(&customer, &mut cart, details())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(_))));

        let err = service
            .place_order(&customer, &mut stale, details())
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(_))));
        assert!(!stale.is_in_order());
        assert_eq!(service.orders_for(&customer).await.unwrap().len(), 1);
        assert!(cart.remove_item(cart.lines()[0].product()).is_err());
    }

    #[tokio::test]
    async fn test_status_moves_forward_only() {
        let store = MemoryStore::new();
        let (customer, mut cart) = customer_with_cart(&store, 1).await;
        let service = CheckoutService::new(&store);
        let order = service.place_order(&customer, &mut cart, details()).await.unwrap();

        let ready = service
            .advance_status(order.id, OrderStatus::Ready)
            .await
            .unwrap();
        assert_eq!(ready.status, OrderStatus::Ready);

        let err = service
            .advance_status(order.id, OrderStatus::InProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Order(OrderError::InvalidTransition { .. })));

        let err = service
            .advance_status(OrderId::new(404), OrderStatus::Completed)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound("order")));

        assert_eq!(service.orders_for(&customer).await.unwrap().len(), 1);
    }
}
