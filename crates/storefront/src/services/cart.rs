//! Cart identity resolution and line operations.
//!
//! Every cart-touching request starts with [`CartService::resolve`], which
//! turns the visitor's [`Identity`] into exactly one active cart. Anonymous
//! visitors are identified by a [`CartToken`] kept in their session; a missing
//! or stale token is replaced rather than reported.

use tracing::{debug, info, instrument};

use musicshop_core::{
    Cart, CartLine, CartOwner, CartToken, Customer, Product, ProductRef, Quantity, UserId,
};

use super::ShopError;
use crate::db::{CartStore, CatalogStore, CustomerStore, RepositoryError};

/// Who is asking for a cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// A logged-in user.
    Authenticated(UserId),
    /// A visitor with the cart token from their session, if any.
    Anonymous(Option<CartToken>),
}

/// The outcome of [`CartService::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedCart {
    /// The identity's only active cart.
    pub cart: Cart,
    /// The customer, for authenticated identities.
    pub customer: Option<Customer>,
    /// A token minted during resolution that the caller must store in the
    /// session.
    pub issued_token: Option<CartToken>,
}

/// Cart operations over a store.
pub struct CartService<'a, S> {
    store: &'a S,
}

impl<'a, S> CartService<'a, S>
where
    S: CartStore + CustomerStore + CatalogStore,
{
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Find or create the active cart for `identity`.
    ///
    /// Authenticated users get a customer profile on first use. Anonymous
    /// visitors without a usable token get a fresh token and cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if storage fails.
    #[instrument(skip(self, identity), fields(authenticated = matches!(identity, Identity::Authenticated(_))))]
    pub async fn resolve(&self, identity: &Identity) -> Result<ResolvedCart, ShopError> {
        match identity {
            Identity::Authenticated(user) => {
                let customer = self.customer_for(*user).await?;
                let cart = self.customer_cart(&customer).await?;
                Ok(ResolvedCart {
                    cart,
                    customer: Some(customer),
                    issued_token: None,
                })
            }
            Identity::Anonymous(token) => {
                if let Some(token) = token
                    && let Some(cart) = self.store.active_cart_for_token(token).await?
                {
                    return Ok(ResolvedCart {
                        cart,
                        customer: None,
                        issued_token: None,
                    });
                }

                let token = CartToken::generate();
                let cart = self
                    .store
                    .create_cart(&CartOwner::Anonymous(token.clone()))
                    .await?;
                debug!(cart_id = %cart.id(), "Issued anonymous cart");
                Ok(ResolvedCart {
                    cart,
                    customer: None,
                    issued_token: Some(token),
                })
            }
        }
    }

    /// The active cart for `identity` without creating an anonymous one.
    ///
    /// Read-only pages use this so a visitor who never adds anything does
    /// not leave a cart behind. Authenticated users resolve as usual.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Repository` if storage fails.
    pub async fn peek(&self, identity: &Identity) -> Result<Option<Cart>, ShopError> {
        match identity {
            Identity::Authenticated(_) => Ok(Some(self.resolve(identity).await?.cart)),
            Identity::Anonymous(Some(token)) => Ok(self.store.active_cart_for_token(token).await?),
            Identity::Anonymous(None) => Ok(None),
        }
    }

    /// Move the anonymous cart behind `token` into the user's cart.
    ///
    /// Lines for the same product add their quantities. The anonymous cart
    /// is deleted in the same storage step. An unknown token leaves the
    /// customer's cart untouched.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Cart` if a merged quantity overflows and
    /// `ShopError::Repository` if storage fails or either cart changed
    /// concurrently.
    #[instrument(skip(self, token), fields(%user))]
    pub async fn merge_anonymous(&self, user: UserId, token: &CartToken) -> Result<Cart, ShopError> {
        let customer = self.customer_for(user).await?;
        let target = self.customer_cart(&customer).await?;

        let Some(anonymous) = self.store.active_cart_for_token(token).await? else {
            return Ok(target);
        };

        let mut merged = target;
        merged.absorb(&anonymous)?;
        self.store.save_merged_cart(&mut merged, &anonymous).await?;

        info!(
            cart_id = %merged.id(),
            lines = anonymous.lines().len(),
            "Merged anonymous cart into customer cart"
        );
        Ok(merged)
    }

    /// Load the product a reference points at.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ProductNotFound` for dangling references.
    pub async fn resolve_product(&self, product: ProductRef) -> Result<Product, ShopError> {
        match product {
            ProductRef::Album(id) => self
                .store
                .album(id)
                .await?
                .map(Product::Album)
                .ok_or(ShopError::ProductNotFound(product)),
        }
    }

    /// Add `quantity` of `product` and persist the cart.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::ProductNotFound`, `ShopError::Cart` for frozen
    /// carts or quantity overflow, and `ShopError::Repository` on storage
    /// failure or a concurrent change.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id(), %product, quantity = quantity.get()))]
    pub async fn add_item(
        &self,
        cart: &mut Cart,
        product: ProductRef,
        quantity: Quantity,
    ) -> Result<(), ShopError> {
        let product = self.resolve_product(product).await?;
        cart.add_item(&product, quantity)?;
        self.store.save_cart(cart).await?;
        Ok(())
    }

    /// Set the quantity of a line already in the cart.
    ///
    /// Returns `false` without writing when the quantity is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Cart` if the product is not in the cart or the
    /// cart is frozen, plus the errors of [`Self::add_item`].
    #[instrument(skip(self, cart), fields(cart_id = %cart.id(), %product, quantity = quantity.get()))]
    pub async fn set_quantity(
        &self,
        cart: &mut Cart,
        product: ProductRef,
        quantity: Quantity,
    ) -> Result<bool, ShopError> {
        let product = self.resolve_product(product).await?;
        let changed = cart.set_quantity(&product, quantity)?;
        if changed {
            self.store.save_cart(cart).await?;
        }
        Ok(changed)
    }

    /// Remove a product's line.
    ///
    /// Works for products that have since left the catalog.
    ///
    /// # Errors
    ///
    /// Returns `ShopError::Cart` if the product is not in the cart or the
    /// cart is frozen, and `ShopError::Repository` on storage failure.
    #[instrument(skip(self, cart), fields(cart_id = %cart.id(), %product))]
    pub async fn remove_item(
        &self,
        cart: &mut Cart,
        product: ProductRef,
    ) -> Result<CartLine, ShopError> {
        let removed = cart.remove_item(product)?;
        self.store.save_cart(cart).await?;
        Ok(removed)
    }

    async fn customer_for(&self, user: UserId) -> Result<Customer, ShopError> {
        let (customer, created) = self.store.ensure_customer(user).await?;
        if created {
            info!(customer_id = %customer.id, "Provisioned customer profile");
        }
        Ok(customer)
    }

    /// Find-before-create; a lost creation race re-reads the winner's cart.
    async fn customer_cart(&self, customer: &Customer) -> Result<Cart, ShopError> {
        if let Some(cart) = self.store.active_cart_for_customer(customer.id).await? {
            return Ok(cart);
        }
        match self
            .store
            .create_cart(&CartOwner::Customer(customer.id))
            .await
        {
            Ok(cart) => Ok(cart),
            Err(RepositoryError::Conflict(reason)) => self
                .store
                .active_cart_for_customer(customer.id)
                .await?
                .ok_or_else(|| ShopError::from(RepositoryError::Conflict(reason))),
            Err(e) => Err(e.into()),
        }
    }
}
