//! Errors from shop operations.

use thiserror::Error;

use musicshop_core::{
    CartError, CheckoutError, OrderError, ProductRef, QuantityError, StockError,
};

use crate::db::RepositoryError;

/// Errors that can occur in the cart, checkout, catalog, and inventory
/// services.
#[derive(Debug, Error)]
pub enum ShopError {
    /// A cart rule was violated.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Quantity input failed validation before reaching the cart.
    #[error(transparent)]
    Quantity(#[from] QuantityError),

    /// Checkout details or an empty cart rejected the order.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// An order status change was not allowed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// A stock level was rejected.
    #[error(transparent)]
    Stock(#[from] StockError),

    /// The referenced product does not exist.
    #[error("product {0} not found")]
    ProductNotFound(ProductRef),

    /// A page-level lookup (artist, genre, album, order) found nothing.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// A catalog import failed validation.
    #[error("invalid catalog: {}", .0.join("; "))]
    InvalidSeed(Vec<String>),

    /// Storage failed or reported a conflict.
    #[error(transparent)]
    Repository(RepositoryError),
}

/// A cart that storage reports as ordered is the same rule violation as one
/// the caller already knew was frozen.
impl From<RepositoryError> for ShopError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::FrozenCart(cart) => Self::Cart(CartError::FrozenCart(cart)),
            other => Self::Repository(other),
        }
    }
}

impl ShopError {
    /// Whether this error came from a lost concurrent update.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Repository(RepositoryError::Conflict(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use musicshop_core::CartId;

    #[test]
    fn test_stored_frozen_cart_is_a_cart_error() {
        let err = ShopError::from(RepositoryError::FrozenCart(CartId::new(9)));
        assert!(matches!(err, ShopError::Cart(CartError::FrozenCart(id)) if id == CartId::new(9)));
        assert!(!err.is_conflict());
    }

    #[test]
    fn test_version_mismatch_stays_a_conflict() {
        let err = ShopError::from(RepositoryError::Conflict("cart 9 changed".to_string()));
        assert!(err.is_conflict());
    }
}
