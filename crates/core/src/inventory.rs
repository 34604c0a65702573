//! Stock rules and the restock transition.
//!
//! Storage applies a stock write as one unit: it reads the previous level,
//! writes the new level with `out_of_stock` recomputed by [`is_out_of_stock`],
//! and asks [`StockTransition::is_restock`] whether wish-listers must be
//! notified.

use crate::product::Purchasable;

/// Errors validating a stock level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    #[error("stock cannot be negative, got {0}")]
    Negative(i32),
}

/// Validate a stock level before writing it.
///
/// # Errors
///
/// Returns `StockError::Negative` for levels below zero.
pub const fn validate_stock(stock: i32) -> Result<i32, StockError> {
    if stock < 0 {
        return Err(StockError::Negative(stock));
    }
    Ok(stock)
}

/// The derived `out_of_stock` flag for a stock level.
#[must_use]
pub const fn is_out_of_stock(stock: i32) -> bool {
    stock == 0
}

/// A stock write, seen from before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockTransition {
    pub previous: i32,
    pub current: i32,
}

impl StockTransition {
    #[must_use]
    pub const fn new(previous: i32, current: i32) -> Self {
        Self { previous, current }
    }

    /// The album was out of stock and now is not.
    #[must_use]
    pub const fn is_restock(&self) -> bool {
        is_out_of_stock(self.previous) && !is_out_of_stock(self.current)
    }

    /// The album just sold out.
    #[must_use]
    pub const fn is_sellout(&self) -> bool {
        !is_out_of_stock(self.previous) && is_out_of_stock(self.current)
    }
}

/// Notification text sent to wish-listers when a product is back.
#[must_use]
pub fn restock_message(product: &impl Purchasable) -> String {
    format!("{} is back in stock!", product.display_name())
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::catalog::fixtures;

    #[test]
    fn test_zero_crossing_is_restock() {
        assert!(StockTransition::new(0, 5).is_restock());
        assert!(StockTransition::new(0, 1).is_restock());
    }

    #[test]
    fn test_edits_that_do_not_cross_zero() {
        assert!(!StockTransition::new(5, 3).is_restock());
        assert!(!StockTransition::new(0, 0).is_restock());
        assert!(!StockTransition::new(3, 0).is_restock());
        assert!(StockTransition::new(3, 0).is_sellout());
    }

    #[test]
    fn test_validate_stock() {
        assert_eq!(validate_stock(0), Ok(0));
        assert_eq!(validate_stock(-1), Err(StockError::Negative(-1)));
    }

    #[test]
    fn test_restock_message_names_the_album() {
        let album = fixtures::album(4, Decimal::ONE);
        assert_eq!(restock_message(&album), "Kino - Album 4 is back in stock!");
    }
}
