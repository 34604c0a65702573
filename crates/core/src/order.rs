//! Checkout details and orders.
//!
//! An [`Order`] is an immutable snapshot of the buyer's contact details that
//! points at the cart it froze. Only `status` changes afterwards, and only
//! forward.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BuyingType, CartId, CustomerId, OrderId, OrderStatus};

/// Errors validating a checkout.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("an address is required for delivery")]
    AddressRequired,
    #[error("the cart is empty")]
    EmptyCart,
}

/// Errors changing an existing order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

/// Buyer-supplied fields of the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub buying_type: BuyingType,
    pub comment: String,
    /// Date the customer wants to receive the order.
    pub order_date: NaiveDate,
}

impl CheckoutDetails {
    /// Trim every text field in place.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.first_name,
            &mut self.last_name,
            &mut self.phone,
            &mut self.address,
            &mut self.comment,
        ] {
            *field = field.trim().to_string();
        }
        self
    }

    /// Check the fields an order cannot do without.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingField` for a blank name or phone and
    /// `CheckoutError::AddressRequired` for a delivery without an address.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.first_name.trim().is_empty() {
            return Err(CheckoutError::MissingField("first name"));
        }
        if self.last_name.trim().is_empty() {
            return Err(CheckoutError::MissingField("last name"));
        }
        if self.phone.trim().is_empty() {
            return Err(CheckoutError::MissingField("phone"));
        }
        if self.buying_type == BuyingType::Delivery && self.address.trim().is_empty() {
            return Err(CheckoutError::AddressRequired);
        }
        Ok(())
    }
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub cart_id: CartId,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
    pub buying_type: BuyingType,
    pub comment: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub order_date: NaiveDate,
}

impl Order {
    /// Move the order to a later status.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidTransition` unless `target` comes after
    /// the current status.
    pub fn advance_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_advance_to(target) {
            return Err(OrderError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn details(buying_type: BuyingType, address: &str) -> CheckoutDetails {
        CheckoutDetails {
            first_name: " Viktor ".to_string(),
            last_name: "Tsoi".to_string(),
            phone: "+7 900 000 00 00".to_string(),
            address: address.to_string(),
            buying_type,
            comment: String::new(),
            order_date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
        }
    }

    fn order(status: OrderStatus) -> Order {
        let d = details(BuyingType::SelfPickup, "");
        Order {
            id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            cart_id: CartId::new(1),
            first_name: d.first_name,
            last_name: d.last_name,
            phone: d.phone,
            address: d.address,
            buying_type: d.buying_type,
            comment: d.comment,
            status,
            created_at: Utc::now(),
            order_date: d.order_date,
        }
    }

    #[test]
    fn test_pickup_needs_no_address() {
        assert_eq!(details(BuyingType::SelfPickup, "").validate(), Ok(()));
    }

    #[test]
    fn test_delivery_needs_address() {
        assert_eq!(
            details(BuyingType::Delivery, "   ").validate(),
            Err(CheckoutError::AddressRequired)
        );
        assert_eq!(
            details(BuyingType::Delivery, "Nevsky 1").validate(),
            Ok(())
        );
    }

    #[test]
    fn test_blank_phone_is_rejected() {
        let mut d = details(BuyingType::SelfPickup, "");
        d.phone = " ".to_string();
        assert_eq!(d.validate(), Err(CheckoutError::MissingField("phone")));
    }

    #[test]
    fn test_normalized_trims() {
        let d = details(BuyingType::SelfPickup, "").normalized();
        assert_eq!(d.first_name, "Viktor");
    }

    #[test]
    fn test_advance_forward_only() {
        let mut order = order(OrderStatus::New);
        order.advance_to(OrderStatus::InProgress).unwrap();
        order.advance_to(OrderStatus::Completed).unwrap();
        assert_eq!(
            order.advance_to(OrderStatus::Ready),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Ready,
            })
        );
        assert_eq!(order.status, OrderStatus::Completed);
    }
}
