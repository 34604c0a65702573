//! Status enums for orders.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Order processing status.
///
/// Orders move forward through `New → InProgress → Ready → Completed` and
/// never back.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Just placed by the customer.
    #[default]
    New,
    /// Being assembled by the shop.
    InProgress,
    /// Ready for pickup or dispatch.
    Ready,
    /// Handed over to the customer.
    Completed,
}

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [Self; 4] = [Self::New, Self::InProgress, Self::Ready, Self::Completed];

    /// The status that follows this one, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::New => Some(Self::InProgress),
            Self::InProgress => Some(Self::Ready),
            Self::Ready => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Whether an order in this status may move to `target`.
    #[must_use]
    pub fn can_advance_to(self, target: Self) -> bool {
        target > self
    }

    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In progress",
            Self::Ready => "Ready",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Ready => "ready",
            Self::Completed => "completed",
        })
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "in_progress" => Ok(Self::InProgress),
            "ready" => Ok(Self::Ready),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.buying_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BuyingType {
    /// Picked up at the shop.
    #[default]
    SelfPickup,
    /// Delivered to the customer's address.
    Delivery,
}

impl BuyingType {
    /// Human-readable label for templates.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::SelfPickup => "Self pickup",
            Self::Delivery => "Delivery",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_walks_the_lifecycle() {
        assert_eq!(OrderStatus::New.next(), Some(OrderStatus::InProgress));
        assert_eq!(OrderStatus::InProgress.next(), Some(OrderStatus::Ready));
        assert_eq!(OrderStatus::Ready.next(), Some(OrderStatus::Completed));
        assert_eq!(OrderStatus::Completed.next(), None);
    }

    #[test]
    fn test_can_advance_only_forward() {
        assert!(OrderStatus::New.can_advance_to(OrderStatus::Ready));
        assert!(!OrderStatus::Ready.can_advance_to(OrderStatus::New));
        assert!(!OrderStatus::Ready.can_advance_to(OrderStatus::Ready));
    }

    #[test]
    fn test_display_from_str_agree() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_buying_type_serde() {
        let json = serde_json::to_string(&BuyingType::SelfPickup).unwrap_or_default();
        assert_eq!(json, "\"self_pickup\"");
    }
}
