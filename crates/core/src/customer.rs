//! Users, customers, and their notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AlbumId, CustomerId, Email, NotificationId, UserId};

/// A login identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// "First Last", or the email when no name was given.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.email.to_string()
        } else {
            full.to_string()
        }
    }
}

/// The buyer profile attached to a user.
///
/// Created on registration, or with empty profile fields the first time an
/// authenticated user touches a cart. Deactivated through `is_active`, never
/// deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: String,
    pub address: String,
    pub is_active: bool,
}

/// A message for one customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: CustomerId,
    /// The album the message is about; cleared if the album is deleted.
    pub album_id: Option<AlbumId>,
    pub text: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        User {
            id: UserId::new(1),
            email: Email::parse("fan@example.com").unwrap(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(user("Viktor", "Tsoi").display_name(), "Viktor Tsoi");
        assert_eq!(user("Viktor", "").display_name(), "Viktor");
        assert_eq!(user("", "").display_name(), "fan@example.com");
    }
}
