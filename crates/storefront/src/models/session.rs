//! Types stored in the session.

use serde::{Deserialize, Serialize};

use musicshop_core::{Email, User, UserId};

/// Session-stored user identity.
///
/// Just enough to identify the logged-in user and greet them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: UserId,
    pub email: Email,
    pub display_name: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// The logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Token of the anonymous visitor's cart.
    pub const CART_TOKEN: &str = "cart_token";
}
