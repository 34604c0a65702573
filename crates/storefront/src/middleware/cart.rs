//! The active-cart extractor.
//!
//! Builds an [`Identity`] from the session, resolves it to the single
//! active cart, and stores any freshly issued anonymous token back in the
//! session so the next request finds the same cart.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use musicshop_core::{Cart, CartToken, Customer};

use super::auth::current_user;
use crate::error::AppError;
use crate::models::session_keys;
use crate::services::{CartService, Identity};
use crate::state::AppState;

/// The request's active cart, resolved before the handler runs.
pub struct ActiveCart {
    pub cart: Cart,
    /// Set for logged-in users.
    pub customer: Option<Customer>,
    pub session: Session,
}

impl FromRequestParts<AppState> for ActiveCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let identity = identity(&session).await;
        let resolved = CartService::new(state.store()).resolve(&identity).await?;

        if let Some(token) = &resolved.issued_token {
            session.insert(session_keys::CART_TOKEN, token).await?;
        }

        Ok(Self {
            cart: resolved.cart,
            customer: resolved.customer,
            session,
        })
    }
}

/// The request's active cart if one already exists.
///
/// Unlike [`ActiveCart`] this never creates an anonymous cart or touches the
/// session, so it suits read-only pages.
pub struct ExistingCart(pub Option<Cart>);

impl FromRequestParts<AppState> for ExistingCart {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let identity = identity(session).await;
        let cart = CartService::new(state.store()).peek(&identity).await?;
        Ok(Self(cart))
    }
}

/// Who the session belongs to. A logged-in user wins over a cart token.
pub async fn identity(session: &Session) -> Identity {
    if let Some(user) = current_user(session).await {
        return Identity::Authenticated(user.id);
    }
    Identity::Anonymous(cart_token(session).await)
}

/// The anonymous cart token stored in `session`, if any.
pub async fn cart_token(session: &Session) -> Option<CartToken> {
    session
        .get::<CartToken>(session_keys::CART_TOKEN)
        .await
        .ok()
        .flatten()
}

/// Drop the anonymous cart token once its cart has been merged.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_cart_token(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CartToken>(session_keys::CART_TOKEN).await?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::models::CurrentUser;
    use musicshop_core::{Email, UserId};

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_fresh_session_is_anonymous_without_token() {
        assert_eq!(identity(&session()).await, Identity::Anonymous(None));
    }

    #[tokio::test]
    async fn test_stored_token_is_used() {
        let session = session();
        let token = CartToken::generate();
        session
            .insert(session_keys::CART_TOKEN, &token)
            .await
            .unwrap();

        assert_eq!(identity(&session).await, Identity::Anonymous(Some(token)));

        clear_cart_token(&session).await.unwrap();
        assert_eq!(cart_token(&session).await, None);
    }

    #[tokio::test]
    async fn test_logged_in_user_wins_over_token() {
        let session = session();
        session
            .insert(session_keys::CART_TOKEN, CartToken::generate())
            .await
            .unwrap();
        let user = CurrentUser {
            id: UserId::new(7),
            email: Email::parse("fan@example.com").unwrap(),
            display_name: "Fan".to_string(),
        };
        session
            .insert(session_keys::CURRENT_USER, &user)
            .await
            .unwrap();

        assert_eq!(
            identity(&session).await,
            Identity::Authenticated(UserId::new(7))
        );
    }
}
