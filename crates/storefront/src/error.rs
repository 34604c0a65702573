//! Unified error handling with Sentry integration.
//!
//! Route handlers return `Result<T, AppError>`. Server errors are captured
//! to Sentry before responding; client errors carry a short message that is
//! safe to show.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use musicshop_core::{CartError, CheckoutError};

use crate::db::RepositoryError;
use crate::services::{AuthError, ShopError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// A shop operation failed.
    #[error("Shop error: {0}")]
    Shop(#[from] ShopError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Reading or writing the session failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        Self::Shop(ShopError::from(err))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Shop(err) => shop_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::BAD_REQUEST
                }
                AuthError::Repository(err) => repository_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message shown to the client. Internals are never exposed.
    #[must_use]
    pub fn client_message(&self) -> String {
        if self.status().is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Shop(ShopError::Repository(RepositoryError::Conflict(_))) => {
                "The cart changed in another request, please try again".to_string()
            }
            Self::Shop(ShopError::Repository(RepositoryError::NotFound)) => {
                "Not found".to_string()
            }
            Self::Shop(err) => err.to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::UserAlreadyExists => {
                    "An account with this email already exists".to_string()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                _ => "Authentication error".to_string(),
            },
            _ => self.to_string(),
        }
    }
}

fn shop_status(err: &ShopError) -> StatusCode {
    match err {
        ShopError::Cart(CartError::FrozenCart(_)) | ShopError::Order(_) => StatusCode::CONFLICT,
        ShopError::Cart(CartError::ItemNotInCart(_))
        | ShopError::ProductNotFound(_)
        | ShopError::NotFound(_) => StatusCode::NOT_FOUND,
        ShopError::Cart(CartError::Quantity(_))
        | ShopError::Quantity(_)
        | ShopError::Checkout(_)
        | ShopError::Stock(_)
        | ShopError::InvalidSeed(_) => StatusCode::BAD_REQUEST,
        ShopError::Repository(err) => repository_status(err),
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict(_) | RepositoryError::FrozenCart(_) => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::CONFLICT {
            tracing::warn!(error = %self, "Request conflict");
        }

        (status, self.client_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on logout.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a user action.
///
/// Breadcrumbs appear in Sentry reports as the trail leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
