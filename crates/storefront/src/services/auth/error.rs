//! Errors from registration and login.

use thiserror::Error;

use musicshop_core::EmailError;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Unknown email or wrong password. The two are reported the same way.
    #[error("email or password is incorrect")]
    InvalidCredentials,

    /// A session refers to a user that no longer exists.
    #[error("no such account")]
    UserNotFound,

    #[error("an account with this email already exists")]
    UserAlreadyExists,

    /// The password was rejected; the message says why.
    #[error("{0}")]
    WeakPassword(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// argon2 could not hash a new password or parse a stored hash.
    #[error("password hashing failed")]
    PasswordHash,
}

impl AuthError {
    /// Whether the visitor can fix this by changing what they typed.
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEmail(_)
                | Self::InvalidCredentials
                | Self::UserAlreadyExists
                | Self::WeakPassword(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors() {
        assert!(AuthError::InvalidCredentials.is_input_error());
        assert!(AuthError::WeakPassword("too short".to_string()).is_input_error());
        assert!(!AuthError::PasswordHash.is_input_error());
        assert!(!AuthError::UserNotFound.is_input_error());
    }

    #[test]
    fn test_weak_password_shows_reason() {
        let err = AuthError::WeakPassword("password must be at least 8 characters".to_string());
        assert_eq!(err.to_string(), "password must be at least 8 characters");
    }
}
