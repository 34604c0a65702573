//! Authentication service.
//!
//! Email and password accounts. Registration creates the user and its
//! customer profile together; passwords are hashed with Argon2id.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::{info, instrument};

use musicshop_core::{Customer, Email, User, UserId};

use crate::db::{CustomerStore, NewAccount, RepositoryError};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form input.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub address: String,
}

/// Authentication service.
pub struct AuthService<'a, S> {
    store: &'a S,
}

impl<'a, S: CustomerStore> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Register a new account with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, registration))]
    pub async fn register(&self, registration: Registration) -> Result<(User, Customer), AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let (user, customer) = self
            .store
            .register(NewAccount {
                email,
                password_hash,
                first_name: registration.first_name.trim().to_string(),
                last_name: registration.last_name.trim().to_string(),
                phone: registration.phone.trim().to_string(),
                address: registration.address.trim().to_string(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        info!(user_id = %user.id, "Account registered");
        Ok((user, customer))
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, email, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .store
            .user_credentials(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.store
            .user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn registration() -> Registration {
        Registration {
            email: "Listener@Example.com".to_string(),
            password: "correct horse".to_string(),
            first_name: " Boris ".to_string(),
            last_name: "Grebenshchikov".to_string(),
            phone: "+7 812 000 00 00".to_string(),
            address: "Nevsky 1".to_string(),
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("secret-password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("secret-password", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[tokio::test]
    async fn test_register_creates_customer_with_profile() {
        let store = MemoryStore::new();
        let (user, customer) = AuthService::new(&store)
            .register(registration())
            .await
            .unwrap();

        assert_eq!(user.email.as_str(), "listener@example.com");
        assert_eq!(user.first_name, "Boris");
        assert_eq!(customer.user_id, user.id);
        assert_eq!(customer.address, "Nevsky 1");
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryStore::new();
        let service = AuthService::new(&store);
        service.register(registration()).await.unwrap();

        let mut again = registration();
        again.email = "listener@example.com".to_string();
        assert!(matches!(
            service.register(again).await,
            Err(AuthError::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_login() {
        let store = MemoryStore::new();
        let service = AuthService::new(&store);
        let (user, _) = service.register(registration()).await.unwrap();

        let logged_in = service
            .login("listener@example.com", "correct horse")
            .await
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        for (email, password) in [
            ("listener@example.com", "wrong horse"),
            ("nobody@example.com", "correct horse"),
            ("not-an-email", "correct horse"),
        ] {
            assert!(matches!(
                service.login(email, password).await,
                Err(AuthError::InvalidCredentials)
            ));
        }
    }
}
