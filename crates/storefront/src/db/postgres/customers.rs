//! Users and customers.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};

use musicshop_core::{Customer, CustomerId, Email, User, UserId};

use super::PgStore;
use crate::db::{CustomerStore, NewAccount, RepositoryError};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    first_name: String,
    last_name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            email,
            first_name: row.first_name,
            last_name: row.last_name,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: CustomerId,
    user_id: UserId,
    phone: String,
    address: String,
    is_active: bool,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            phone: row.phone,
            address: row.address,
            is_active: row.is_active,
        }
    }
}

impl CustomerStore for PgStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, first_name, last_name, created_at
            FROM shop.app_user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r"
            SELECT id, email, first_name, last_name, created_at, password_hash
            FROM shop.app_user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some((User::try_from(row.user)?, row.password_hash))),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn register(&self, account: NewAccount) -> Result<(User, Customer), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let user_row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO shop.app_user (email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, first_name, last_name, created_at
            ",
        )
        .bind(account.email.as_str())
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| RepositoryError::from_unique_violation(e, "email"))?;
        let user = User::try_from(user_row)?;

        let customer = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO shop.customer (user_id, phone, address)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, phone, address, is_active
            ",
        )
        .bind(user.id)
        .bind(&account.phone)
        .bind(&account.address)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(user_id = %user.id, "Registered account");
        Ok((user, customer.into()))
    }

    async fn customer(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, user_id, phone, address, is_active FROM shop.customer WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(row.map(Customer::from))
    }

    async fn ensure_customer(&self, user: UserId) -> Result<(Customer, bool), RepositoryError> {
        let created = sqlx::query_as::<_, CustomerRow>(
            r"
            INSERT INTO shop.customer (user_id) VALUES ($1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, user_id, phone, address, is_active
            ",
        )
        .bind(user)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        if let Some(row) = created {
            debug!(%user, customer_id = %row.id, "Provisioned customer");
            return Ok((row.into(), true));
        }

        let existing = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, user_id, phone, address, is_active FROM shop.customer WHERE user_id = $1",
        )
        .bind(user)
        .fetch_one(self.pool())
        .await?;
        Ok((existing.into(), false))
    }
}
