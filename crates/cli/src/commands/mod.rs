//! CLI command implementations.

pub mod manage;
pub mod migrate;
pub mod seed;

use musicshop_storefront::db::{self, PgStore};
use musicshop_storefront::services::ShopError;
use secrecy::SecretString;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection or query error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed.
    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// The input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// The input file could not be read.
    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),

    /// The input file is not valid YAML for a catalog.
    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The catalog parsed but failed validation.
    #[error("{0} validation errors found")]
    InvalidCatalog(usize),

    /// A shop operation was rejected.
    #[error(transparent)]
    Shop(#[from] ShopError),
}

/// Connect to the shop database named by the environment.
pub(crate) async fn connect() -> Result<PgStore, CliError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("MUSICSHOP_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("MUSICSHOP_DATABASE_URL"))?;

    let pool = db::create_pool(&database_url).await?;
    tracing::info!("Connected to database");
    Ok(PgStore::new(pool))
}

#[cfg(test)]
mod tests {
    use super::*;
    use musicshop_core::StockError;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            CliError::MissingEnvVar("MUSICSHOP_DATABASE_URL").to_string(),
            "Missing environment variable: MUSICSHOP_DATABASE_URL"
        );
        assert_eq!(CliError::InvalidCatalog(3).to_string(), "3 validation errors found");
    }

    #[test]
    fn test_shop_errors_pass_through() {
        let err = CliError::from(ShopError::Stock(StockError::Negative(-1)));
        assert!(matches!(err, CliError::Shop(ShopError::Stock(_))));
        assert_eq!(err.to_string(), ShopError::Stock(StockError::Negative(-1)).to_string());
    }
}
