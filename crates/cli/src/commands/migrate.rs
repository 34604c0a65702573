//! Database migrations.
//!
//! Applies `crates/storefront/migrations/` and then creates the
//! tower-sessions table used by the storefront session layer.

use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use super::CliError;

/// Run all migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let store = super::connect().await?;

    info!("Running shop migrations...");
    sqlx::migrate!("../storefront/migrations")
        .run(store.pool())
        .await?;

    info!("Creating session table...");
    PostgresStore::new(store.pool().clone()).migrate().await?;

    info!("Migrations complete!");
    Ok(())
}
