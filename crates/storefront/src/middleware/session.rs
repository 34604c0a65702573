//! Session layer backed by `PostgreSQL`.

use tower_sessions::{
    Expiry, SessionManagerLayer,
    cookie::{SameSite, time::Duration},
};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::StorefrontConfig;
use crate::db::PgStore;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "musicshop_session";

/// Sessions expire after two weeks without a request.
const SESSION_INACTIVITY_DAYS: i64 = 14;

/// Build the session layer.
///
/// The `tower_sessions.session` table is created by the CLI `migrate`
/// command, not here.
#[must_use]
pub fn create_session_layer(
    store: &PgStore,
    config: &StorefrontConfig,
) -> SessionManagerLayer<PostgresStore> {
    SessionManagerLayer::new(PostgresStore::new(store.pool().clone()))
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(Duration::days(SESSION_INACTIVITY_DAYS)))
        .with_secure(config.is_secure())
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
