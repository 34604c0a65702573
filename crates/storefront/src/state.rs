//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use musicshop_core::{CurrencyCode, Price};
use rust_decimal::Decimal;

use crate::config::StorefrontConfig;
use crate::db::PgStore;

/// Application state shared across all handlers.
///
/// Cheap to clone; everything lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: PgStore,
}

impl AppState {
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store: PgStore::new(pool),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// The `PostgreSQL`-backed store that services run against.
    #[must_use]
    pub fn store(&self) -> &PgStore {
        &self.inner.store
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        self.inner.store.pool()
    }

    #[must_use]
    pub fn currency(&self) -> CurrencyCode {
        self.inner.config.currency
    }

    /// Format an amount in the shop currency.
    #[must_use]
    pub fn price(&self, amount: Decimal) -> String {
        Price::new(amount, self.currency()).display()
    }
}
