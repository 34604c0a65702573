//! `PostgreSQL` implementation of the storage ports.
//!
//! Queries are plain runtime `sqlx::query_as` calls over `FromRow` row
//! structs; each submodule converts its rows into `musicshop_core` types.

mod carts;
mod catalog;
mod customers;
mod inventory;
mod orders;
mod wishlist;

use sqlx::PgPool;

/// Storage backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for health checks and the session store.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}
