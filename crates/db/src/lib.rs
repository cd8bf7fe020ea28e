//! Read-only access to the order store.
//!
//! The service only ever issues SELECTs. Orders are fetched live on every
//! request and never cached.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

pub mod repositories;
pub mod store;

pub use store::{OrderStore, PgOrderStore, StoreProbe};

pub type DbPool = sqlx::PgPool;

/// Pool sizing, taken from `DB_POOL_MIN` / `DB_POOL_MAX`.
#[derive(Debug, Clone, Copy)]
pub struct PoolSize {
    pub min: u32,
    pub max: u32,
}

impl Default for PoolSize {
    fn default() -> Self {
        Self { min: 2, max: 10 }
    }
}

/// Create a connection pool from a database URL.
///
/// Connections are opened lazily so the server starts even when the
/// database is down; the first query reports the failure instead.
pub fn create_pool(database_url: &str, size: PoolSize) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(size.min)
        .max_connections(size.max.max(size.min).max(1))
        .acquire_timeout(Duration::from_secs(10))
        .connect_lazy(database_url)
}

/// `SELECT 1` round trip.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
