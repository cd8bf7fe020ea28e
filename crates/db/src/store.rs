//! The [`OrderStore`] seam between the order service and the database.

use async_trait::async_trait;
use beacon_core::order_validation::OrderRecord;
use serde::Serialize;

use crate::repositories::OrderRepo;
use crate::DbPool;

/// Result of probing the store: connection first, then table access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreProbe {
    pub message: String,
    pub orders_table_accessible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders_table_error: Option<String>,
}

/// Source of order rows.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// The single order matching both identifiers, if any.
    async fn find_order(
        &self,
        order_number: &str,
        location_code: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error>;

    /// Connection check. `Err` only when the store is unreachable; an
    /// unreadable orders table is reported inside the probe.
    async fn probe(&self) -> Result<StoreProbe, sqlx::Error>;
}

/// [`OrderStore`] backed by a Postgres pool.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: DbPool,
    join_customers: bool,
}

impl PgOrderStore {
    pub fn new(pool: DbPool, join_customers: bool) -> Self {
        Self {
            pool,
            join_customers,
        }
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn find_order(
        &self,
        order_number: &str,
        location_code: &str,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        OrderRepo::find(&self.pool, order_number, location_code, self.join_customers).await
    }

    async fn probe(&self) -> Result<StoreProbe, sqlx::Error> {
        crate::health_check(&self.pool).await?;

        match OrderRepo::probe_table(&self.pool).await {
            Ok(_) => Ok(StoreProbe {
                message: "Database connection and orders table access successful".to_string(),
                orders_table_accessible: true,
                orders_table_error: None,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Orders table is not accessible");
                Ok(StoreProbe {
                    message: "Database connection successful but orders table inaccessible"
                        .to_string(),
                    orders_table_accessible: false,
                    orders_table_error: Some(e.to_string()),
                })
            }
        }
    }
}
