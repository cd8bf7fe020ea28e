//! Repository for the `orders` table (SELECT only).

use beacon_core::order_validation::OrderRecord;
use sqlx::PgPool;

/// Order columns, in the order they are reported back to callers.
const COLUMNS: &str = "o.order_id, o.order_number, o.customer_id, o.order_date, \
     o.delivery_address, o.order_status, o.total_amount, o.location_code, o.created_date";

/// Customer columns appended when the customers join is enabled.
const CUSTOMER_COLUMNS: &str =
    "c.customer_name, c.email AS customer_email, c.phone AS customer_phone";

/// Provides read access to orders.
pub struct OrderRepo;

impl OrderRepo {
    /// Build the lookup statement. Both identifiers are bind parameters.
    pub fn lookup_sql(join_customers: bool) -> String {
        let (columns, join) = if join_customers {
            (
                format!("{COLUMNS}, {CUSTOMER_COLUMNS}"),
                " LEFT JOIN customers c ON c.customer_id = o.customer_id",
            )
        } else {
            (COLUMNS.to_string(), "")
        };
        // row_to_json keeps the select-list order, which becomes the
        // order of the record's keys.
        format!(
            "SELECT row_to_json(t)::text FROM ( \
                 SELECT {columns} FROM orders o{join} \
                 WHERE o.order_number = $1 AND o.location_code = $2 \
                 LIMIT 1 \
             ) t"
        )
    }

    /// Fetch the single order matching both identifiers.
    pub async fn find(
        pool: &PgPool,
        order_number: &str,
        location_code: &str,
        join_customers: bool,
    ) -> Result<Option<OrderRecord>, sqlx::Error> {
        let query = Self::lookup_sql(join_customers);
        let row = sqlx::query_scalar::<_, String>(&query)
            .bind(order_number)
            .bind(location_code)
            .fetch_optional(pool)
            .await?;

        row.map(|json| {
            serde_json::from_str::<OrderRecord>(&json).map_err(|e| sqlx::Error::Decode(Box::new(e)))
        })
        .transpose()
    }

    /// Check that the orders table can be read.
    pub async fn probe_table(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM (SELECT 1 FROM orders LIMIT 1) t")
            .fetch_one(pool)
            .await
    }
}
