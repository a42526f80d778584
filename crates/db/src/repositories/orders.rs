use async_trait::async_trait;
use chrono::NaiveDate;
use ecomarket_core::{Item, Order, OrderDirectory, OrderId, LookupError};
use sqlx::Row;

use super::RepositoryError;
use crate::connection::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Order directory backed by sqlite. Writes go through `save`, which
/// replaces the order and its line items atomically.
pub struct SqlOrderDirectory {
    pool: DbPool,
}

impl SqlOrderDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO orders (id, status, customer, destination, carrier, \
             estimated_delivery, delivered_at) VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET status = excluded.status, \
             customer = excluded.customer, destination = excluded.destination, \
             carrier = excluded.carrier, estimated_delivery = excluded.estimated_delivery, \
             delivered_at = excluded.delivered_at",
        )
        .bind(&order.id.0)
        .bind(order.status.as_str())
        .bind(&order.customer)
        .bind(&order.destination)
        .bind(&order.carrier)
        .bind(order.estimated_delivery.format(DATE_FORMAT).to_string())
        .bind(order.delivered_at.map(|date| date.format(DATE_FORMAT).to_string()))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM order_items WHERE order_id = ?")
            .bind(&order.id.0)
            .execute(&mut *tx)
            .await?;

        for (position, item) in order.items.iter().enumerate() {
            sqlx::query(
                "INSERT INTO order_items (order_id, position, name, category, return_allowed) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(&order.id.0)
            .bind(position as i64)
            .bind(&item.name)
            .bind(item.category.as_str())
            .bind(item.return_allowed)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn fetch(&self, order_id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query(
            "SELECT status, customer, destination, carrier, estimated_delivery, delivered_at \
             FROM orders WHERE id = ?",
        )
        .bind(&order_id.0)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.get("status");
        let status = status.parse().map_err(RepositoryError::Decode)?;
        let estimated_delivery = parse_date(&row.get::<String, _>("estimated_delivery"))?;
        let delivered_at = row
            .get::<Option<String>, _>("delivered_at")
            .map(|raw| parse_date(&raw))
            .transpose()?;

        let item_rows = sqlx::query(
            "SELECT name, category, return_allowed FROM order_items \
             WHERE order_id = ? ORDER BY position",
        )
        .bind(&order_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item_row in item_rows {
            let category: String = item_row.get("category");
            items.push(Item {
                name: item_row.get("name"),
                category: category.parse().map_err(RepositoryError::Decode)?,
                return_allowed: item_row.get("return_allowed"),
            });
        }

        Ok(Some(Order {
            id: order_id.clone(),
            status,
            customer: row.get("customer"),
            destination: row.get("destination"),
            carrier: row.get("carrier"),
            estimated_delivery,
            delivered_at,
            items,
        }))
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|error| RepositoryError::Decode(format!("bad date `{raw}`: {error}")))
}

#[async_trait]
impl OrderDirectory for SqlOrderDirectory {
    async fn lookup(&self, order_id: &OrderId) -> Result<Option<Order>, LookupError> {
        self.fetch(order_id).await.map_err(|error| LookupError::Unavailable(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use ecomarket_core::{Item, ItemCategory, Order, OrderDirectory, OrderId, OrderStatus};

    use crate::connection::connect_with_settings;
    use crate::schema::ensure_schema;

    use super::SqlOrderDirectory;

    async fn directory() -> SqlOrderDirectory {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory sqlite should connect");
        ensure_schema(&pool).await.expect("schema should apply");
        SqlOrderDirectory::new(pool)
    }

    fn sample_order() -> Order {
        Order {
            id: OrderId("20002".to_string()),
            status: OrderStatus::Delivered,
            customer: "Andrés Pardo".to_string(),
            destination: "Medellín".to_string(),
            carrier: "Coordinadora".to_string(),
            estimated_delivery: NaiveDate::from_ymd_opt(2026, 3, 5).expect("valid date"),
            delivered_at: Some(NaiveDate::from_ymd_opt(2026, 3, 5).expect("valid date")),
            items: vec![
                Item {
                    name: "Juego de cubiertos".to_string(),
                    category: ItemCategory::Other,
                    return_allowed: true,
                },
                Item {
                    name: "Yogur griego".to_string(),
                    category: ItemCategory::Perishable,
                    return_allowed: false,
                },
            ],
        }
    }

    #[tokio::test]
    async fn save_then_lookup_preserves_the_order() {
        let directory = directory().await;
        let order = sample_order();

        directory.save(&order).await.expect("save should succeed");

        let loaded = directory
            .lookup(&order.id)
            .await
            .expect("lookup should not fail")
            .expect("order should exist");
        assert_eq!(loaded, order);
    }

    #[tokio::test]
    async fn save_replaces_line_items() {
        let directory = directory().await;
        let mut order = sample_order();
        directory.save(&order).await.expect("first save should succeed");

        order.items.truncate(1);
        directory.save(&order).await.expect("second save should succeed");

        let loaded = directory
            .fetch(&order.id)
            .await
            .expect("fetch should not fail")
            .expect("order should exist");
        assert_eq!(loaded.items.len(), 1);
    }

    #[tokio::test]
    async fn missing_order_is_none() {
        let directory = directory().await;
        let missing = directory
            .lookup(&OrderId("99999".to_string()))
            .await
            .expect("lookup should not fail");
        assert!(missing.is_none());
    }
}
