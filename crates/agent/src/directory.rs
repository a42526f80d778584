//! In-memory order directory, the default backing store for demos and
//! tests. The SQL-backed directory lives in `ecomarket-db`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ecomarket_core::chrono::{Duration, NaiveDate};
use ecomarket_core::{
    Item, ItemCategory, LookupError, Order, OrderDirectory, OrderId, OrderStatus,
};
use tokio::sync::RwLock;

#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderDirectory {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
}

impl InMemoryOrderDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: Vec<Order>) -> Self {
        let map = orders.into_iter().map(|order| (order.id.clone(), order)).collect();
        Self { orders: Arc::new(RwLock::new(map)) }
    }

    /// Directory pre-loaded with the demo catalog, with delivery dates
    /// anchored to `today` so window arithmetic stays meaningful.
    pub fn seeded(today: NaiveDate) -> Self {
        Self::with_orders(demo_orders(today))
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }
}

#[async_trait]
impl OrderDirectory for InMemoryOrderDirectory {
    async fn lookup(&self, order_id: &OrderId) -> Result<Option<Order>, LookupError> {
        Ok(self.orders.read().await.get(order_id).cloned())
    }
}

/// Demo orders. Order 99999 is deliberately absent so not-found paths can
/// be exercised.
pub fn demo_orders(today: NaiveDate) -> Vec<Order> {
    vec![
        Order {
            id: OrderId("20001".to_string()),
            status: OrderStatus::InTransit,
            customer: "Camila Rojas".to_string(),
            destination: "Bogotá".to_string(),
            carrier: "Servientrega".to_string(),
            estimated_delivery: today + Duration::days(2),
            delivered_at: None,
            items: vec![Item {
                name: "Paquete de Almojabanas".to_string(),
                category: ItemCategory::Perishable,
                return_allowed: false,
            }],
        },
        Order {
            id: OrderId("20002".to_string()),
            status: OrderStatus::Delivered,
            customer: "Andrés Pardo".to_string(),
            destination: "Medellín".to_string(),
            carrier: "Coordinadora".to_string(),
            estimated_delivery: today - Duration::days(10),
            delivered_at: Some(today - Duration::days(10)),
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
        },
        Order {
            id: OrderId("20003".to_string()),
            status: OrderStatus::InTransit,
            customer: "Lucía Méndez".to_string(),
            destination: "Cali".to_string(),
            carrier: "Interrapidisimo".to_string(),
            estimated_delivery: today + Duration::days(4),
            delivered_at: None,
            items: vec![Item {
                name: "Laptop".to_string(),
                category: ItemCategory::Other,
                return_allowed: true,
            }],
        },
        Order {
            id: OrderId("20007".to_string()),
            status: OrderStatus::Delivered,
            customer: "Jorge Salazar".to_string(),
            destination: "Barranquilla".to_string(),
            carrier: "Coordinadora".to_string(),
            estimated_delivery: today - Duration::days(5),
            delivered_at: Some(today - Duration::days(5)),
            items: vec![Item {
                name: "Juego de cubiertos".to_string(),
                category: ItemCategory::Other,
                return_allowed: true,
            }],
        },
    ]
}

#[cfg(test)]
mod tests {
    use ecomarket_core::chrono::NaiveDate;
    use ecomarket_core::{OrderDirectory, OrderId, OrderStatus};

    use super::InMemoryOrderDirectory;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 15).expect("valid date")
    }

    #[tokio::test]
    async fn seeded_directory_resolves_known_orders() {
        let directory = InMemoryOrderDirectory::seeded(today());

        let order = directory
            .lookup(&OrderId("20001".to_string()))
            .await
            .expect("lookup should not fail")
            .expect("order 20001 should exist");

        assert_eq!(order.status, OrderStatus::InTransit);
        assert_eq!(order.items[0].name, "Paquete de Almojabanas");
    }

    #[tokio::test]
    async fn unknown_order_is_not_found_not_an_error() {
        let directory = InMemoryOrderDirectory::seeded(today());

        let missing = directory
            .lookup(&OrderId("99999".to_string()))
            .await
            .expect("lookup should not fail");

        assert!(missing.is_none());
    }
}
