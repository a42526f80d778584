//! Canonical demo dataset and its verification contract.
//!
//! The seeds mirror the orders the assistant is demonstrated against:
//! one in-transit perishable order, one delivered order inside the return
//! window, one in-transit electronics order, and one recently delivered
//! order. Delivery dates are anchored to the seed day so window arithmetic
//! stays meaningful no matter when the dataset is loaded.

use chrono::{Duration, NaiveDate};
use ecomarket_core::{Item, ItemCategory, Order, OrderId, OrderStatus};
use sqlx::Row;

use crate::connection::DbPool;
use crate::repositories::{RepositoryError, SqlOrderDirectory};

struct SeedOrderContract {
    order_id: &'static str,
    status: OrderStatus,
    customer: &'static str,
    destination: &'static str,
    carrier: &'static str,
    /// Days relative to the seed day; negative means in the past.
    estimated_delivery_offset: i64,
    delivered_offset: Option<i64>,
    items: &'static [(&'static str, ItemCategory, bool)],
    description: &'static str,
}

const SEED_ORDERS: &[SeedOrderContract] = &[
    SeedOrderContract {
        order_id: "20001",
        status: OrderStatus::InTransit,
        customer: "Camila Rojas",
        destination: "Bogotá",
        carrier: "Servientrega",
        estimated_delivery_offset: 2,
        delivered_offset: None,
        items: &[("Paquete de Almojabanas", ItemCategory::Perishable, false)],
        description: "in-transit perishable order",
    },
    SeedOrderContract {
        order_id: "20002",
        status: OrderStatus::Delivered,
        customer: "Andrés Pardo",
        destination: "Medellín",
        carrier: "Coordinadora",
        estimated_delivery_offset: -10,
        delivered_offset: Some(-10),
        items: &[
            ("Juego de cubiertos", ItemCategory::Other, true),
            ("Yogur griego", ItemCategory::Perishable, false),
        ],
        description: "delivered order inside the return window",
    },
    SeedOrderContract {
        order_id: "20003",
        status: OrderStatus::InTransit,
        customer: "Lucía Méndez",
        destination: "Cali",
        carrier: "Interrapidisimo",
        estimated_delivery_offset: 4,
        delivered_offset: None,
        items: &[("Laptop", ItemCategory::Other, true)],
        description: "in-transit electronics order",
    },
    SeedOrderContract {
        order_id: "20007",
        status: OrderStatus::Delivered,
        customer: "Jorge Salazar",
        destination: "Barranquilla",
        carrier: "Coordinadora",
        estimated_delivery_offset: -5,
        delivered_offset: Some(-5),
        items: &[("Juego de cubiertos", ItemCategory::Other, true)],
        description: "recently delivered order",
    },
];

pub struct DemoDataset;

#[derive(Debug)]
pub struct SeedResult {
    pub order_count: usize,
    pub item_count: usize,
}

#[derive(Debug)]
pub struct VerificationResult {
    pub passed: bool,
    pub problems: Vec<String>,
}

impl DemoDataset {
    pub async fn load(pool: &DbPool, seed_day: NaiveDate) -> Result<SeedResult, RepositoryError> {
        let directory = SqlOrderDirectory::new(pool.clone());
        let mut item_count = 0;

        for contract in SEED_ORDERS {
            let order = build_order(contract, seed_day);
            item_count += order.items.len();
            directory.save(&order).await?;
        }

        Ok(SeedResult { order_count: SEED_ORDERS.len(), item_count })
    }

    /// Checks each seeded order against its contract: presence, status,
    /// and line-item count. Problems are reported, not panicked on.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let directory = SqlOrderDirectory::new(pool.clone());
        let mut problems = Vec::new();

        for contract in SEED_ORDERS {
            let order_id = OrderId(contract.order_id.to_string());
            match directory.fetch(&order_id).await? {
                None => problems.push(format!(
                    "order {} ({}) is missing",
                    contract.order_id, contract.description
                )),
                Some(order) => {
                    if order.status != contract.status {
                        problems.push(format!(
                            "order {} has status {:?}, expected {:?}",
                            contract.order_id, order.status, contract.status
                        ));
                    }
                    if order.items.len() != contract.items.len() {
                        problems.push(format!(
                            "order {} has {} items, expected {}",
                            contract.order_id,
                            order.items.len(),
                            contract.items.len()
                        ));
                    }
                }
            }
        }

        let row = sqlx::query("SELECT count(*) AS n FROM orders").fetch_one(pool).await?;
        let total: i64 = row.get("n");
        if (total as usize) < SEED_ORDERS.len() {
            problems.push(format!("orders table holds {total} rows, expected at least 4"));
        }

        Ok(VerificationResult { passed: problems.is_empty(), problems })
    }

    pub async fn clean(pool: &DbPool) -> Result<(), RepositoryError> {
        for contract in SEED_ORDERS {
            sqlx::query("DELETE FROM orders WHERE id = ?")
                .bind(contract.order_id)
                .execute(pool)
                .await?;
        }
        Ok(())
    }
}

fn build_order(contract: &SeedOrderContract, seed_day: NaiveDate) -> Order {
    Order {
        id: OrderId(contract.order_id.to_string()),
        status: contract.status,
        customer: contract.customer.to_string(),
        destination: contract.destination.to_string(),
        carrier: contract.carrier.to_string(),
        estimated_delivery: seed_day + Duration::days(contract.estimated_delivery_offset),
        delivered_at: contract.delivered_offset.map(|offset| seed_day + Duration::days(offset)),
        items: contract
            .items
            .iter()
            .map(|(name, category, return_allowed)| Item {
                name: name.to_string(),
                category: *category,
                return_allowed: *return_allowed,
            })
            .collect(),
    }
}
