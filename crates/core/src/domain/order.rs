use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown order status `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Perishable,
    Hygiene,
    Medication,
    Other,
}

impl ItemCategory {
    /// Categories excluded from returns by safety policy.
    pub fn excluded_from_returns(&self) -> bool {
        matches!(self, Self::Perishable | Self::Hygiene | Self::Medication)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Perishable => "perishable",
            Self::Hygiene => "hygiene",
            Self::Medication => "medication",
            Self::Other => "other",
        }
    }
}

impl std::str::FromStr for ItemCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "perishable" => Ok(Self::Perishable),
            "hygiene" => Ok(Self::Hygiene),
            "medication" => Ok(Self::Medication),
            "other" => Ok(Self::Other),
            other => Err(format!("unknown item category `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub category: ItemCategory,
    /// Set by upstream catalog data; false disables returns regardless of category.
    pub return_allowed: bool,
}

/// An order as served by the order directory. Read-only from the core's
/// perspective: the workflow never mutates orders, it only consumes lookups.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatus,
    pub customer: String,
    pub destination: String,
    pub carrier: String,
    pub estimated_delivery: NaiveDate,
    pub delivered_at: Option<NaiveDate>,
    pub items: Vec<Item>,
}

impl Order {
    /// Item names are unique within an order, compared case-insensitively the
    /// way customers type them.
    pub fn find_item(&self, name: &str) -> Option<&Item> {
        let wanted = name.trim().to_lowercase();
        self.items.iter().find(|item| item.name.to_lowercase() == wanted)
    }

    pub fn item_names(&self) -> Vec<String> {
        self.items.iter().map(|item| item.name.clone()).collect()
    }

    pub fn is_delivered(&self) -> bool {
        self.status == OrderStatus::Delivered
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{Item, ItemCategory, Order, OrderId, OrderStatus};

    fn order() -> Order {
        Order {
            id: OrderId("20002".to_string()),
            status: OrderStatus::Delivered,
            customer: "Ana Torres".to_string(),
            destination: "Bogotá".to_string(),
            carrier: "EcoExpress".to_string(),
            estimated_delivery: NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            delivered_at: NaiveDate::from_ymd_opt(2026, 8, 12),
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

    #[test]
    fn find_item_is_case_insensitive() {
        let order = order();
        assert!(order.find_item("juego de cubiertos").is_some());
        assert!(order.find_item("  JUEGO DE CUBIERTOS ").is_some());
        assert!(order.find_item("Laptop").is_none());
    }

    #[test]
    fn excluded_categories_match_safety_policy() {
        assert!(ItemCategory::Perishable.excluded_from_returns());
        assert!(ItemCategory::Hygiene.excluded_from_returns());
        assert!(ItemCategory::Medication.excluded_from_returns());
        assert!(!ItemCategory::Other.excluded_from_returns());
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            OrderStatus::Created,
            OrderStatus::InTransit,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
        }
    }
}
