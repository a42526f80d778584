use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::order::OrderId;

/// Customer-declared condition of the product at request time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    Sealed,
    OpenedUnused,
    Used,
    DamagedInTransit,
}

impl ItemCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sealed => "sealed",
            Self::OpenedUnused => "opened_unused",
            Self::Used => "used",
            Self::DamagedInTransit => "damaged_in_transit",
        }
    }
}

impl std::str::FromStr for ItemCondition {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sealed" => Ok(Self::Sealed),
            "opened_unused" => Ok(Self::OpenedUnused),
            "used" => Ok(Self::Used),
            "damaged_in_transit" => Ok(Self::DamagedInTransit),
            other => Err(format!("unknown item condition `{other}`")),
        }
    }
}

/// Fulfillment path for an approved return.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessCategory {
    StandardPickup,
    PriorityPickup,
}

impl ProcessCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StandardPickup => "standard_pickup",
            Self::PriorityPickup => "priority_pickup",
        }
    }
}

/// Ephemeral request assembled per workflow run; never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub order_id: OrderId,
    pub item_name: String,
    pub reason: String,
    pub condition: ItemCondition,
}

/// Pure decision output of the eligibility engine. Computed fresh on every
/// evaluation; a verdict is never cached and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    pub eligible: bool,
    pub reason: String,
    pub process: Option<ProcessCategory>,
    pub remaining_days: Option<i64>,
    pub next_steps: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RmaId(pub String);

impl std::fmt::Display for RmaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Return-merchandise-authorization record. Immutable once issued; downstream
/// consumers depend on the exact RMA and URL formats.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLabel {
    pub rma_id: RmaId,
    pub order_id: OrderId,
    pub item_name: String,
    pub carrier: String,
    pub process: ProcessCategory,
    pub instructions: String,
    pub label_url: String,
    pub reason: String,
    pub issued_at: DateTime<Utc>,
}
