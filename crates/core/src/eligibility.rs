//! Return-eligibility rules.
//!
//! Deterministic, no I/O, no hidden clock: `now` is always passed in. Rules
//! are evaluated in a fixed order and short-circuit on the first failure;
//! the ordering is the policy.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::order::{Item, Order};
use crate::domain::returns::{EligibilityVerdict, ItemCondition, ProcessCategory, ReturnRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnPolicy {
    pub window_days: i64,
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        Self { window_days: 30 }
    }
}

#[derive(Clone, Debug, Default)]
pub struct EligibilityEngine {
    policy: ReturnPolicy,
}

impl EligibilityEngine {
    pub fn new(policy: ReturnPolicy) -> Self {
        Self { policy }
    }

    pub fn window_days(&self) -> i64 {
        self.policy.window_days
    }

    /// Evaluates the policy rules for one (order, item, request) triple.
    /// A fresh verdict is computed on every call; verdicts are never cached.
    pub fn evaluate(
        &self,
        order: &Order,
        item: &Item,
        request: &ReturnRequest,
        now: NaiveDate,
    ) -> EligibilityVerdict {
        // Rule 1: category exclusion and catalog flag.
        if item.category.excluded_from_returns() || !item.return_allowed {
            return EligibilityVerdict {
                eligible: false,
                reason: format!(
                    "items in category `{}` cannot be returned under the category policy",
                    item.category.as_str()
                ),
                process: None,
                remaining_days: None,
                next_steps: vec!["Contactar con soporte para casos excepcionales".to_string()],
            };
        }

        // Rule 2: time window, measured from the actual delivery date. An
        // order without one is an invalid-date outcome, never an estimate
        // based fallback.
        let Some(delivered_at) = order.delivered_at else {
            return EligibilityVerdict {
                eligible: false,
                reason: "invalid delivery date".to_string(),
                process: None,
                remaining_days: None,
                next_steps: Vec::new(),
            };
        };
        let elapsed = (now - delivered_at).num_days();
        if elapsed > self.policy.window_days {
            return EligibilityVerdict {
                eligible: false,
                reason: format!(
                    "{elapsed} days have elapsed since delivery; the return window is {} days",
                    self.policy.window_days
                ),
                process: None,
                remaining_days: None,
                next_steps: Vec::new(),
            };
        }

        // Rule 3: declared condition.
        if request.condition == ItemCondition::Used {
            return EligibilityVerdict {
                eligible: false,
                reason: format!(
                    "items declared `{}` are not eligible for return",
                    request.condition.as_str()
                ),
                process: None,
                remaining_days: None,
                next_steps: Vec::new(),
            };
        }

        let (process, next_steps) = match request.condition {
            ItemCondition::DamagedInTransit => (
                ProcessCategory::PriorityPickup,
                vec![
                    "Un mensajero recogerá el producto en las próximas 24 horas".to_string(),
                    "No necesitas empacar el producto".to_string(),
                    "Recibirás el reembolso completo en 3-5 días hábiles".to_string(),
                ],
            ),
            _ => (
                ProcessCategory::StandardPickup,
                vec![
                    "Imprimir la etiqueta de devolución".to_string(),
                    "Empacar el producto en su caja original".to_string(),
                    "Entregar el paquete al mensajero".to_string(),
                    "El reembolso se procesa en 5-7 días hábiles tras confirmar la recepción"
                        .to_string(),
                ],
            ),
        };

        EligibilityVerdict {
            eligible: true,
            reason: format!(
                "within the {}-day window and condition `{}` is acceptable",
                self.policy.window_days,
                request.condition.as_str()
            ),
            process: Some(process),
            remaining_days: Some(self.policy.window_days - elapsed),
            next_steps,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::domain::order::{Item, ItemCategory, Order, OrderId, OrderStatus};
    use crate::domain::returns::{ItemCondition, ProcessCategory, ReturnRequest};

    use super::{EligibilityEngine, ReturnPolicy};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 28).unwrap()
    }

    fn delivered_order(days_ago: i64) -> Order {
        let delivered = today() - Duration::days(days_ago);
        Order {
            id: OrderId("20002".to_string()),
            status: OrderStatus::Delivered,
            customer: "Ana Torres".to_string(),
            destination: "Bogotá".to_string(),
            carrier: "EcoExpress".to_string(),
            estimated_delivery: delivered,
            delivered_at: Some(delivered),
            items: Vec::new(),
        }
    }

    fn item(category: ItemCategory, return_allowed: bool) -> Item {
        Item { name: "Juego de cubiertos".to_string(), category, return_allowed }
    }

    fn request(condition: ItemCondition) -> ReturnRequest {
        ReturnRequest {
            order_id: OrderId("20002".to_string()),
            item_name: "Juego de cubiertos".to_string(),
            reason: "Artículo defectuoso".to_string(),
            condition,
        }
    }

    #[test]
    fn excluded_categories_are_never_eligible() {
        let engine = EligibilityEngine::default();
        let order = delivered_order(1);

        for category in [
            ItemCategory::Perishable,
            ItemCategory::Hygiene,
            ItemCategory::Medication,
        ] {
            for condition in [
                ItemCondition::Sealed,
                ItemCondition::OpenedUnused,
                ItemCondition::Used,
                ItemCondition::DamagedInTransit,
            ] {
                let verdict =
                    engine.evaluate(&order, &item(category, true), &request(condition), today());
                assert!(!verdict.eligible, "{category:?}/{condition:?} must be ineligible");
                assert!(verdict.reason.contains("category policy"));
                assert_eq!(verdict.process, None);
                assert_eq!(
                    verdict.next_steps,
                    vec!["Contactar con soporte para casos excepcionales".to_string()]
                );
            }
        }
    }

    #[test]
    fn catalog_flag_blocks_returns_even_for_plain_categories() {
        let engine = EligibilityEngine::default();
        let verdict = engine.evaluate(
            &delivered_order(1),
            &item(ItemCategory::Other, false),
            &request(ItemCondition::Sealed),
            today(),
        );
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("category policy"));
    }

    #[test]
    fn missing_delivery_date_is_an_invalid_date_outcome() {
        let engine = EligibilityEngine::default();
        let mut order = delivered_order(1);
        order.delivered_at = None;

        let verdict = engine.evaluate(
            &order,
            &item(ItemCategory::Other, true),
            &request(ItemCondition::Sealed),
            today(),
        );
        assert!(!verdict.eligible);
        assert_eq!(verdict.reason, "invalid delivery date");
    }

    #[test]
    fn expired_window_names_the_elapsed_days() {
        let engine = EligibilityEngine::default();
        let verdict = engine.evaluate(
            &delivered_order(35),
            &item(ItemCategory::Other, true),
            &request(ItemCondition::Sealed),
            today(),
        );
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("35 days"));
        assert!(verdict.reason.contains("30 days"));
    }

    #[test]
    fn used_condition_is_rejected_inside_the_window() {
        let engine = EligibilityEngine::default();
        let verdict = engine.evaluate(
            &delivered_order(3),
            &item(ItemCategory::Other, true),
            &request(ItemCondition::Used),
            today(),
        );
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("not eligible"));
    }

    #[test]
    fn sealed_item_ten_days_in_gets_standard_pickup_with_twenty_remaining() {
        let engine = EligibilityEngine::default();
        let verdict = engine.evaluate(
            &delivered_order(10),
            &item(ItemCategory::Other, true),
            &request(ItemCondition::Sealed),
            today(),
        );
        assert!(verdict.eligible);
        assert_eq!(verdict.process, Some(ProcessCategory::StandardPickup));
        assert_eq!(verdict.remaining_days, Some(20));
        assert_eq!(verdict.next_steps.len(), 4);
    }

    #[test]
    fn damage_in_transit_routes_to_priority_pickup() {
        let engine = EligibilityEngine::default();
        let verdict = engine.evaluate(
            &delivered_order(2),
            &item(ItemCategory::Other, true),
            &request(ItemCondition::DamagedInTransit),
            today(),
        );
        assert!(verdict.eligible);
        assert_eq!(verdict.process, Some(ProcessCategory::PriorityPickup));
        assert!(verdict.next_steps.iter().any(|step| step.contains("24 horas")));
    }

    #[test]
    fn evaluation_is_idempotent_for_identical_inputs() {
        let engine = EligibilityEngine::new(ReturnPolicy { window_days: 30 });
        let order = delivered_order(10);
        let item = item(ItemCategory::Other, true);
        let request = request(ItemCondition::OpenedUnused);

        let first = engine.evaluate(&order, &item, &request, today());
        let second = engine.evaluate(&order, &item, &request, today());
        assert_eq!(first, second);
    }

    #[test]
    fn boundary_day_is_still_inside_the_window() {
        let engine = EligibilityEngine::default();
        let verdict = engine.evaluate(
            &delivered_order(30),
            &item(ItemCategory::Other, true),
            &request(ItemCondition::Sealed),
            today(),
        );
        assert!(verdict.eligible);
        assert_eq!(verdict.remaining_days, Some(0));
    }
}
