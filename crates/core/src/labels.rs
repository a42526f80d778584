//! Return-label issuance.
//!
//! The RMA sequence is the one piece of process-wide shared state: a single
//! atomic counter seeded from the clock at startup, so concurrent sessions
//! can never mint the same identifier. The RMA and URL formats are consumed
//! downstream and must stay bit-exact.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Datelike, Utc};

use crate::domain::order::Order;
use crate::domain::returns::{ProcessCategory, ReturnLabel, RmaId};
use crate::errors::WorkflowError;

/// Monotonically increasing, timestamp-seeded sequence. Wall-clock formatting
/// alone is not collision-resistant under concurrency; `fetch_add` is.
#[derive(Debug)]
pub struct RmaSequence {
    counter: AtomicU64,
}

impl RmaSequence {
    pub fn new() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self::with_seed(seed)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { counter: AtomicU64::new(seed) }
    }

    pub fn next_id(&self, year: i32) -> RmaId {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        RmaId(format!("RMA-{year}-{:06}", sequence % 1_000_000))
    }
}

impl Default for RmaSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct LabelIssuer {
    sequence: RmaSequence,
    base_url: String,
}

impl LabelIssuer {
    pub fn new(sequence: RmaSequence, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { sequence, base_url }
    }

    /// Issues a label for an already-resolved order. Callers run this only
    /// after an eligible verdict for the same (order, item) in the same
    /// workflow run; an unknown item here is a contract violation.
    pub fn issue(
        &self,
        order: &Order,
        item_name: &str,
        process: ProcessCategory,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<ReturnLabel, WorkflowError> {
        let item = order.find_item(item_name).ok_or_else(|| {
            WorkflowError::LabelIssuance(format!(
                "item `{item_name}` is not part of order {}; issuance must follow a \
                 matching eligibility verdict",
                order.id
            ))
        })?;

        let rma_id = self.sequence.next_id(now.year());
        let label_url = format!("{}/returns/{}.pdf", self.base_url, rma_id);
        let instructions = instructions_for(process, &order.carrier);

        Ok(ReturnLabel {
            rma_id,
            order_id: order.id.clone(),
            item_name: item.name.clone(),
            carrier: order.carrier.clone(),
            process,
            instructions,
            label_url,
            reason: reason.to_string(),
            issued_at: now,
        })
    }
}

fn instructions_for(process: ProcessCategory, carrier: &str) -> String {
    match process {
        ProcessCategory::PriorityPickup => format!(
            "Un mensajero de {carrier} pasará en las próximas 24 horas. Ten el producto \
             disponible tal como lo recibiste. El reembolso se procesará automáticamente."
        ),
        ProcessCategory::StandardPickup => format!(
            "1. Descarga e imprime la etiqueta adjunta\n\
             2. Empaca el producto en su caja original con todos los accesorios\n\
             3. Pega la etiqueta en el exterior del paquete\n\
             4. Entrega el paquete al mensajero de {carrier}\n\
             5. Recibirás confirmación por email y el reembolso en 5-7 días hábiles"
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use chrono::{NaiveDate, TimeZone, Utc};

    use crate::domain::order::{Item, ItemCategory, Order, OrderId, OrderStatus};
    use crate::domain::returns::ProcessCategory;
    use crate::errors::WorkflowError;

    use super::{LabelIssuer, RmaSequence};

    fn order() -> Order {
        Order {
            id: OrderId("20007".to_string()),
            status: OrderStatus::Delivered,
            customer: "Carlos Pérez".to_string(),
            destination: "Medellín".to_string(),
            carrier: "EcoExpress".to_string(),
            estimated_delivery: NaiveDate::from_ymd_opt(2026, 8, 20).unwrap(),
            delivered_at: NaiveDate::from_ymd_opt(2026, 8, 23),
            items: vec![Item {
                name: "Juego de cubiertos".to_string(),
                category: ItemCategory::Other,
                return_allowed: true,
            }],
        }
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn rma_and_url_formats_are_exact() {
        let issuer = LabelIssuer::new(RmaSequence::with_seed(123_456), "https://ecomarket.dev");
        let label = issuer
            .issue(&order(), "Juego de cubiertos", ProcessCategory::StandardPickup, "defective", now())
            .expect("label issued");

        assert_eq!(label.rma_id.0, "RMA-2026-123456");
        assert_eq!(label.label_url, "https://ecomarket.dev/returns/RMA-2026-123456.pdf");
        assert_eq!(label.carrier, "EcoExpress");
    }

    #[test]
    fn sequence_wraps_at_six_digits_and_keeps_padding() {
        let sequence = RmaSequence::with_seed(999_999);
        assert_eq!(sequence.next_id(2026).0, "RMA-2026-999999");
        assert_eq!(sequence.next_id(2026).0, "RMA-2026-000000");
        assert_eq!(sequence.next_id(2026).0, "RMA-2026-000001");
    }

    #[test]
    fn instructions_follow_the_process_category() {
        let issuer = LabelIssuer::new(RmaSequence::with_seed(1), "https://ecomarket.dev/");
        let standard = issuer
            .issue(&order(), "Juego de cubiertos", ProcessCategory::StandardPickup, "defective", now())
            .expect("standard label");
        let priority = issuer
            .issue(&order(), "Juego de cubiertos", ProcessCategory::PriorityPickup, "damaged", now())
            .expect("priority label");

        assert!(standard.instructions.contains("imprime la etiqueta adjunta"));
        assert!(standard.instructions.contains("EcoExpress"));
        assert!(priority.instructions.contains("24 horas"));
        assert!(priority.instructions.contains("EcoExpress"));
    }

    #[test]
    fn unknown_item_is_a_contract_violation() {
        let issuer = LabelIssuer::new(RmaSequence::with_seed(1), "https://ecomarket.dev");
        let error = issuer
            .issue(&order(), "Laptop", ProcessCategory::StandardPickup, "defective", now())
            .expect_err("item not in order");
        assert!(matches!(error, WorkflowError::LabelIssuance(_)));
    }

    #[test]
    fn concurrent_issuance_never_repeats_an_rma() {
        let sequence = Arc::new(RmaSequence::with_seed(42));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let sequence = Arc::clone(&sequence);
            handles.push(thread::spawn(move || {
                (0..250).map(|_| sequence.next_id(2026).0).collect::<Vec<_>>()
            }));
        }

        let mut all = HashSet::new();
        let mut total = 0usize;
        for handle in handles {
            for id in handle.join().expect("worker finished") {
                all.insert(id);
                total += 1;
            }
        }
        assert_eq!(all.len(), total);
    }
}
