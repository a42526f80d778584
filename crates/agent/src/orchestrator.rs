//! Per-session conversation orchestrator.
//!
//! Each turn runs exactly one logical operation: classify the utterance,
//! then either answer from validated knowledge or advance the return
//! workflow. Turns for the same session are serialized behind a per-session
//! lock; different sessions run fully in parallel. External calls (order
//! directory, knowledge responder) are timeout-bounded; a timeout yields an
//! apologetic reply and leaves the session state untouched so the turn can
//! be retried.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use ecomarket_core::chrono::Utc;
use ecomarket_core::{
    AppConfig, ApplicationError, AuditCategory, AuditContext, AuditEvent, AuditOutcome,
    AuditSink, ConversationPhase, ConversationState, ConversationStore, DomainError,
    EligibilityEngine, EligibilityVerdict, FlowEngine, FlowEvent, ItemCondition,
    KnowledgeResponder, LabelIssuer, LookupError, MessageRole, Order, OrderDirectory, OrderId,
    ProcessCategory, ReturnFlow, ReturnLabel, ReturnPolicy, ReturnRequest, RmaSequence,
    SessionId, TurnAction, WorkflowError,
};
use serde::Serialize;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::intent::{is_question, Intent, IntentClassifier};
use crate::knowledge::{query_topics, sanity_check, RelevanceFilter, FALLBACK_POLICY_SUMMARY};
use crate::slots::{SlotExtractor, SlotSource};

/// Internal operations a turn invoked, recorded on every terminal response
/// for observability and test assertions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    LookupOrder,
    EvaluateEligibility,
    IssueLabel,
}

#[derive(Clone, Debug, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    pub intent: Intent,
    pub phase: ConversationPhase,
    pub operations_used: Vec<Operation>,
    pub label: Option<ReturnLabel>,
    pub verdict: Option<EligibilityVerdict>,
}

/// Session states keyed by session id. The outer map lock is held only to
/// fetch or create an entry; the per-session async lock serializes turns.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<StdMutex<HashMap<SessionId, Arc<TokioMutex<ConversationState>>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, session_id: &SessionId) -> Arc<TokioMutex<ConversationState>> {
        let mut sessions = match self.sessions.lock() {
            Ok(sessions) => sessions,
            Err(poisoned) => poisoned.into_inner(),
        };
        sessions
            .entry(session_id.clone())
            .or_insert_with(|| {
                Arc::new(TokioMutex::new(ConversationState::new(session_id.clone())))
            })
            .clone()
    }
}

pub struct ReturnsOrchestrator<D, K> {
    directory: Arc<D>,
    knowledge: Arc<K>,
    store: Option<Arc<dyn ConversationStore>>,
    audit: Arc<dyn AuditSink>,
    classifier: IntentClassifier,
    extractor: SlotExtractor,
    filter: RelevanceFilter,
    flow: FlowEngine<ReturnFlow>,
    engine: EligibilityEngine,
    issuer: LabelIssuer,
    sessions: SessionRegistry,
    lookup_timeout: Duration,
    fan_out: usize,
}

impl<D, K> ReturnsOrchestrator<D, K>
where
    D: OrderDirectory,
    K: KnowledgeResponder,
{
    pub fn new(
        config: &AppConfig,
        directory: Arc<D>,
        knowledge: Arc<K>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            directory,
            knowledge,
            store: None,
            audit,
            classifier: IntentClassifier::new(),
            extractor: SlotExtractor::new(),
            filter: RelevanceFilter::new(),
            flow: FlowEngine::default(),
            engine: EligibilityEngine::new(ReturnPolicy {
                window_days: config.policy.return_window_days,
            }),
            issuer: LabelIssuer::new(RmaSequence::new(), config.labels.base_url.clone()),
            sessions: SessionRegistry::new(),
            lookup_timeout: Duration::from_secs(config.directory.lookup_timeout_secs),
            fan_out: config.retrieval.fan_out,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Shortens the external-call bound, mainly for tests that exercise the
    /// timeout path without waiting for whole seconds.
    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub async fn handle_turn(&self, session_id: &SessionId, utterance: &str) -> TurnOutcome {
        let entry = self.sessions.entry(session_id);
        let mut committed = entry.lock().await;

        let mut working = committed.clone();
        let turn = working.begin_turn();
        let context = AuditContext::new(
            Some(session_id.clone()),
            None,
            format!("{session_id}#{turn}"),
            "orchestrator",
        );

        self.audit.emit(
            AuditEvent::new(
                context.session_id.clone(),
                None,
                context.correlation_id.clone(),
                "turn.received",
                AuditCategory::Ingress,
                context.actor.clone(),
                AuditOutcome::Success,
            )
            .with_metadata("turn", turn.to_string()),
        );

        let mut intent = self.classifier.classify(utterance);
        // Mid-flow override: when we just asked "which item?", a bare noun
        // phrase like "Juego de cubiertos" is a slot reply, not a question.
        if intent == Intent::Informational
            && working.phase == ConversationPhase::AwaitingProductId
            && !is_question(utterance)
        {
            intent = Intent::Transactional;
        }
        debug!(event_name = "turn.classified", session_id = %session_id, ?intent);

        let (outcome, commit) = match intent {
            Intent::Informational => self.informational_turn(utterance, &mut working).await,
            Intent::Transactional => {
                self.transactional_turn(utterance, &mut working, &context).await
            }
        };

        if commit {
            *committed = working;
        }

        self.persist_transcript(session_id, utterance, &outcome.reply).await;

        info!(
            event_name = "turn.completed",
            session_id = %session_id,
            turn,
            phase = ?outcome.phase,
            operation_count = outcome.operations_used.len(),
        );
        outcome
    }

    /// Answers an informational question. Only the turn counter is mutated;
    /// the transactional phase and remembered slots stay untouched.
    async fn informational_turn(
        &self,
        utterance: &str,
        working: &mut ConversationState,
    ) -> (TurnOutcome, bool) {
        let topics = query_topics(utterance);

        let answer = match timeout(
            self.lookup_timeout,
            self.knowledge.answer(utterance, self.fan_out),
        )
        .await
        {
            Ok(Ok(answer)) => Some(answer),
            Ok(Err(error)) => {
                warn!(event_name = "knowledge.failed", %error);
                None
            }
            Err(_) => {
                warn!(event_name = "knowledge.timed_out");
                None
            }
        };

        let reply = match answer {
            None => FALLBACK_POLICY_SUMMARY.to_string(),
            Some(answer) => {
                let kept = self.filter.filter(&topics, answer.snippets.clone());
                if kept.is_empty() {
                    debug!(event_name = "knowledge.snippets_rejected");
                    FALLBACK_POLICY_SUMMARY.to_string()
                } else {
                    // The composed text may come from a snippet the filter
                    // dropped; recompose from the kept snippets in that case.
                    let backing_dropped = answer
                        .snippets
                        .iter()
                        .any(|snippet| snippet.text == answer.text)
                        && !kept.iter().any(|snippet| snippet.text == answer.text);
                    let text = if backing_dropped {
                        debug!(event_name = "knowledge.reply_recomposed");
                        kept[0].text.clone()
                    } else {
                        answer.text
                    };
                    if let Some(rejection) = sanity_check(&text, self.engine.window_days()) {
                        warn!(event_name = "knowledge.answer_rejected", reason = rejection);
                        FALLBACK_POLICY_SUMMARY.to_string()
                    } else {
                        text
                    }
                }
            }
        };

        working.last_action = Some(TurnAction::AnsweredQuestion);
        let outcome = TurnOutcome {
            reply,
            intent: Intent::Informational,
            phase: working.phase,
            operations_used: Vec::new(),
            label: None,
            verdict: None,
        };
        (outcome, true)
    }

    async fn transactional_turn(
        &self,
        utterance: &str,
        working: &mut ConversationState,
        context: &AuditContext,
    ) -> (TurnOutcome, bool) {
        if working.phase == ConversationPhase::Completed {
            if let Ok(transition) = self.flow.apply_with_audit(
                &working.phase,
                &FlowEvent::NewRequestStarted,
                &self.audit,
                context,
            ) {
                working.phase = transition.to;
            }
        }

        let slots = self.extractor.extract(utterance, working);
        if let Some(slot) = &slots.order_id {
            if slot.source == SlotSource::Utterance {
                working.remember_order(slot.value.clone());
            }
        }
        if let Some(slot) = &slots.product {
            if slot.source == SlotSource::Utterance {
                working.remember_product(slot.value.clone());
            }
        }

        let Some(order_slot) = slots.order_id else {
            working.last_action = Some(TurnAction::AskedForOrderId);
            let outcome = TurnOutcome {
                reply: "Con gusto te ayudo con la devolución. ¿Me indicas tu número de pedido?"
                    .to_string(),
                intent: Intent::Transactional,
                phase: working.phase,
                operations_used: Vec::new(),
                label: None,
                verdict: None,
            };
            return (outcome, true);
        };
        let order_id = order_slot.value;

        let order = match self.lookup_order(&order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                working.last_action = Some(TurnAction::ReportedNotFound);
                let error = WorkflowError::OrderNotFound(order_id.0.clone());
                debug!(event_name = "order.not_found", %error);
                self.emit_workflow_event(
                    context,
                    Some(order_id.clone()),
                    "order.not_found",
                    AuditOutcome::Rejected,
                );
                // A not-found reply reports zero operations used.
                let outcome = TurnOutcome {
                    reply: format!(
                        "No encontré ningún pedido con el número {order_id}. Verifica el \
                         número e inténtalo de nuevo."
                    ),
                    intent: Intent::Transactional,
                    phase: working.phase,
                    operations_used: Vec::new(),
                    label: None,
                    verdict: None,
                };
                return (outcome, true);
            }
            Err(error) => {
                let error = ApplicationError::from(match error {
                    LookupError::Timeout => WorkflowError::LookupTimeout,
                    LookupError::Unavailable(detail) => WorkflowError::Directory(detail),
                });
                let interface = error.into_interface(context.correlation_id.clone());
                warn!(event_name = "directory.lookup_failed", %interface, order_id = %order_id);
                self.emit_workflow_event(
                    context,
                    Some(order_id.clone()),
                    "order.lookup_failed",
                    AuditOutcome::Failed,
                );
                return (self.apologetic_outcome(working.phase), false);
            }
        };
        let mut operations = vec![Operation::LookupOrder];

        let Some(product_slot) = slots.product else {
            if let Ok(transition) = self.flow.apply_with_audit(
                &working.phase,
                &FlowEvent::OrderIdProvided,
                &self.audit,
                context,
            ) {
                working.phase = transition.to;
            }
            working.last_action = Some(TurnAction::AskedForProduct);
            let outcome = TurnOutcome {
                reply: format!(
                    "Tu pedido {order_id} incluye: {}. ¿Qué producto quieres devolver?",
                    order.item_names().join(", ")
                ),
                intent: Intent::Transactional,
                phase: working.phase,
                operations_used: operations,
                label: None,
                verdict: None,
            };
            return (outcome, true);
        };
        let product = product_slot.value;

        let Some(item) = order.find_item(&product).cloned() else {
            working.last_product = None;
            let error = WorkflowError::ItemNotFound {
                order_id: order_id.0.clone(),
                item_name: product.clone(),
                available: order.item_names(),
            };
            debug!(event_name = "return.item_not_found", %error);
            if working.phase == ConversationPhase::AwaitingOrderId {
                if let Ok(transition) = self.flow.apply_with_audit(
                    &working.phase,
                    &FlowEvent::OrderIdProvided,
                    &self.audit,
                    context,
                ) {
                    working.phase = transition.to;
                }
            }
            working.last_action = Some(TurnAction::ListedItems);
            let outcome = TurnOutcome {
                reply: format!(
                    "No encuentro `{product}` en el pedido {order_id}. Los productos del \
                     pedido son: {}. ¿Cuál quieres devolver?",
                    order.item_names().join(", ")
                ),
                intent: Intent::Transactional,
                phase: working.phase,
                operations_used: operations,
                label: None,
                verdict: None,
            };
            return (outcome, true);
        };

        if !order.is_delivered() {
            working.last_action = Some(TurnAction::ReportedStatus);
            self.emit_workflow_event(
                context,
                Some(order_id.clone()),
                "return.order_not_delivered",
                AuditOutcome::Rejected,
            );
            let outcome = TurnOutcome {
                reply: format!(
                    "Tu pedido {order_id} todavía no se ha entregado (estado: {}). La \
                     entrega estimada es el {}. Podrás solicitar la devolución una vez \
                     recibas el paquete.",
                    order.status.as_str(),
                    order.estimated_delivery.format("%d/%m/%Y")
                ),
                intent: Intent::Transactional,
                phase: working.phase,
                operations_used: operations,
                label: None,
                verdict: None,
            };
            return (outcome, true);
        }

        // Both slots resolved against a delivered order: walk the flow to
        // the evaluation phase, then to completion.
        for event in [FlowEvent::OrderIdProvided, FlowEvent::ProductProvided] {
            match self.flow.apply_with_audit(&working.phase, &event, &self.audit, context) {
                Ok(transition) => working.phase = transition.to,
                Err(error) => {
                    let error = DomainError::from(error);
                    warn!(event_name = "flow.unexpected_rejection", %error);
                    return (self.apologetic_outcome(working.phase), false);
                }
            }
        }

        let condition = detect_condition(utterance);
        let request = ReturnRequest {
            order_id: order_id.clone(),
            item_name: item.name.clone(),
            reason: utterance.trim().to_string(),
            condition,
        };
        let today = Utc::now().date_naive();
        let verdict = self.engine.evaluate(&order, &item, &request, today);
        operations.push(Operation::EvaluateEligibility);
        self.emit_workflow_event(
            context,
            Some(order_id.clone()),
            if verdict.eligible { "return.eligible" } else { "return.ineligible" },
            if verdict.eligible { AuditOutcome::Success } else { AuditOutcome::Rejected },
        );

        if !verdict.eligible {
            if let Ok(transition) = self.flow.apply_with_audit(
                &working.phase,
                &FlowEvent::VerdictReached,
                &self.audit,
                context,
            ) {
                working.phase = transition.to;
            }
            working.last_action = Some(TurnAction::RejectedReturn);
            let outcome = TurnOutcome {
                reply: compose_rejection(&item.name, &verdict),
                intent: Intent::Transactional,
                phase: working.phase,
                operations_used: operations,
                label: None,
                verdict: Some(verdict),
            };
            return (outcome, true);
        }

        let process = verdict.process.unwrap_or(ProcessCategory::StandardPickup);
        let label = match self.issuer.issue(&order, &item.name, process, &request.reason, Utc::now())
        {
            Ok(label) => label,
            Err(error) => {
                let interface = ApplicationError::from(error)
                    .into_interface(context.correlation_id.clone());
                warn!(event_name = "label.issuance_failed", %interface, order_id = %order_id);
                self.emit_workflow_event(
                    context,
                    Some(order_id.clone()),
                    "label.issuance_failed",
                    AuditOutcome::Failed,
                );
                return (self.apologetic_outcome(working.phase), false);
            }
        };
        operations.push(Operation::IssueLabel);

        if let Ok(transition) = self.flow.apply_with_audit(
            &working.phase,
            &FlowEvent::VerdictReached,
            &self.audit,
            context,
        ) {
            working.phase = transition.to;
        }
        working.last_action = Some(TurnAction::IssuedLabel);
        info!(
            event_name = "label.issued",
            order_id = %order_id,
            rma_id = %label.rma_id,
            process = ?label.process,
        );

        let outcome = TurnOutcome {
            reply: compose_success(&label, &verdict),
            intent: Intent::Transactional,
            phase: working.phase,
            operations_used: operations,
            label: Some(label),
            verdict: Some(verdict),
        };
        (outcome, true)
    }

    async fn lookup_order(&self, order_id: &OrderId) -> Result<Option<Order>, LookupError> {
        match timeout(self.lookup_timeout, self.directory.lookup(order_id)).await {
            Ok(result) => result,
            Err(_) => Err(LookupError::Timeout),
        }
    }

    fn apologetic_outcome(&self, phase: ConversationPhase) -> TurnOutcome {
        TurnOutcome {
            reply: "Lo siento, estamos teniendo un problema técnico en este momento. Por \
                    favor inténtalo de nuevo en unos minutos."
                .to_string(),
            intent: Intent::Transactional,
            phase,
            operations_used: Vec::new(),
            label: None,
            verdict: None,
        }
    }

    fn emit_workflow_event(
        &self,
        context: &AuditContext,
        order_id: Option<OrderId>,
        event_type: &str,
        outcome: AuditOutcome,
    ) {
        self.audit.emit(AuditEvent::new(
            context.session_id.clone(),
            order_id,
            context.correlation_id.clone(),
            event_type,
            AuditCategory::Workflow,
            context.actor.clone(),
            outcome,
        ));
    }

    async fn persist_transcript(&self, session_id: &SessionId, utterance: &str, reply: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(error) = store.append_message(session_id, MessageRole::User, utterance).await {
            warn!(event_name = "transcript.append_failed", role = "user", %error);
        }
        if let Err(error) = store.append_message(session_id, MessageRole::Assistant, reply).await {
            warn!(event_name = "transcript.append_failed", role = "assistant", %error);
        }
    }
}

/// Declared condition, read from the utterance wording. Defaults to sealed
/// when the customer states nothing about the item's state.
fn detect_condition(utterance: &str) -> ItemCondition {
    let text = utterance.to_lowercase();
    let damaged = ["dañado", "danado", "dañada", "danada", "damaged", "roto", "rota", "broken", "golpeado"];
    if damaged.iter().any(|word| text.contains(word)) {
        return ItemCondition::DamagedInTransit;
    }
    let used = ["usado", "usada", "lo usé", "lo use", "la usé", "la use", "used it", " used"];
    if used.iter().any(|word| text.contains(word)) {
        return ItemCondition::Used;
    }
    let opened = ["abierto", "abierta", "lo abrí", "lo abri", "opened"];
    if opened.iter().any(|word| text.contains(word)) {
        return ItemCondition::OpenedUnused;
    }
    ItemCondition::Sealed
}

fn compose_rejection(item_name: &str, verdict: &EligibilityVerdict) -> String {
    let mut reply =
        format!("No es posible tramitar la devolución de `{item_name}`: {}.", verdict.reason);
    if !verdict.next_steps.is_empty() {
        reply.push_str("\n\nQué puedes hacer:");
        for step in &verdict.next_steps {
            reply.push_str("\n- ");
            reply.push_str(step);
        }
    }
    reply
}

fn compose_success(label: &ReturnLabel, verdict: &EligibilityVerdict) -> String {
    let mut reply = format!(
        "¡Listo! He generado tu etiqueta de devolución {} para `{}`. Descárgala aquí: {}",
        label.rma_id, label.item_name, label.label_url
    );
    if let Some(remaining) = verdict.remaining_days {
        reply.push_str(&format!("\n(Te quedaban {remaining} días de plazo.)"));
    }
    reply.push_str("\n\nInstrucciones:\n");
    reply.push_str(&label.instructions);
    reply
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use ecomarket_core::chrono::Utc;
    use ecomarket_core::{
        AppConfig, AuditOutcome, ConversationPhase, InMemoryAuditSink, LookupError, Order,
        OrderDirectory, OrderId, SessionId,
    };

    use crate::directory::InMemoryOrderDirectory;
    use crate::intent::Intent;
    use crate::knowledge::StaticKnowledgeResponder;

    use super::{detect_condition, Operation, ReturnsOrchestrator};

    struct StalledDirectory;

    #[async_trait]
    impl OrderDirectory for StalledDirectory {
        async fn lookup(&self, _order_id: &OrderId) -> Result<Option<Order>, LookupError> {
            tokio::time::sleep(Duration::from_millis(250)).await;
            Ok(None)
        }
    }

    struct BrokenDirectory;

    #[async_trait]
    impl OrderDirectory for BrokenDirectory {
        async fn lookup(&self, _order_id: &OrderId) -> Result<Option<Order>, LookupError> {
            Err(LookupError::Unavailable("directory offline".to_string()))
        }
    }

    fn orchestrator() -> ReturnsOrchestrator<InMemoryOrderDirectory, StaticKnowledgeResponder> {
        let config = AppConfig::default();
        let directory = Arc::new(InMemoryOrderDirectory::seeded(Utc::now().date_naive()));
        let knowledge = Arc::new(StaticKnowledgeResponder::new());
        let audit = Arc::new(InMemoryAuditSink::default());
        ReturnsOrchestrator::new(&config, directory, knowledge, audit)
    }

    fn session(name: &str) -> SessionId {
        SessionId(name.to_string())
    }

    #[tokio::test]
    async fn status_question_stays_informational() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(&session("s-a"), "¿Dónde está mi pedido 20001?")
            .await;

        assert_eq!(outcome.intent, Intent::Informational);
        assert!(outcome.operations_used.is_empty());
        assert!(outcome.verdict.is_none());
        assert_eq!(outcome.phase, ConversationPhase::AwaitingOrderId);
    }

    #[tokio::test]
    async fn damaged_question_is_not_answered_from_the_category_policy() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(
                &session("s-k"),
                "¿mi producto llegó dañado y no admiten devolución?",
            )
            .await;

        assert_eq!(outcome.intent, Intent::Informational);
        assert!(outcome.reply.contains("puede devolverse"));
        assert!(!outcome.reply.contains("perecederos"));
    }

    #[tokio::test]
    async fn directory_failure_is_audited_as_failed() {
        let config = AppConfig::default();
        let sink = Arc::new(InMemoryAuditSink::default());
        let orchestrator = ReturnsOrchestrator::new(
            &config,
            Arc::new(BrokenDirectory),
            Arc::new(StaticKnowledgeResponder::new()),
            sink.clone(),
        );

        let outcome = orchestrator
            .handle_turn(&session("s-x"), "quiero devolver mi pedido 20002")
            .await;

        assert!(outcome.reply.contains("problema técnico"));
        let failed: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|event| event.outcome == AuditOutcome::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].event_type, "order.lookup_failed");
    }

    #[tokio::test]
    async fn unknown_order_reports_not_found_with_zero_operations() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(&session("s-d"), "quiero devolver mi pedido 99999")
            .await;

        assert!(outcome.reply.contains("No encontré"));
        assert!(outcome.operations_used.is_empty());
        assert!(outcome.label.is_none());
    }

    #[tokio::test]
    async fn missing_slots_prompt_for_the_order_id() {
        let orchestrator = orchestrator();
        let outcome = orchestrator.handle_turn(&session("s-f"), "quiero devolver mi pedido").await;

        assert_eq!(outcome.intent, Intent::Transactional);
        assert!(outcome.reply.contains("número de pedido"));
        assert_eq!(outcome.phase, ConversationPhase::AwaitingOrderId);
        assert!(outcome.operations_used.is_empty());
    }

    #[tokio::test]
    async fn eligible_return_issues_a_label_end_to_end() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(&session("s-b"), "Quiero devolver el Juego de cubiertos del pedido 20002")
            .await;

        assert_eq!(
            outcome.operations_used,
            vec![Operation::LookupOrder, Operation::EvaluateEligibility, Operation::IssueLabel]
        );
        assert_eq!(outcome.phase, ConversationPhase::Completed);

        let label = outcome.label.expect("an eligible return should carry a label");
        assert!(label.rma_id.0.starts_with("RMA-"));
        assert!(outcome.reply.contains(&label.rma_id.0));
        assert!(label.label_url.ends_with(&format!("/returns/{}.pdf", label.rma_id)));

        let verdict = outcome.verdict.expect("the verdict should be reported");
        assert!(verdict.eligible);
        assert_eq!(verdict.remaining_days, Some(20));
    }

    #[tokio::test]
    async fn excluded_category_is_rejected_with_reason() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(
                &session("s-c"),
                "quiero devolver el Yogur griego del pedido 20002",
            )
            .await;

        let verdict = outcome.verdict.expect("a verdict should be reported");
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("category policy"));
        assert!(outcome.label.is_none());
        assert_eq!(
            outcome.operations_used,
            vec![Operation::LookupOrder, Operation::EvaluateEligibility]
        );
    }

    #[tokio::test]
    async fn undelivered_order_reports_status_and_stops() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(&session("s-t"), "quiero devolver la Laptop del pedido 20003")
            .await;

        assert!(outcome.reply.contains("no se ha entregado"));
        assert_eq!(outcome.operations_used, vec![Operation::LookupOrder]);
        assert!(outcome.verdict.is_none());
    }

    #[tokio::test]
    async fn slot_memory_carries_the_order_id_across_turns() {
        let orchestrator = orchestrator();
        let session_id = session("s-m");

        let first = orchestrator
            .handle_turn(&session_id, "quiero devolver algo del pedido 20002")
            .await;
        assert_eq!(first.phase, ConversationPhase::AwaitingProductId);
        assert!(first.reply.contains("Juego de cubiertos"));

        let second = orchestrator.handle_turn(&session_id, "Juego de cubiertos").await;
        assert_eq!(second.phase, ConversationPhase::Completed);
        assert!(second.label.is_some());
    }

    #[tokio::test]
    async fn lookup_timeout_leaves_the_session_unchanged() {
        let config = AppConfig::default();
        let directory = Arc::new(StalledDirectory);
        let knowledge = Arc::new(StaticKnowledgeResponder::new());
        let audit = Arc::new(InMemoryAuditSink::default());
        let orchestrator = ReturnsOrchestrator::new(&config, directory, knowledge, audit)
            .with_lookup_timeout(Duration::from_millis(10));

        let session_id = session("s-x");
        let outcome = orchestrator
            .handle_turn(&session_id, "quiero devolver la licuadora del pedido 20002")
            .await;

        assert!(outcome.reply.contains("inténtalo de nuevo"));
        assert!(outcome.operations_used.is_empty());

        let entry = orchestrator.sessions.entry(&session_id);
        let state = entry.lock().await;
        assert_eq!(state.turn, 0, "a failed turn must not advance the session");
        assert_eq!(state.phase, ConversationPhase::AwaitingOrderId);
    }

    #[tokio::test]
    async fn damaged_wording_selects_priority_pickup() {
        let orchestrator = orchestrator();
        let outcome = orchestrator
            .handle_turn(
                &session("s-p"),
                "quiero devolver el Juego de cubiertos del pedido 20002, llegó dañado",
            )
            .await;

        let label = outcome.label.expect("a damaged eligible item should get a label");
        assert!(label.instructions.contains("24 horas"));
    }

    #[test]
    fn condition_detection_reads_the_wording() {
        use ecomarket_core::ItemCondition;

        assert_eq!(detect_condition("llegó dañado"), ItemCondition::DamagedInTransit);
        assert_eq!(detect_condition("ya lo usé una vez"), ItemCondition::Used);
        assert_eq!(detect_condition("está abierto pero sin usar"), ItemCondition::OpenedUnused);
        assert_eq!(detect_condition("quiero devolverlo"), ItemCondition::Sealed);
    }
}
