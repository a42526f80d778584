//! Transactional conversation flow.
//!
//! The orchestrator drives one state machine per session: it collects the
//! order id, then the product, then evaluates the return and completes.
//! Informational turns never touch these phases.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationPhase {
    AwaitingOrderId,
    AwaitingProductId,
    EvaluatingReturn,
    Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    OrderIdProvided,
    ProductProvided,
    VerdictReached,
    NewRequestStarted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForOrderId,
    PromptForProduct,
    RunEligibility,
    ComposeOutcome,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: ConversationPhase,
    pub to: ConversationPhase,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {phase:?} using event {event:?}")]
    InvalidTransition { phase: ConversationPhase, event: FlowEvent },
}

pub trait FlowDefinition {
    fn initial_phase(&self) -> ConversationPhase;
    fn transition(
        &self,
        current: &ConversationPhase,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// The single supported return flow. Earlier, simpler orchestrations were
/// consolidated into this one.
#[derive(Clone, Debug, Default)]
pub struct ReturnFlow;

impl FlowDefinition for ReturnFlow {
    fn initial_phase(&self) -> ConversationPhase {
        ConversationPhase::AwaitingOrderId
    }

    fn transition(
        &self,
        current: &ConversationPhase,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_return_flow(current, event)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_phase(&self) -> ConversationPhase {
        self.flow.initial_phase()
    }

    pub fn apply(
        &self,
        current: &ConversationPhase,
        event: &FlowEvent,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &ConversationPhase,
        event: &FlowEvent,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink,
    {
        let result = self.apply(current, event);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.order_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.session_id.clone(),
                        audit.order_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<ReturnFlow> {
    fn default() -> Self {
        Self::new(ReturnFlow)
    }
}

fn transition_return_flow(
    current: &ConversationPhase,
    event: &FlowEvent,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use ConversationPhase::{AwaitingOrderId, AwaitingProductId, Completed, EvaluatingReturn};
    use FlowAction::{ComposeOutcome, PromptForOrderId, PromptForProduct, RunEligibility};
    use FlowEvent::{NewRequestStarted, OrderIdProvided, ProductProvided, VerdictReached};

    let (to, actions) = match (current, event) {
        (AwaitingOrderId, OrderIdProvided) | (AwaitingProductId, OrderIdProvided) => {
            (AwaitingProductId, vec![PromptForProduct])
        }
        (AwaitingProductId, ProductProvided) => (EvaluatingReturn, vec![RunEligibility]),
        (EvaluatingReturn, VerdictReached) => (Completed, vec![ComposeOutcome]),
        (_, NewRequestStarted) => (AwaitingOrderId, vec![PromptForOrderId]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                phase: *current,
                event: *event,
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::flow::{
        ConversationPhase, FlowEngine, FlowEvent, FlowAction, FlowTransitionError, ReturnFlow,
    };

    #[test]
    fn happy_path_reaches_completed() {
        let engine = FlowEngine::new(ReturnFlow);
        let mut phase = engine.initial_phase();

        phase = engine
            .apply(&phase, &FlowEvent::OrderIdProvided)
            .expect("awaiting order -> awaiting product")
            .to;
        let evaluating = engine
            .apply(&phase, &FlowEvent::ProductProvided)
            .expect("awaiting product -> evaluating");
        assert_eq!(evaluating.to, ConversationPhase::EvaluatingReturn);
        assert!(evaluating.actions.contains(&FlowAction::RunEligibility));

        let done = engine
            .apply(&evaluating.to, &FlowEvent::VerdictReached)
            .expect("evaluating -> completed");
        assert_eq!(done.to, ConversationPhase::Completed);
        assert_eq!(done.actions, vec![FlowAction::ComposeOutcome]);
    }

    #[test]
    fn repeated_order_id_keeps_waiting_for_product() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&ConversationPhase::AwaitingProductId, &FlowEvent::OrderIdProvided)
            .expect("new order id while waiting for product");
        assert_eq!(outcome.to, ConversationPhase::AwaitingProductId);
    }

    #[test]
    fn completed_session_resets_for_a_new_request() {
        let engine = FlowEngine::default();
        let outcome = engine
            .apply(&ConversationPhase::Completed, &FlowEvent::NewRequestStarted)
            .expect("completed -> awaiting order");
        assert_eq!(outcome.to, ConversationPhase::AwaitingOrderId);
        assert_eq!(outcome.actions, vec![FlowAction::PromptForOrderId]);
    }

    #[test]
    fn product_before_order_id_is_rejected() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(&ConversationPhase::AwaitingOrderId, &FlowEvent::ProductProvided)
            .expect_err("cannot provide a product before the order id");
        assert!(matches!(
            error,
            FlowTransitionError::InvalidTransition {
                phase: ConversationPhase::AwaitingOrderId,
                event: FlowEvent::ProductProvided
            }
        ));
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let engine = FlowEngine::default();
        let events = [
            FlowEvent::OrderIdProvided,
            FlowEvent::ProductProvided,
            FlowEvent::VerdictReached,
        ];

        let run = |engine: &FlowEngine<ReturnFlow>| {
            let mut phase = engine.initial_phase();
            let mut actions = Vec::new();
            for event in &events {
                let outcome = engine.apply(&phase, event).expect("deterministic run");
                actions.push(outcome.actions);
                phase = outcome.to;
            }
            (phase, actions)
        };

        assert_eq!(run(&engine), run(&engine));
    }

    #[test]
    fn flow_transition_emits_audit_event() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();

        let _ = engine
            .apply_with_audit(
                &ConversationPhase::AwaitingOrderId,
                &FlowEvent::OrderIdProvided,
                &sink,
                &AuditContext::new(
                    Some(crate::session::SessionId("sess-1".to_owned())),
                    None,
                    "req-42",
                    "orchestrator",
                ),
            )
            .expect("transition should succeed");

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].correlation_id, "req-42");
        assert_eq!(events[0].event_type, "flow.transition_applied");
    }
}
