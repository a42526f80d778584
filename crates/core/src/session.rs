//! Per-session conversation state.
//!
//! Each session has exactly one writer at a time: the orchestrator serializes
//! turns per session id, so this state is plain data with no interior locking.

use serde::{Deserialize, Serialize};

use crate::domain::order::OrderId;
use crate::flow::ConversationPhase;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The last terminal action taken on behalf of the customer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnAction {
    AnsweredQuestion,
    AskedForOrderId,
    AskedForProduct,
    ListedItems,
    ReportedStatus,
    ReportedNotFound,
    IssuedLabel,
    RejectedReturn,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub session_id: SessionId,
    pub phase: ConversationPhase,
    pub last_order_id: Option<OrderId>,
    pub last_product: Option<String>,
    pub last_action: Option<TurnAction>,
    pub turn: u32,
}

impl ConversationState {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            phase: ConversationPhase::AwaitingOrderId,
            last_order_id: None,
            last_product: None,
            last_action: None,
            turn: 0,
        }
    }

    /// Slot memory: identifiers found on one turn are reused on later turns.
    pub fn remember_order(&mut self, order_id: OrderId) {
        self.last_order_id = Some(order_id);
    }

    pub fn remember_product(&mut self, product: impl Into<String>) {
        self.last_product = Some(product.into());
    }

    pub fn begin_turn(&mut self) -> u32 {
        self.turn += 1;
        self.turn
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::order::OrderId;
    use crate::flow::ConversationPhase;

    use super::{ConversationState, SessionId};

    #[test]
    fn new_session_awaits_an_order_id() {
        let state = ConversationState::new(SessionId("sess-1".to_string()));
        assert_eq!(state.phase, ConversationPhase::AwaitingOrderId);
        assert_eq!(state.turn, 0);
        assert!(state.last_order_id.is_none());
    }

    #[test]
    fn slot_memory_survives_turns() {
        let mut state = ConversationState::new(SessionId("sess-1".to_string()));
        state.begin_turn();
        state.remember_order(OrderId("20007".to_string()));
        state.begin_turn();
        state.remember_product("Juego de cubiertos");

        assert_eq!(state.turn, 2);
        assert_eq!(state.last_order_id.as_ref().map(|id| id.0.as_str()), Some("20007"));
        assert_eq!(state.last_product.as_deref(), Some("Juego de cubiertos"));
    }
}
