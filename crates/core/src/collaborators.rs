//! Ports for the external collaborators the workflow calls out to.
//!
//! The order directory, the knowledge responder, and the conversation store
//! are opaque services from the core's point of view: the orchestrator
//! depends on these traits only, and treats every implementation as fallible
//! and timeout-bounded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::order::{Order, OrderId};
use crate::session::SessionId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("order directory lookup timed out")]
    Timeout,
    #[error("order directory unavailable: {0}")]
    Unavailable(String),
}

/// Authoritative store of orders and line items. Read-only from the core.
#[async_trait]
pub trait OrderDirectory: Send + Sync {
    async fn lookup(&self, order_id: &OrderId) -> Result<Option<Order>, LookupError>;
}

/// Policy topic a knowledge snippet was ingested under. The orchestrator
/// uses this to keep cross-contaminating snippets out of answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTopic {
    ReturnWindow,
    CategoryExclusions,
    DamagedItems,
    ReturnProcess,
    Shipping,
    General,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSnippet {
    pub topic: PolicyTopic,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeAnswer {
    pub text: String,
    pub snippets: Vec<KnowledgeSnippet>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum KnowledgeError {
    #[error("knowledge responder timed out")]
    Timeout,
    #[error("knowledge responder unavailable: {0}")]
    Unavailable(String),
}

/// Answers informational questions. The core treats the output as untrusted
/// and post-validates it before showing it to a customer.
#[async_trait]
pub trait KnowledgeResponder: Send + Sync {
    async fn answer(&self, query: &str, fan_out: usize)
        -> Result<KnowledgeAnswer, KnowledgeError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            other => Err(format!("unknown message role `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: SessionId,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("conversation store failure: {0}")]
    Backend(String),
}

/// Transcript log used only to persist and replay turns; the core never
/// depends on its internal format.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageRole,
        text: &str,
    ) -> Result<(), StoreError>;

    async fn list_messages(&self, session_id: &SessionId)
        -> Result<Vec<StoredMessage>, StoreError>;

    async fn list_sessions(&self) -> Result<Vec<SessionId>, StoreError>;

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), StoreError>;
}
