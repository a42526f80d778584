pub mod audit;
pub mod collaborators;
pub mod config;
pub mod domain;
pub mod eligibility;
pub mod errors;
pub mod flow;
pub mod labels;
pub mod session;

pub use audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink,
};
pub use collaborators::{
    ConversationStore, KnowledgeAnswer, KnowledgeError, KnowledgeResponder, KnowledgeSnippet,
    LookupError, MessageRole, OrderDirectory, PolicyTopic, StoreError, StoredMessage,
};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};
pub use domain::order::{Item, ItemCategory, Order, OrderId, OrderStatus};
pub use domain::returns::{
    EligibilityVerdict, ItemCondition, ProcessCategory, ReturnLabel, ReturnRequest, RmaId,
};
pub use eligibility::{EligibilityEngine, ReturnPolicy};
pub use errors::{ApplicationError, DomainError, InterfaceError, WorkflowError};
pub use flow::{
    ConversationPhase, FlowAction, FlowDefinition, FlowEngine, FlowEvent, FlowTransitionError,
    ReturnFlow, TransitionOutcome,
};
pub use labels::{LabelIssuer, RmaSequence};
pub use session::{ConversationState, SessionId, TurnAction};

pub use chrono;
