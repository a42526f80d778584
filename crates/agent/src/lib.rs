//! Conversational runtime for the EcoMarket returns assistant.
//!
//! This crate is the "brain" in front of the deterministic core:
//! - Classifies each utterance as informational or transactional (`intent`)
//! - Fills order/product slots across turns, with slot memory (`slots`)
//! - Answers informational questions from filtered knowledge (`knowledge`)
//! - Drives the return workflow per session (`orchestrator`)
//!
//! # Safety Principle
//!
//! Free-text interpretation never decides a business outcome. Eligibility,
//! label issuance, and the RMA format are deterministic decisions made by
//! `ecomarket-core`; this crate only routes and phrases them.

pub mod directory;
pub mod intent;
pub mod knowledge;
pub mod orchestrator;
pub mod slots;

pub use directory::InMemoryOrderDirectory;
pub use intent::{Intent, IntentClassifier};
pub use knowledge::{OllamaResponder, RelevanceFilter, StaticKnowledgeResponder};
pub use orchestrator::{Operation, ReturnsOrchestrator, SessionRegistry, TurnOutcome};
pub use slots::{ExtractedSlots, Slot, SlotExtractor, SlotSource};
