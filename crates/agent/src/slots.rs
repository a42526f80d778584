//! Slot filling for the transactional branch.
//!
//! Slots arrive incrementally across turns: a user may give the order id in
//! one message and the product in the next. Newly found identifiers are
//! written back into session state by the orchestrator so later turns can
//! fall back to them (slot memory). Absence of a slot is a normal outcome,
//! never an error.

use ecomarket_core::{ConversationState, OrderId};
use serde::Serialize;

use crate::intent::find_order_shaped_token;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSource {
    Utterance,
    Memory,
}

/// An extracted value plus enough signal for the orchestrator to decide
/// whether to trust it or re-confirm it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Slot<T> {
    pub value: T,
    pub source: SlotSource,
    pub confidence: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedSlots {
    pub order_id: Option<Slot<OrderId>>,
    pub product: Option<Slot<String>>,
}

/// Leading articles and possessives stripped from product candidates.
const LEADING_FILLERS: &[&str] =
    &["el", "la", "los", "las", "un", "una", "mi", "mis", "the", "my", "a", "an", "este", "esta"];

/// Generic nouns that name the conversation, not a product.
const PRODUCT_STOPWORDS: &[&str] =
    &["pedido", "orden", "order", "producto", "product", "compra", "paquete", "devolución", "devolucion", "artículo", "articulo"];

/// Suffixes that attach the order reference to a product mention,
/// e.g. "la laptop del pedido 20003".
const TRAILING_CUTS: &[&str] = &[
    " del pedido",
    " de mi pedido",
    " de la orden",
    " de mi orden",
    " from order",
    " from my order",
    " of order",
    " con número",
    " con numero",
];

const PRODUCT_LEAD_PATTERNS: &[&str] = &[
    "quiero devolver ",
    "necesito devolver ",
    "deseo devolver ",
    "devolver ",
    "i want to return ",
    "i need to return ",
    "return the ",
    "return my ",
    "return ",
    "el producto ",
    "producto ",
    "the product ",
    "product ",
    "es el ",
    "es la ",
    "it is the ",
    "it's the ",
];

const MIN_PRODUCT_LEN: usize = 5;

#[derive(Clone, Debug, Default)]
pub struct SlotExtractor;

impl SlotExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, utterance: &str, prior: &ConversationState) -> ExtractedSlots {
        let text = utterance.trim().to_lowercase();

        let order_id = find_order_shaped_token(&text)
            .map(|token| Slot {
                value: OrderId(token),
                source: SlotSource::Utterance,
                confidence: 95,
            })
            .or_else(|| {
                prior.last_order_id.clone().map(|remembered| Slot {
                    value: remembered,
                    source: SlotSource::Memory,
                    confidence: 80,
                })
            });

        let product = extract_product(&text)
            .or_else(|| {
                prior.last_product.clone().map(|remembered| Slot {
                    value: remembered,
                    source: SlotSource::Memory,
                    confidence: 80,
                })
            });

        ExtractedSlots { order_id, product }
    }
}

fn extract_product(text: &str) -> Option<Slot<String>> {
    for pattern in PRODUCT_LEAD_PATTERNS {
        if let Some(start) = text.find(pattern) {
            let candidate = &text[start + pattern.len()..];
            if let Some(cleaned) = clean_candidate(candidate) {
                return Some(Slot { value: cleaned, source: SlotSource::Utterance, confidence: 90 });
            }
        }
    }

    // Bare trailing noun phrase, e.g. the reply "juego de cubiertos" to
    // "which item?". Only plausible when the utterance carries no digits
    // and no action verb (those were already handled by the lead patterns).
    let has_action_verb = ["devolver", "devuelvo", "return", "quiero", "necesito", "want"]
        .iter()
        .any(|verb| text.contains(verb));
    if !has_action_verb
        && !text.chars().any(|ch| ch.is_ascii_digit())
        && text.split_whitespace().count() <= 6
    {
        if let Some(cleaned) = clean_candidate(text) {
            return Some(Slot { value: cleaned, source: SlotSource::Utterance, confidence: 60 });
        }
    }

    None
}

/// Trims punctuation and order-reference suffixes, strips leading articles,
/// and rejects generic nouns so "quiero devolver mi pedido" yields nothing.
fn clean_candidate(candidate: &str) -> Option<String> {
    let mut cleaned = candidate.trim();

    for cut in TRAILING_CUTS {
        if let Some(position) = cleaned.find(cut) {
            cleaned = &cleaned[..position];
        }
    }

    let mut tokens: Vec<&str> = cleaned
        .split_whitespace()
        .map(|token| token.trim_matches(|ch: char| !ch.is_alphanumeric()))
        .filter(|token| !token.is_empty())
        .collect();

    // Drop a trailing order number that survived the suffix cuts.
    while tokens.last().map(|token| token.chars().all(|ch| ch.is_ascii_digit())).unwrap_or(false) {
        tokens.pop();
    }

    while tokens.first().map(|token| LEADING_FILLERS.contains(token)).unwrap_or(false) {
        tokens.remove(0);
    }

    if tokens.is_empty() {
        return None;
    }

    if tokens.len() == 1 && PRODUCT_STOPWORDS.contains(&tokens[0]) {
        return None;
    }

    let phrase = tokens.join(" ");
    if phrase.len() < MIN_PRODUCT_LEN {
        return None;
    }

    Some(phrase)
}
