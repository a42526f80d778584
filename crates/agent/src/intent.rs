//! Intent classification for incoming utterances.
//!
//! Pure text heuristics, evaluated as an ordered ladder where the first
//! matching rule wins. The ordering is the tie-break policy: a question
//! about a concrete order ("¿dónde está mi pedido 20001?") stays
//! informational even though it carries an order-shaped number.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The user wants an explanation; answering has no side effects.
    Informational,
    /// The user wants the return workflow to advance.
    Transactional,
}

const INTERROGATIVE_MARKERS: &[&str] = &[
    "how", "what", "when", "where", "why", "which", "cómo", "qué", "cuándo", "cuánto", "dónde",
    "por qué", "cuál",
];

const CONSULTATIVE_KEYWORDS: &[&str] = &[
    "policy",
    "política",
    "politica",
    "deadline",
    "plazo",
    "requirement",
    "requisito",
    "explain",
    "explica",
    "explícame",
    "warranty",
    "garantía",
    "garantia",
    "condiciones",
];

const MODAL_POSSIBILITY_PHRASES: &[&str] =
    &["can i", "is it possible", "puedo", "se puede", "es posible", "podría", "podria"];

const IMPERATIVE_PHRASES: &[&str] = &["i want", "i need", "quiero", "necesito", "deseo"];

const ACTION_PHRASES: &[&str] = &[
    "i want to return",
    "i need to return",
    "start a return",
    "generate a label",
    "return my",
    "quiero devolver",
    "necesito devolver",
    "deseo devolver",
    "devolver mi",
    "devolver el",
    "devolver la",
    "iniciar una devolución",
    "iniciar una devolucion",
    "tramitar la devolución",
    "tramitar la devolucion",
    "generar una etiqueta",
    "hacer una devolución",
    "hacer una devolucion",
];

#[derive(Clone, Debug, Default)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify(&self, utterance: &str) -> Intent {
        let text = normalize(utterance);

        if text.contains('?')
            || text.contains('¿')
            || contains_word(&text, INTERROGATIVE_MARKERS)
        {
            return Intent::Informational;
        }

        if contains_word(&text, CONSULTATIVE_KEYWORDS) {
            return Intent::Informational;
        }

        let modal = MODAL_POSSIBILITY_PHRASES.iter().any(|phrase| text.contains(phrase));
        let imperative = IMPERATIVE_PHRASES.iter().any(|phrase| text.contains(phrase));
        if modal && !imperative {
            return Intent::Informational;
        }

        if ACTION_PHRASES.iter().any(|phrase| text.contains(phrase)) {
            return Intent::Transactional;
        }

        if has_order_shaped_token(&text) {
            return Intent::Transactional;
        }

        Intent::Informational
    }
}

/// True when the utterance carries an explicit interrogative marker. Used
/// by the orchestrator to decide whether a default-informational utterance
/// in the middle of a return flow is really a question or a slot reply.
pub fn is_question(utterance: &str) -> bool {
    let text = normalize(utterance);
    text.contains('?') || text.contains('¿') || contains_word(&text, INTERROGATIVE_MARKERS)
}

fn normalize(utterance: &str) -> String {
    utterance.trim().to_lowercase()
}

fn contains_word(text: &str, words: &[&str]) -> bool {
    let tokens: Vec<&str> =
        text.split(|ch: char| !ch.is_alphanumeric() && ch != 'é' && ch != 'á' && ch != 'í'
            && ch != 'ó' && ch != 'ú' && ch != 'ñ' && ch != 'ü')
            .filter(|token| !token.is_empty())
            .collect();

    words.iter().any(|word| {
        if word.contains(' ') {
            text.contains(word)
        } else {
            tokens.iter().any(|token| token == word)
        }
    })
}

/// Order identifiers are plain numeric tokens of 5 to 10 digits.
pub(crate) fn has_order_shaped_token(text: &str) -> bool {
    find_order_shaped_token(text).is_some()
}

pub(crate) fn find_order_shaped_token(text: &str) -> Option<String> {
    text.split(|ch: char| !ch.is_ascii_digit())
        .find(|token| (5..=10).contains(&token.len()))
        .map(ToString::to_string)
}
