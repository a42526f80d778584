//! Informational answers and the guardrails around them.
//!
//! The knowledge responder is treated as fallible and untrusted: retrieved
//! snippets pass a relevance filter before use, and the composed answer
//! passes a sanity check against fixed policy facts. A rejected answer is
//! replaced with a canned policy summary rather than surfaced.

use async_trait::async_trait;
use ecomarket_core::{KnowledgeAnswer, KnowledgeError, KnowledgeResponder, KnowledgeSnippet, PolicyTopic};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canned summary used whenever a generated answer fails validation.
pub const FALLBACK_POLICY_SUMMARY: &str = "Nuestra política de devoluciones: tienes 30 días desde la entrega para devolver un producto. Los productos perecederos, de higiene y medicamentos no admiten devolución. Los artículos dañados durante el transporte sí pueden devolverse, con recogida prioritaria en 24 horas. Para más detalles, indícame tu número de pedido.";

/// Topics the incoming query touches, derived from keywords.
pub fn query_topics(query: &str) -> Vec<PolicyTopic> {
    let text = query.to_lowercase();
    let mut topics = Vec::new();

    if text.contains("dañado") || text.contains("danado") || text.contains("damaged") || text.contains("roto") || text.contains("broken") {
        topics.push(PolicyTopic::DamagedItems);
    }
    if text.contains("perecedero") || text.contains("perishable") || text.contains("higiene") || text.contains("hygiene") || text.contains("medicamento") || text.contains("medication") || text.contains("categoría") || text.contains("categoria") {
        topics.push(PolicyTopic::CategoryExclusions);
    }
    if text.contains("días") || text.contains("dias") || text.contains("days") || text.contains("plazo") || text.contains("window") || text.contains("cuánto tiempo") || text.contains("cuanto tiempo") || text.contains("how long") {
        topics.push(PolicyTopic::ReturnWindow);
    }
    if text.contains("proceso") || text.contains("process") || text.contains("etiqueta") || text.contains("label") || text.contains("cómo devuelvo") || text.contains("como devuelvo") || text.contains("how do i return") {
        topics.push(PolicyTopic::ReturnProcess);
    }
    if text.contains("envío") || text.contains("envio") || text.contains("shipping") || text.contains("entrega") || text.contains("delivery") || text.contains("pedido") || text.contains("paquete") {
        topics.push(PolicyTopic::Shipping);
    }

    if topics.is_empty() {
        topics.push(PolicyTopic::General);
    }
    topics
}

/// Rejects snippets whose topic cross-contaminates the query. A question
/// about damaged items must not be answered from the category-exclusion
/// policy (and vice versa): the two rules sound similar but reach opposite
/// verdicts.
#[derive(Clone, Debug, Default)]
pub struct RelevanceFilter;

impl RelevanceFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn filter(
        &self,
        topics: &[PolicyTopic],
        snippets: Vec<KnowledgeSnippet>,
    ) -> Vec<KnowledgeSnippet> {
        let damaged_query = topics.contains(&PolicyTopic::DamagedItems);
        let category_query = topics.contains(&PolicyTopic::CategoryExclusions);

        snippets
            .into_iter()
            .filter(|snippet| {
                if damaged_query && !category_query && snippet.topic == PolicyTopic::CategoryExclusions {
                    return false;
                }
                if category_query && !damaged_query && snippet.topic == PolicyTopic::DamagedItems {
                    return false;
                }
                snippet.topic == PolicyTopic::General || topics.contains(&snippet.topic)
            })
            .collect()
    }
}

/// Post-generation check against fixed policy facts. Returns the reason a
/// candidate answer was rejected, or `None` when it is safe to show.
pub fn sanity_check(answer: &str, window_days: i64) -> Option<&'static str> {
    let text = answer.to_lowercase();

    if contradicts_damaged_policy(&text) {
        return Some("contradicts the damaged-item policy");
    }
    if misstates_window(&text, window_days) {
        return Some("misstates the return window");
    }
    None
}

fn contradicts_damaged_policy(text: &str) -> bool {
    let mentions_damaged =
        text.contains("dañado") || text.contains("danado") || text.contains("damaged");
    if !mentions_damaged {
        return false;
    }

    ["no se puede devolver", "no puede devolverse", "no admite devolución", "no admite devolucion", "cannot be returned", "can't be returned", "not eligible for return"]
        .iter()
        .any(|phrase| text.contains(phrase))
}

/// Flags day counts that look like a return window but differ from the
/// configured one. Small numbers pass so refund estimates such as
/// "3-5 business days" are not rejected.
fn misstates_window(text: &str, window_days: i64) -> bool {
    let mut previous_number: Option<i64> = None;

    for token in text.split(|ch: char| !ch.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        if let Ok(number) = token.parse::<i64>() {
            previous_number = Some(number);
            continue;
        }
        if matches!(token, "días" | "dias" | "days" | "día" | "dia" | "day") {
            if let Some(number) = previous_number {
                if number > 7 && number != window_days {
                    return true;
                }
            }
        }
        previous_number = None;
    }

    false
}

/// Deterministic responder backed by a built-in policy corpus. Used as the
/// default provider and in tests; no network, no model.
#[derive(Clone, Debug)]
pub struct StaticKnowledgeResponder {
    corpus: Vec<KnowledgeSnippet>,
}

impl Default for StaticKnowledgeResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticKnowledgeResponder {
    pub fn new() -> Self {
        Self { corpus: builtin_corpus() }
    }

    fn score(snippet: &KnowledgeSnippet, query_words: &[&str]) -> usize {
        let text = snippet.text.to_lowercase();
        query_words.iter().filter(|word| word.len() > 3 && text.contains(**word)).count()
    }
}

#[async_trait]
impl KnowledgeResponder for StaticKnowledgeResponder {
    async fn answer(&self, query: &str, fan_out: usize) -> Result<KnowledgeAnswer, KnowledgeError> {
        let lowered = query.to_lowercase();
        let query_words: Vec<&str> = lowered
            .split_whitespace()
            .map(|word| word.trim_matches(|ch: char| !ch.is_alphanumeric()))
            .filter(|word| !word.is_empty())
            .collect();

        let mut scored: Vec<(usize, &KnowledgeSnippet)> = self
            .corpus
            .iter()
            .map(|snippet| (Self::score(snippet, &query_words), snippet))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let snippets: Vec<KnowledgeSnippet> = scored
            .into_iter()
            .filter(|(score, _)| *score > 0)
            .take(fan_out)
            .map(|(_, snippet)| snippet.clone())
            .collect();

        let text = snippets
            .first()
            .map(|snippet| snippet.text.clone())
            .unwrap_or_else(|| FALLBACK_POLICY_SUMMARY.to_string());

        debug!(event_name = "knowledge.static_answered", snippet_count = snippets.len());
        Ok(KnowledgeAnswer { text, snippets })
    }
}

fn builtin_corpus() -> Vec<KnowledgeSnippet> {
    vec![
        KnowledgeSnippet {
            topic: PolicyTopic::ReturnWindow,
            text: "Tienes 30 días desde la fecha de entrega para solicitar la devolución de un producto. Pasado ese plazo la devolución no puede tramitarse.".to_string(),
        },
        KnowledgeSnippet {
            topic: PolicyTopic::CategoryExclusions,
            text: "Por razones sanitarias, los productos perecederos, de higiene y los medicamentos no admiten devolución. Para casos excepcionales contacta con soporte.".to_string(),
        },
        KnowledgeSnippet {
            topic: PolicyTopic::DamagedItems,
            text: "Si tu producto llegó dañado durante el transporte, sí puede devolverse: organizamos una recogida prioritaria en las próximas 24 horas y el reembolso se procesa en 3-5 días hábiles.".to_string(),
        },
        KnowledgeSnippet {
            topic: PolicyTopic::ReturnProcess,
            text: "Para devolver un producto: genera la etiqueta de devolución, imprime la etiqueta, empaqueta el artículo en su embalaje original y entrégalo al transportista. El reembolso llega en 5-7 días hábiles tras confirmar la recepción.".to_string(),
        },
        KnowledgeSnippet {
            topic: PolicyTopic::Shipping,
            text: "Puedes consultar el estado de tu pedido indicándome el número de pedido; te diré el transportista y la fecha estimada de entrega.".to_string(),
        },
        KnowledgeSnippet {
            topic: PolicyTopic::General,
            text: "Soy el asistente de EcoMarket: puedo informarte sobre el estado de tus pedidos y tramitar devoluciones de productos.".to_string(),
        },
    ]
}

/// Responder backed by a local Ollama server (`POST /api/generate`). The
/// model is only used to phrase informational answers; every answer still
/// passes the relevance filter and sanity check.
#[derive(Clone, Debug)]
pub struct OllamaResponder {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaResponder {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, KnowledgeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| KnowledgeError::Unavailable(err.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url, model: model.into() })
    }

    fn prompt_for(query: &str, snippets: &[KnowledgeSnippet]) -> String {
        let mut prompt = String::from(
            "Eres el asistente de atención al cliente de EcoMarket. Responde en una frase breve usando únicamente el contexto siguiente.\n\nContexto:\n",
        );
        for snippet in snippets {
            prompt.push_str("- ");
            prompt.push_str(&snippet.text);
            prompt.push('\n');
        }
        prompt.push_str("\nPregunta: ");
        prompt.push_str(query);
        prompt
    }
}

#[async_trait]
impl KnowledgeResponder for OllamaResponder {
    async fn answer(&self, query: &str, fan_out: usize) -> Result<KnowledgeAnswer, KnowledgeError> {
        // Retrieval stays deterministic; the model only rephrases.
        let retrieved = StaticKnowledgeResponder::new().answer(query, fan_out).await?;

        let request = GenerateRequest {
            model: &self.model,
            prompt: Self::prompt_for(query, &retrieved.snippets),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    KnowledgeError::Timeout
                } else {
                    KnowledgeError::Unavailable(err.to_string())
                }
            })?;

        let body: GenerateResponse = response
            .error_for_status()
            .map_err(|err| KnowledgeError::Unavailable(err.to_string()))?
            .json()
            .await
            .map_err(|err| KnowledgeError::Unavailable(err.to_string()))?;

        debug!(event_name = "knowledge.ollama_answered", model = %self.model);
        Ok(KnowledgeAnswer { text: body.response.trim().to_string(), snippets: retrieved.snippets })
    }
}
