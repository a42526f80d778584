//! Shared wiring for the chat and turn commands: configuration-driven
//! knowledge provider selection and orchestrator construction over the
//! sqlite-backed directory and transcript store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ecomarket_agent::{OllamaResponder, ReturnsOrchestrator, StaticKnowledgeResponder};
use ecomarket_core::{
    AppConfig, AuditSink, ConversationStore, InMemoryAuditSink, KnowledgeAnswer, KnowledgeError,
    KnowledgeResponder, LlmProvider,
};
use ecomarket_db::{connect, ensure_schema, DbPool, SqlConversationStore, SqlOrderDirectory};

pub type AppOrchestrator = ReturnsOrchestrator<SqlOrderDirectory, AnyResponder>;

/// Knowledge provider chosen by configuration.
pub enum AnyResponder {
    Static(StaticKnowledgeResponder),
    Ollama(OllamaResponder),
}

#[async_trait]
impl KnowledgeResponder for AnyResponder {
    async fn answer(&self, query: &str, fan_out: usize) -> Result<KnowledgeAnswer, KnowledgeError> {
        match self {
            Self::Static(responder) => responder.answer(query, fan_out).await,
            Self::Ollama(responder) => responder.answer(query, fan_out).await,
        }
    }
}

pub async fn build_orchestrator(config: &AppConfig) -> Result<(AppOrchestrator, DbPool)> {
    let pool = connect(&config.database)
        .await
        .with_context(|| format!("failed to connect to `{}`", config.database.url))?;
    ensure_schema(&pool).await.context("failed to apply the database schema")?;

    let knowledge = Arc::new(match config.llm.provider {
        LlmProvider::Static => AnyResponder::Static(StaticKnowledgeResponder::new()),
        LlmProvider::Ollama => {
            let base_url = config
                .llm
                .base_url
                .clone()
                .ok_or_else(|| anyhow!("llm.base_url is required for the ollama provider"))?;
            AnyResponder::Ollama(
                OllamaResponder::new(
                    base_url,
                    config.llm.model.clone(),
                    Duration::from_secs(config.llm.timeout_secs),
                )
                .map_err(|error| anyhow!("failed to build the ollama client: {error}"))?,
            )
        }
    });

    let directory = Arc::new(SqlOrderDirectory::new(pool.clone()));
    let store: Arc<dyn ConversationStore> = Arc::new(SqlConversationStore::new(pool.clone()));
    let audit: Arc<dyn AuditSink> = Arc::new(InMemoryAuditSink::default());

    let orchestrator =
        ReturnsOrchestrator::new(config, directory, knowledge, audit).with_store(store);
    Ok((orchestrator, pool))
}

pub fn init_logging(config: &AppConfig) {
    use ecomarket_core::LogFormat::*;
    use tracing_subscriber::EnvFilter;

    // RUST_LOG wins over the configured level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_env_filter(filter).json().init();
        }
    }
}
