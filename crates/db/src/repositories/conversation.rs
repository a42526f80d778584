use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ecomarket_core::{ConversationStore, MessageRole, SessionId, StoreError, StoredMessage};
use sqlx::Row;
use tokio::sync::RwLock;

use crate::connection::DbPool;

/// Transcript store backed by sqlite.
pub struct SqlConversationStore {
    pool: DbPool,
}

impl SqlConversationStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn backend(error: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(error.to_string())
}

#[async_trait]
impl ConversationStore for SqlConversationStore {
    async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageRole,
        text: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, text, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session_id.0)
        .bind(role.as_str())
        .bind(text)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        let rows = sqlx::query(
            "SELECT role, text, created_at FROM chat_messages WHERE session_id = ? ORDER BY id",
        )
        .bind(&session_id.0)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in rows {
            let role: String = row.get("role");
            let created_at: String = row.get("created_at");
            messages.push(StoredMessage {
                session_id: session_id.clone(),
                role: role.parse().map_err(StoreError::Backend)?,
                text: row.get("text"),
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map_err(backend)?
                    .with_timezone(&Utc),
            });
        }
        Ok(messages)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let rows =
            sqlx::query("SELECT DISTINCT session_id FROM chat_messages ORDER BY session_id")
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        Ok(rows.into_iter().map(|row| SessionId(row.get("session_id"))).collect())
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM chat_messages WHERE session_id = ?")
            .bind(&session_id.0)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

/// Transcript store for demos and tests; no persistence across restarts.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    messages: Arc<RwLock<Vec<StoredMessage>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append_message(
        &self,
        session_id: &SessionId,
        role: MessageRole,
        text: &str,
    ) -> Result<(), StoreError> {
        self.messages.write().await.push(StoredMessage {
            session_id: session_id.clone(),
            role,
            text: text.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn list_messages(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<StoredMessage>, StoreError> {
        Ok(self
            .messages
            .read()
            .await
            .iter()
            .filter(|message| &message.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut sessions: Vec<SessionId> = Vec::new();
        for message in self.messages.read().await.iter() {
            if !sessions.contains(&message.session_id) {
                sessions.push(message.session_id.clone());
            }
        }
        Ok(sessions)
    }

    async fn delete_session(&self, session_id: &SessionId) -> Result<(), StoreError> {
        self.messages.write().await.retain(|message| &message.session_id != session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use ecomarket_core::{ConversationStore, MessageRole, SessionId};

    use crate::connection::connect_with_settings;
    use crate::schema::ensure_schema;

    use super::{InMemoryConversationStore, SqlConversationStore};

    fn session(name: &str) -> SessionId {
        SessionId(name.to_string())
    }

    #[tokio::test]
    async fn sql_store_appends_and_replays_in_order() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory sqlite should connect");
        ensure_schema(&pool).await.expect("schema should apply");
        let store = SqlConversationStore::new(pool);

        let id = session("s-1");
        store.append_message(&id, MessageRole::User, "hola").await.expect("append user");
        store
            .append_message(&id, MessageRole::Assistant, "¿en qué te ayudo?")
            .await
            .expect("append assistant");

        let messages = store.list_messages(&id).await.expect("list should succeed");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].text, "¿en qué te ayudo?");

        store.delete_session(&id).await.expect("delete should succeed");
        assert!(store.list_messages(&id).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn in_memory_store_isolates_sessions() {
        let store = InMemoryConversationStore::new();
        store.append_message(&session("a"), MessageRole::User, "uno").await.expect("append");
        store.append_message(&session("b"), MessageRole::User, "dos").await.expect("append");

        assert_eq!(store.list_messages(&session("a")).await.expect("list").len(), 1);
        assert_eq!(store.list_sessions().await.expect("sessions").len(), 2);

        store.delete_session(&session("a")).await.expect("delete");
        assert_eq!(store.list_sessions().await.expect("sessions").len(), 1);
    }
}
