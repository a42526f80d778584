//! Inline schema management. The tables are created idempotently on
//! startup; `ensure_schema` is safe to call on every boot.

use crate::connection::DbPool;
use crate::repositories::RepositoryError;

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS orders (
        id TEXT PRIMARY KEY,
        status TEXT NOT NULL,
        customer TEXT NOT NULL,
        destination TEXT NOT NULL,
        carrier TEXT NOT NULL,
        estimated_delivery TEXT NOT NULL,
        delivered_at TEXT
    )",
    "CREATE TABLE IF NOT EXISTS order_items (
        order_id TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
        position INTEGER NOT NULL,
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        return_allowed INTEGER NOT NULL,
        PRIMARY KEY (order_id, position)
    )",
    "CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        role TEXT NOT NULL,
        text TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_chat_messages_session_id
        ON chat_messages(session_id)",
];

pub async fn ensure_schema(pool: &DbPool) -> Result<(), RepositoryError> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use crate::connection::connect_with_settings;

    use super::ensure_schema;

    #[tokio::test]
    async fn schema_creation_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 5)
            .await
            .expect("in-memory sqlite should connect");

        ensure_schema(&pool).await.expect("first schema pass should succeed");
        ensure_schema(&pool).await.expect("second schema pass should be a no-op");

        let row = sqlx::query(
            "SELECT count(*) AS n FROM sqlite_master WHERE type = 'table' AND name IN \
             ('orders', 'order_items', 'chat_messages')",
        )
        .fetch_one(&pool)
        .await
        .expect("sqlite_master should be queryable");

        let count: i64 = row.get("n");
        assert_eq!(count, 3);
    }
}
