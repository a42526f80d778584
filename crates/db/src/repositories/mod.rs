use thiserror::Error;

pub mod conversation;
pub mod orders;

pub use conversation::{InMemoryConversationStore, SqlConversationStore};
pub use orders::SqlOrderDirectory;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}
