pub mod connection;
pub mod fixtures;
pub mod repositories;
pub mod schema;

pub use connection::{connect, connect_with_settings, DbPool};
pub use fixtures::{DemoDataset, SeedResult, VerificationResult};
pub use repositories::{
    InMemoryConversationStore, RepositoryError, SqlConversationStore, SqlOrderDirectory,
};
pub use schema::ensure_schema;
