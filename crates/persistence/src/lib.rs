//! Conversation store for the lead bot
//!
//! Provides durable storage for:
//! - Contacts and their bot status
//! - Talks (conversation sessions) with quiz data
//! - Append-only message history
//! - Webhook dedup records (idempotency gate)
//! - Quest snapshots (qualified leads)
//!
//! Two backends share the [`ConversationStore`] trait: [`ScyllaStore`] for
//! production and [`InMemoryStore`] as the development/test fallback.

pub mod client;
pub mod error;
pub mod memory;
pub mod schema;
pub mod scylla_store;
pub mod store;

pub use client::{ScyllaClient, ScyllaConfig};
pub use error::StoreError;
pub use memory::InMemoryStore;
pub use scylla_store::ScyllaStore;
pub use store::{ConversationStore, NewInbound, QuestDraft};

/// Initialize the ScyllaDB-backed store: connect, ensure the schema, and
/// wrap the client with the configured reply window.
pub async fn init_scylla(
    config: ScyllaConfig,
    window: chrono::Duration,
) -> Result<ScyllaStore, StoreError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaStore::new(client, window))
}
