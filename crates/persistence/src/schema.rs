//! ScyllaDB schema creation

use crate::StoreError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), StoreError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| StoreError::Schema(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), StoreError> {
    // Contacts: one row per external party, the routing source of truth
    let contacts_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.contacts (
            contact_id TEXT,
            display_name TEXT,
            bot_status TEXT,
            current_step TEXT,
            active_talk_id TEXT,
            last_inbound_at BIGINT,
            created_at BIGINT,
            PRIMARY KEY (contact_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(contacts_table, &[])
        .await
        .map_err(|e| StoreError::Schema(format!("Failed to create contacts table: {}", e)))?;

    // Talks: conversation sessions, partitioned with their contact
    let talks_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.talks (
            contact_id TEXT,
            talk_id TEXT,
            status TEXT,
            started_at BIGINT,
            closed_at BIGINT,
            quiz_data map<text, text>,
            updated_at BIGINT,
            PRIMARY KEY ((contact_id), talk_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(talks_table, &[])
        .await
        .map_err(|e| StoreError::Schema(format!("Failed to create talks table: {}", e)))?;

    // Messages: append-only history, keyed by the external message id so
    // replayed writes overwrite instead of duplicating
    let messages_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.messages (
            contact_id TEXT,
            talk_id TEXT,
            external_id TEXT,
            direction TEXT,
            kind TEXT,
            content TEXT,
            created_at BIGINT,
            PRIMARY KEY ((contact_id, talk_id), external_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(messages_table, &[])
        .await
        .map_err(|e| StoreError::Schema(format!("Failed to create messages table: {}", e)))?;

    // Dedup records: existence alone means "already processed". The TTL
    // comfortably outlives the platform's redelivery horizon.
    let processed_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.processed_events (
            external_id TEXT,
            processed_at BIGINT,
            PRIMARY KEY (external_id)
        ) WITH default_time_to_live = 172800
    "#,
        keyspace
    );

    session
        .query_unpaged(processed_table, &[])
        .await
        .map_err(|e| StoreError::Schema(format!("Failed to create processed_events table: {}", e)))?;

    // Quests: one immutable snapshot per completed talk
    let quests_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.quests (
            contact_id TEXT,
            talk_id TEXT,
            quest_id UUID,
            responses_json TEXT,
            summary_json TEXT,
            score INT,
            category TEXT,
            priority TEXT,
            submitted_at BIGINT,
            review_status TEXT,
            PRIMARY KEY ((contact_id), talk_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(quests_table, &[])
        .await
        .map_err(|e| StoreError::Schema(format!("Failed to create quests table: {}", e)))?;

    tracing::info!("All tables created successfully");
    Ok(())
}
