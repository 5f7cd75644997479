//! ScyllaDB-backed conversation store
//!
//! Atomicity mapping:
//! - the idempotency check-and-mark and the one-quest-per-talk guarantee use
//!   lightweight transactions (`INSERT ... IF NOT EXISTS`)
//! - the window-expiry-and-reopen sequence, the contact-update plus
//!   message-append pair, and talk close-out run as logged batches

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadbot_core::{BotStatus, Contact, LeadPriority, MessageKind, ProjectCategory, Quest, ReviewStatus, TalkStatus};
use scylla::batch::Batch;
use scylla::frame::response::result::CqlValue;
use scylla::QueryResult;
use std::collections::HashMap;
use uuid::Uuid;

use crate::store::{within_window, ConversationStore, NewInbound, QuestDraft};
use crate::{ScyllaClient, StoreError};

/// Production conversation store on ScyllaDB.
#[derive(Clone)]
pub struct ScyllaStore {
    client: ScyllaClient,
    window: chrono::Duration,
}

impl ScyllaStore {
    pub fn new(client: ScyllaClient, window: chrono::Duration) -> Self {
        Self { client, window }
    }

    fn keyspace(&self) -> &str {
        self.client.keyspace()
    }

    /// Whether a conditional statement was applied ([applied] column).
    fn lwt_applied(result: &QueryResult) -> bool {
        result
            .rows
            .as_ref()
            .and_then(|rows| rows.first())
            .and_then(|row| row.columns.first())
            .and_then(|col| col.as_ref())
            .map(|value| matches!(value, CqlValue::Boolean(true)))
            .unwrap_or(false)
    }

    async fn load_contact(&self, contact_id: &str) -> Result<Option<Contact>, StoreError> {
        let query = format!(
            "SELECT display_name, bot_status, current_step, active_talk_id,
                    last_inbound_at, created_at
             FROM {}.contacts WHERE contact_id = ?",
            self.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (contact_id,))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(None);
        };

        let (display_name, bot_status, current_step, active_talk_id, last_inbound_at, created_at): (
            Option<String>,
            Option<String>,
            Option<String>,
            Option<String>,
            Option<i64>,
            Option<i64>,
        ) = row
            .into_typed()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        Ok(Some(Contact {
            contact_id: contact_id.to_string(),
            display_name: display_name.unwrap_or_default(),
            bot_status: BotStatus::from_str(bot_status.as_deref().unwrap_or("IDLE")),
            current_step,
            active_talk_id,
            last_inbound_at: last_inbound_at.and_then(DateTime::from_timestamp_millis),
            created_at: created_at
                .and_then(DateTime::from_timestamp_millis)
                .unwrap_or_else(Utc::now),
        }))
    }

    /// Open a fresh talk and point the contact at it, as one logged batch.
    async fn open_talk(&self, contact_id: &str) -> Result<String, StoreError> {
        let talk_id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();

        let mut batch = Batch::default();
        batch.append_statement(
            format!(
                "INSERT INTO {}.talks (contact_id, talk_id, status, started_at) VALUES (?, ?, ?, ?)",
                self.keyspace()
            )
            .as_str(),
        );
        batch.append_statement(
            format!(
                "UPDATE {}.contacts SET active_talk_id = ? WHERE contact_id = ?",
                self.keyspace()
            )
            .as_str(),
        );

        self.client
            .session()
            .batch(
                &batch,
                (
                    (contact_id, talk_id.as_str(), TalkStatus::Open.as_str(), now),
                    (talk_id.as_str(), contact_id),
                ),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(talk_id)
    }

    async fn insert_message(
        &self,
        contact_id: &str,
        talk_id: &str,
        external_id: &str,
        direction: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<(), StoreError> {
        let query = format!(
            "INSERT INTO {}.messages
                 (contact_id, talk_id, external_id, direction, kind, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    contact_id,
                    talk_id,
                    external_id,
                    direction,
                    kind.as_str(),
                    content,
                    Utc::now().timestamp_millis(),
                ),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for ScyllaStore {
    async fn get_or_create_contact(
        &self,
        contact_id: &str,
        display_name: &str,
    ) -> Result<Contact, StoreError> {
        if let Some(mut contact) = self.load_contact(contact_id).await? {
            if contact.active_talk_id.is_none() {
                let talk_id = self.open_talk(contact_id).await?;
                tracing::info!(contact_id = %contact_id, talk_id = %talk_id, "Opened replacement talk");
                contact.active_talk_id = Some(talk_id);
            }
            return Ok(contact);
        }

        // First contact: the LWT insert carries the first talk's id, so a
        // concurrent create resolves to exactly one winner. The talk row
        // itself follows; a crash in between leaves a dangling id that reads
        // as an empty talk and is rewritten by the next message.
        let contact = Contact::new(contact_id, display_name);
        let talk_id = Uuid::new_v4().to_string();
        let now = Utc::now().timestamp_millis();

        let insert = format!(
            "INSERT INTO {}.contacts
                 (contact_id, display_name, bot_status, current_step, active_talk_id,
                  last_inbound_at, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(
                insert,
                (
                    contact_id,
                    display_name,
                    BotStatus::Idle.as_str(),
                    Option::<String>::None,
                    talk_id.as_str(),
                    now,
                    now,
                ),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if !Self::lwt_applied(&result) {
            // Lost the race; the other delivery created the contact.
            return self
                .load_contact(contact_id)
                .await?
                .ok_or_else(|| StoreError::ContactNotFound(contact_id.to_string()));
        }

        let talk_insert = format!(
            "INSERT INTO {}.talks (contact_id, talk_id, status, started_at) VALUES (?, ?, ?, ?)",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                talk_insert,
                (contact_id, talk_id.as_str(), TalkStatus::Open.as_str(), now),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(contact_id = %contact_id, "Created contact");
        Ok(Contact {
            active_talk_id: Some(talk_id),
            ..contact
        })
    }

    async fn is_message_processed(&self, external_id: &str) -> Result<bool, StoreError> {
        let query = format!(
            "INSERT INTO {}.processed_events (external_id, processed_at) VALUES (?, ?) IF NOT EXISTS",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (external_id, Utc::now().timestamp_millis()))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        // Applied means this is the first sighting.
        Ok(!Self::lwt_applied(&result))
    }

    async fn record_inbound(
        &self,
        contact_id: &str,
        message: NewInbound,
    ) -> Result<Contact, StoreError> {
        let mut contact = self
            .load_contact(contact_id)
            .await?
            .ok_or_else(|| StoreError::ContactNotFound(contact_id.to_string()))?;

        let now = Utc::now();
        let now_ms = now.timestamp_millis();
        let expired = contact.last_inbound_at.is_some()
            && !within_window(contact.last_inbound_at, self.window, now);

        let ks = self.keyspace();
        let expire_talk = format!(
            "UPDATE {ks}.talks SET status = ?, closed_at = ? WHERE contact_id = ? AND talk_id = ?"
        );
        let insert_talk = format!(
            "INSERT INTO {ks}.talks (contact_id, talk_id, status, started_at) VALUES (?, ?, ?, ?)"
        );
        let reset_contact = format!(
            "UPDATE {ks}.contacts SET bot_status = ?, current_step = ?, active_talk_id = ?,
                 last_inbound_at = ? WHERE contact_id = ?"
        );
        let touch_contact =
            format!("UPDATE {ks}.contacts SET last_inbound_at = ? WHERE contact_id = ?");
        let insert_message = format!(
            "INSERT INTO {ks}.messages
                 (contact_id, talk_id, external_id, direction, kind, content, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)"
        );

        if expired {
            let old_talk = contact.active_talk_id.take();
            let talk_id = Uuid::new_v4().to_string();
            tracing::info!(
                contact_id = %contact_id,
                old_talk = ?old_talk,
                talk_id = %talk_id,
                "Reply window elapsed; expired talk and opened a new session"
            );

            let message_values = (
                contact_id,
                talk_id.as_str(),
                message.external_id.as_str(),
                "INBOUND",
                message.kind.as_str(),
                message.content.as_str(),
                now_ms,
            );
            let reset_values = (
                BotStatus::Idle.as_str(),
                Option::<String>::None,
                talk_id.as_str(),
                now_ms,
                contact_id,
            );
            let talk_values = (contact_id, talk_id.as_str(), TalkStatus::Open.as_str(), now_ms);

            if let Some(old_talk_id) = &old_talk {
                let mut batch = Batch::default();
                batch.append_statement(expire_talk.as_str());
                batch.append_statement(insert_talk.as_str());
                batch.append_statement(reset_contact.as_str());
                batch.append_statement(insert_message.as_str());
                self.client
                    .session()
                    .batch(
                        &batch,
                        (
                            (
                                TalkStatus::ExpiredWindow.as_str(),
                                now_ms,
                                contact_id,
                                old_talk_id.as_str(),
                            ),
                            talk_values,
                            reset_values,
                            message_values,
                        ),
                    )
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            } else {
                let mut batch = Batch::default();
                batch.append_statement(insert_talk.as_str());
                batch.append_statement(reset_contact.as_str());
                batch.append_statement(insert_message.as_str());
                self.client
                    .session()
                    .batch(&batch, (talk_values, reset_values, message_values))
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
            }

            contact.bot_status = BotStatus::Idle;
            contact.current_step = None;
            contact.active_talk_id = Some(talk_id);
            contact.last_inbound_at = Some(now);
            return Ok(contact);
        }

        // Session still open: refresh the window and append, creating the
        // talk lazily when it is missing.
        let talk_id = match contact.active_talk_id.clone() {
            Some(talk_id) => {
                let mut batch = Batch::default();
                batch.append_statement(touch_contact.as_str());
                batch.append_statement(insert_message.as_str());
                self.client
                    .session()
                    .batch(
                        &batch,
                        (
                            (now_ms, contact_id),
                            (
                                contact_id,
                                talk_id.as_str(),
                                message.external_id.as_str(),
                                "INBOUND",
                                message.kind.as_str(),
                                message.content.as_str(),
                                now_ms,
                            ),
                        ),
                    )
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                talk_id
            }
            None => {
                let talk_id = Uuid::new_v4().to_string();
                let set_talk = format!(
                    "UPDATE {ks}.contacts SET active_talk_id = ?, last_inbound_at = ?
                         WHERE contact_id = ?"
                );
                let mut batch = Batch::default();
                batch.append_statement(insert_talk.as_str());
                batch.append_statement(set_talk.as_str());
                batch.append_statement(insert_message.as_str());
                self.client
                    .session()
                    .batch(
                        &batch,
                        (
                            (contact_id, talk_id.as_str(), TalkStatus::Open.as_str(), now_ms),
                            (talk_id.as_str(), now_ms, contact_id),
                            (
                                contact_id,
                                talk_id.as_str(),
                                message.external_id.as_str(),
                                "INBOUND",
                                message.kind.as_str(),
                                message.content.as_str(),
                                now_ms,
                            ),
                        ),
                    )
                    .await
                    .map_err(|e| StoreError::Database(e.to_string()))?;
                talk_id
            }
        };

        contact.active_talk_id = Some(talk_id);
        contact.last_inbound_at = Some(now);
        Ok(contact)
    }

    async fn record_outbound(
        &self,
        contact_id: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<(), StoreError> {
        let contact = self
            .load_contact(contact_id)
            .await?
            .ok_or_else(|| StoreError::ContactNotFound(contact_id.to_string()))?;

        let talk_id = match contact.active_talk_id {
            Some(talk_id) => talk_id,
            None => self.open_talk(contact_id).await?,
        };

        let external_id = format!("out-{}", Uuid::new_v4());
        self.insert_message(contact_id, &talk_id, &external_id, "OUTBOUND", kind, content)
            .await
    }

    async fn update_status(
        &self,
        contact_id: &str,
        status: BotStatus,
        step: Option<&str>,
    ) -> Result<(), StoreError> {
        let query = format!(
            "UPDATE {}.contacts SET bot_status = ?, current_step = ? WHERE contact_id = ?",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(query, (status.as_str(), step, contact_id))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn close_active_talk(&self, contact_id: &str) -> Result<(), StoreError> {
        let Some(contact) = self.load_contact(contact_id).await? else {
            return Ok(());
        };
        let Some(talk_id) = contact.active_talk_id else {
            return Ok(());
        };

        let ks = self.keyspace();
        let mut batch = Batch::default();
        batch.append_statement(
            format!("UPDATE {ks}.talks SET status = ?, closed_at = ? WHERE contact_id = ? AND talk_id = ?")
                .as_str(),
        );
        batch.append_statement(
            format!(
                "UPDATE {ks}.contacts SET active_talk_id = ?, bot_status = ?, current_step = ?
                     WHERE contact_id = ?"
            )
            .as_str(),
        );

        self.client
            .session()
            .batch(
                &batch,
                (
                    (
                        TalkStatus::Closed.as_str(),
                        Utc::now().timestamp_millis(),
                        contact_id,
                        talk_id.as_str(),
                    ),
                    (
                        Option::<String>::None,
                        BotStatus::Idle.as_str(),
                        Option::<String>::None,
                        contact_id,
                    ),
                ),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(contact_id = %contact_id, talk_id = %talk_id, "Closed active talk");
        Ok(())
    }

    async fn can_reply(&self, contact_id: &str) -> Result<bool, StoreError> {
        let Some(contact) = self.load_contact(contact_id).await? else {
            return Ok(false);
        };
        Ok(within_window(contact.last_inbound_at, self.window, Utc::now()))
    }

    async fn get_active_quiz_data(
        &self,
        contact_id: &str,
        talk_id: &str,
    ) -> Result<HashMap<String, String>, StoreError> {
        let query = format!(
            "SELECT quiz_data FROM {}.talks WHERE contact_id = ? AND talk_id = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (contact_id, talk_id))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(HashMap::new());
        };

        let (quiz_data,): (Option<HashMap<String, String>>,) = row
            .into_typed()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        Ok(quiz_data.unwrap_or_default())
    }

    async fn save_quiz_response(
        &self,
        contact_id: &str,
        step_id: &str,
        answer: &str,
    ) -> Result<(), StoreError> {
        let Some(contact) = self.load_contact(contact_id).await? else {
            tracing::warn!(contact_id = %contact_id, "Quiz answer for unknown contact dropped");
            return Ok(());
        };
        let Some(talk_id) = contact.active_talk_id else {
            tracing::warn!(
                contact_id = %contact_id,
                step_id = %step_id,
                "Quiz answer arrived with no active talk; dropped"
            );
            return Ok(());
        };

        // Single-partition map update: concurrent answers for different
        // steps merge instead of clobbering each other.
        let query = format!(
            "UPDATE {}.talks SET quiz_data[?] = ?, updated_at = ?
                 WHERE contact_id = ? AND talk_id = ?",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    step_id,
                    answer,
                    Utc::now().timestamp_millis(),
                    contact_id,
                    talk_id.as_str(),
                ),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        Ok(())
    }

    async fn submit_quest(
        &self,
        contact_id: &str,
        talk_id: &str,
        draft: QuestDraft,
    ) -> Result<Quest, StoreError> {
        let quest = draft.into_quest(contact_id, talk_id);
        let responses_json = serde_json::to_string(&quest.responses)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let summary_json = serde_json::to_string(&quest.summary)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        let insert = format!(
            "INSERT INTO {}.quests
                 (contact_id, talk_id, quest_id, responses_json, summary_json,
                  score, category, priority, submitted_at, review_status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) IF NOT EXISTS",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(
                insert,
                (
                    contact_id,
                    talk_id,
                    quest.quest_id,
                    responses_json.as_str(),
                    summary_json.as_str(),
                    quest.score as i32,
                    quest.category.as_str(),
                    quest.priority.as_str(),
                    quest.submitted_at.timestamp_millis(),
                    quest.review_status.as_str(),
                ),
            )
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if !Self::lwt_applied(&result) {
            tracing::warn!(talk_id = %talk_id, "Quest already submitted for talk; returning existing");
            return self.load_quest(contact_id, talk_id).await;
        }

        self.update_status(contact_id, BotStatus::HumanPending, None)
            .await?;

        tracing::info!(
            contact_id = %contact_id,
            talk_id = %talk_id,
            score = quest.score,
            category = quest.category.as_str(),
            priority = quest.priority.as_str(),
            "Quest submitted; contact handed off"
        );
        Ok(quest)
    }
}

impl ScyllaStore {
    async fn load_quest(&self, contact_id: &str, talk_id: &str) -> Result<Quest, StoreError> {
        let query = format!(
            "SELECT quest_id, responses_json, summary_json, score, category, priority,
                    submitted_at, review_status
             FROM {}.quests WHERE contact_id = ? AND talk_id = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (contact_id, talk_id))
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let row = result
            .rows
            .and_then(|rows| rows.into_iter().next())
            .ok_or_else(|| {
                StoreError::InvalidData(format!("quest missing for talk {talk_id}"))
            })?;

        let (quest_id, responses_json, summary_json, score, category, priority, submitted_at, review_status): (
            Uuid,
            String,
            String,
            i32,
            String,
            String,
            i64,
            String,
        ) = row
            .into_typed()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;

        Ok(Quest {
            quest_id,
            contact_id: contact_id.to_string(),
            talk_id: talk_id.to_string(),
            responses: serde_json::from_str(&responses_json)
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            summary: serde_json::from_str(&summary_json)
                .map_err(|e| StoreError::InvalidData(e.to_string()))?,
            score: score.max(0) as u32,
            category: ProjectCategory::from_str(&category),
            priority: LeadPriority::from_str(&priority),
            submitted_at: DateTime::from_timestamp_millis(submitted_at).unwrap_or_else(Utc::now),
            review_status: ReviewStatus::from_str(&review_status),
        })
    }
}
