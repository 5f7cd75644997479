//! The conversation store trait
//!
//! All durable state lives behind this trait. Webhook deliveries are
//! independent units of work; correctness under concurrent deliveries for
//! the same contact depends on the implementations keeping each operation
//! atomic, not on in-process locking in the callers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use leadbot_core::{
    BotStatus, Contact, LeadPriority, MessageKind, ProjectCategory, Quest, QuestSummaryItem,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::StoreError;

/// An inbound message about to be persisted.
#[derive(Debug, Clone)]
pub struct NewInbound {
    /// Externally-assigned message identifier.
    pub external_id: String,
    pub kind: MessageKind,
    /// Extracted textual content; empty for unsupported content kept only
    /// for history.
    pub content: String,
}

/// Everything the engine computed about a completed quiz, ready to persist.
#[derive(Debug, Clone)]
pub struct QuestDraft {
    pub responses: HashMap<String, String>,
    pub summary: Vec<QuestSummaryItem>,
    pub score: u32,
    pub category: ProjectCategory,
    pub priority: LeadPriority,
}

impl QuestDraft {
    pub fn into_quest(self, contact_id: &str, talk_id: &str) -> Quest {
        Quest {
            quest_id: Uuid::new_v4(),
            contact_id: contact_id.to_string(),
            talk_id: talk_id.to_string(),
            responses: self.responses,
            summary: self.summary,
            score: self.score,
            category: self.category,
            priority: self.priority,
            submitted_at: Utc::now(),
            review_status: Default::default(),
        }
    }
}

/// Persistence operations over contacts, talks, messages, dedup records and
/// quests.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Return the contact for `contact_id`, creating it together with its
    /// first talk on first sight. A missing active talk on an existing
    /// contact is healed by opening a fresh one.
    async fn get_or_create_contact(
        &self,
        contact_id: &str,
        display_name: &str,
    ) -> Result<Contact, StoreError>;

    /// Idempotency gate. The first call for an external message id durably
    /// records it and returns `false`; every later call returns `true`.
    /// Check-and-mark is a single atomic operation: two concurrent calls for
    /// the same id yield exactly one `false`.
    async fn is_message_processed(&self, external_id: &str) -> Result<bool, StoreError>;

    /// Persist an inbound message, applying the window-expiry policy first:
    /// if the previous session aged out, the old talk is marked
    /// `EXPIRED_WINDOW`, the bot status resets to `IDLE` and a fresh talk
    /// opens — all in the same atomic unit as the message append and the
    /// `last_inbound_at` refresh. Returns the contact as it stands after
    /// the write, so callers route on post-expiry state.
    async fn record_inbound(
        &self,
        contact_id: &str,
        message: NewInbound,
    ) -> Result<Contact, StoreError>;

    /// Append an outbound message to the active talk (opening one if needed).
    async fn record_outbound(
        &self,
        contact_id: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<(), StoreError>;

    /// Set the bot status and current step.
    async fn update_status(
        &self,
        contact_id: &str,
        status: BotStatus,
        step: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Mark the active talk `CLOSED` and reset the contact to `IDLE` with no
    /// step and no active talk. No-op when there is no active talk.
    async fn close_active_talk(&self, contact_id: &str) -> Result<(), StoreError>;

    /// True iff the contact's last inbound message is still inside the reply
    /// window. Callers must consult this before any unsolicited send and
    /// close the talk instead of sending when it returns false.
    async fn can_reply(&self, contact_id: &str) -> Result<bool, StoreError>;

    /// The active talk's raw quiz answers; empty when the talk is gone.
    async fn get_active_quiz_data(
        &self,
        contact_id: &str,
        talk_id: &str,
    ) -> Result<HashMap<String, String>, StoreError>;

    /// Merge one answer into the active talk's quiz data. Logs a warning and
    /// no-ops when there is no active talk.
    async fn save_quiz_response(
        &self,
        contact_id: &str,
        step_id: &str,
        answer: &str,
    ) -> Result<(), StoreError>;

    /// Persist the immutable quest snapshot for a completed quiz and move
    /// the contact to `HUMAN_PENDING`. At most one quest is created per
    /// talk; a replay returns the already-persisted quest.
    async fn submit_quest(
        &self,
        contact_id: &str,
        talk_id: &str,
        draft: QuestDraft,
    ) -> Result<Quest, StoreError>;
}

/// Window check shared by the implementations.
pub(crate) fn within_window(
    last_inbound_at: Option<DateTime<Utc>>,
    window: chrono::Duration,
    now: DateTime<Utc>,
) -> bool {
    match last_inbound_at {
        Some(last) => now - last < window,
        None => false,
    }
}
