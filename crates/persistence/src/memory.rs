//! In-memory conversation store
//!
//! Default backend for development and tests — same semantics as the
//! ScyllaDB store, state gone on restart. Every operation runs under one
//! lock, which gives the per-operation atomicity the router relies on.

use async_trait::async_trait;
use chrono::Utc;
use leadbot_core::{
    BotStatus, Contact, Direction, MessageKind, MessageRecord, Quest, Talk, TalkStatus,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::store::{within_window, ConversationStore, NewInbound, QuestDraft};
use crate::StoreError;

struct ContactState {
    contact: Contact,
    talks: HashMap<String, Talk>,
    /// Messages per talk, keyed by external id so replayed writes land on
    /// the same record.
    messages: HashMap<String, Vec<MessageRecord>>,
}

impl ContactState {
    fn new(contact: Contact) -> Self {
        Self {
            contact,
            talks: HashMap::new(),
            messages: HashMap::new(),
        }
    }
}

#[derive(Default)]
struct Inner {
    contacts: HashMap<String, ContactState>,
    processed: HashSet<String>,
    /// Quests keyed by talk id (at most one per talk).
    quests: HashMap<String, Quest>,
}

/// In-memory store (default for development).
pub struct InMemoryStore {
    window: chrono::Duration,
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new(window: chrono::Duration) -> Self {
        Self {
            window,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Inspection helpers for tests and diagnostics.
    pub fn contact(&self, contact_id: &str) -> Option<Contact> {
        self.inner
            .lock()
            .contacts
            .get(contact_id)
            .map(|s| s.contact.clone())
    }

    pub fn talk(&self, contact_id: &str, talk_id: &str) -> Option<Talk> {
        self.inner
            .lock()
            .contacts
            .get(contact_id)
            .and_then(|s| s.talks.get(talk_id).cloned())
    }

    pub fn messages(&self, contact_id: &str, talk_id: &str) -> Vec<MessageRecord> {
        self.inner
            .lock()
            .contacts
            .get(contact_id)
            .and_then(|s| s.messages.get(talk_id).cloned())
            .unwrap_or_default()
    }

    pub fn quest_for_talk(&self, talk_id: &str) -> Option<Quest> {
        self.inner.lock().quests.get(talk_id).cloned()
    }

    fn ensure_active_talk(state: &mut ContactState) -> String {
        if let Some(talk_id) = &state.contact.active_talk_id {
            return talk_id.clone();
        }
        let talk = Talk::open();
        let talk_id = talk.talk_id.clone();
        state.talks.insert(talk_id.clone(), talk);
        state.contact.active_talk_id = Some(talk_id.clone());
        talk_id
    }

    fn append_message(state: &mut ContactState, talk_id: &str, record: MessageRecord) {
        let messages = state.messages.entry(talk_id.to_string()).or_default();
        if let Some(existing) = messages
            .iter_mut()
            .find(|m| m.external_id == record.external_id)
        {
            *existing = record;
        } else {
            messages.push(record);
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(chrono::Duration::hours(24))
    }
}

#[async_trait]
impl ConversationStore for InMemoryStore {
    async fn get_or_create_contact(
        &self,
        contact_id: &str,
        display_name: &str,
    ) -> Result<Contact, StoreError> {
        let mut inner = self.inner.lock();

        if let Some(state) = inner.contacts.get_mut(contact_id) {
            // Self-heal: an existing contact must always have an active talk.
            if state.contact.active_talk_id.is_none() {
                let talk_id = Self::ensure_active_talk(state);
                tracing::info!(contact_id = %contact_id, talk_id = %talk_id, "Opened replacement talk");
            }
            return Ok(state.contact.clone());
        }

        // Contact and its first talk come into existence together.
        let mut state = ContactState::new(Contact::new(contact_id, display_name));
        Self::ensure_active_talk(&mut state);
        let contact = state.contact.clone();
        inner.contacts.insert(contact_id.to_string(), state);
        tracing::info!(contact_id = %contact_id, "Created contact");
        Ok(contact)
    }

    async fn is_message_processed(&self, external_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        // insert() is the atomic check-and-mark: false means already present.
        Ok(!inner.processed.insert(external_id.to_string()))
    }

    async fn record_inbound(
        &self,
        contact_id: &str,
        message: NewInbound,
    ) -> Result<Contact, StoreError> {
        let mut inner = self.inner.lock();
        let state = inner
            .contacts
            .get_mut(contact_id)
            .ok_or_else(|| StoreError::ContactNotFound(contact_id.to_string()))?;

        let now = Utc::now();

        // Window-expiry policy: a stale session is closed out before the new
        // message is attached anywhere.
        if state.contact.last_inbound_at.is_some()
            && !within_window(state.contact.last_inbound_at, self.window, now)
        {
            if let Some(old_talk_id) = state.contact.active_talk_id.take() {
                if let Some(talk) = state.talks.get_mut(&old_talk_id) {
                    talk.status = TalkStatus::ExpiredWindow;
                    talk.closed_at = Some(now);
                }
                tracing::info!(
                    contact_id = %contact_id,
                    talk_id = %old_talk_id,
                    "Reply window elapsed; expired talk and opened a new session"
                );
            }
            state.contact.bot_status = BotStatus::Idle;
            state.contact.current_step = None;
        }

        state.contact.last_inbound_at = Some(now);
        let talk_id = Self::ensure_active_talk(state);

        Self::append_message(
            state,
            &talk_id,
            MessageRecord {
                external_id: message.external_id,
                direction: Direction::Inbound,
                kind: message.kind,
                content: message.content,
                created_at: now,
            },
        );

        Ok(state.contact.clone())
    }

    async fn record_outbound(
        &self,
        contact_id: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner
            .contacts
            .get_mut(contact_id)
            .ok_or_else(|| StoreError::ContactNotFound(contact_id.to_string()))?;

        let talk_id = Self::ensure_active_talk(state);
        Self::append_message(
            state,
            &talk_id,
            MessageRecord {
                external_id: format!("out-{}", Uuid::new_v4()),
                direction: Direction::Outbound,
                kind,
                content: content.to_string(),
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn update_status(
        &self,
        contact_id: &str,
        status: BotStatus,
        step: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let state = inner
            .contacts
            .get_mut(contact_id)
            .ok_or_else(|| StoreError::ContactNotFound(contact_id.to_string()))?;
        state.contact.bot_status = status;
        state.contact.current_step = step.map(str::to_string);
        Ok(())
    }

    async fn close_active_talk(&self, contact_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(state) = inner.contacts.get_mut(contact_id) else {
            return Ok(());
        };

        if let Some(talk_id) = state.contact.active_talk_id.take() {
            if let Some(talk) = state.talks.get_mut(&talk_id) {
                talk.status = TalkStatus::Closed;
                talk.closed_at = Some(Utc::now());
            }
            state.contact.bot_status = BotStatus::Idle;
            state.contact.current_step = None;
            tracing::info!(contact_id = %contact_id, talk_id = %talk_id, "Closed active talk");
        }
        Ok(())
    }

    async fn can_reply(&self, contact_id: &str) -> Result<bool, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .contacts
            .get(contact_id)
            .is_some_and(|s| within_window(s.contact.last_inbound_at, self.window, Utc::now())))
    }

    async fn get_active_quiz_data(
        &self,
        contact_id: &str,
        talk_id: &str,
    ) -> Result<HashMap<String, String>, StoreError> {
        let inner = self.inner.lock();
        Ok(inner
            .contacts
            .get(contact_id)
            .and_then(|s| s.talks.get(talk_id))
            .map(|t| t.quiz_data.clone())
            .unwrap_or_default())
    }

    async fn save_quiz_response(
        &self,
        contact_id: &str,
        step_id: &str,
        answer: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        let Some(state) = inner.contacts.get_mut(contact_id) else {
            tracing::warn!(contact_id = %contact_id, "Quiz answer for unknown contact dropped");
            return Ok(());
        };

        let Some(talk_id) = state.contact.active_talk_id.clone() else {
            tracing::warn!(
                contact_id = %contact_id,
                step_id = %step_id,
                "Quiz answer arrived with no active talk; dropped"
            );
            return Ok(());
        };

        if let Some(talk) = state.talks.get_mut(&talk_id) {
            talk.quiz_data
                .insert(step_id.to_string(), answer.to_string());
            talk.updated_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn submit_quest(
        &self,
        contact_id: &str,
        talk_id: &str,
        draft: QuestDraft,
    ) -> Result<Quest, StoreError> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.quests.get(talk_id) {
            tracing::warn!(talk_id = %talk_id, "Quest already submitted for talk; returning existing");
            return Ok(existing.clone());
        }

        let quest = draft.into_quest(contact_id, talk_id);
        inner.quests.insert(talk_id.to_string(), quest.clone());

        if let Some(state) = inner.contacts.get_mut(contact_id) {
            state.contact.bot_status = BotStatus::HumanPending;
            state.contact.current_step = None;
        }

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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn inbound(id: &str, content: &str) -> NewInbound {
        NewInbound {
            external_id: id.to_string(),
            kind: MessageKind::Text,
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn test_contact_created_with_first_talk() {
        let store = InMemoryStore::default();
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();

        assert_eq!(contact.bot_status, BotStatus::Idle);
        let talk_id = contact.active_talk_id.expect("first talk must exist");
        let talk = store.talk("5511999", &talk_id).unwrap();
        assert_eq!(talk.status, TalkStatus::Open);
    }

    #[tokio::test]
    async fn test_existing_contact_is_returned() {
        let store = InMemoryStore::default();
        let first = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let second = store.get_or_create_contact("5511999", "").await.unwrap();
        assert_eq!(first.active_talk_id, second.active_talk_id);
        assert_eq!(second.display_name, "Ana");
    }

    #[tokio::test]
    async fn test_missing_talk_is_healed() {
        let store = InMemoryStore::default();
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let old_talk = contact.active_talk_id.unwrap();

        store.close_active_talk("5511999").await.unwrap();
        let healed = store.get_or_create_contact("5511999", "").await.unwrap();
        let new_talk = healed.active_talk_id.expect("talk must be recreated");
        assert_ne!(old_talk, new_talk);
    }

    #[tokio::test]
    async fn test_idempotency_gate() {
        let store = InMemoryStore::default();
        assert!(!store.is_message_processed("m1").await.unwrap());
        assert!(store.is_message_processed("m1").await.unwrap());
        assert!(!store.is_message_processed("m2").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_idempotency_gate_under_concurrency() {
        let store = Arc::new(InMemoryStore::default());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.is_message_processed("dup").await.unwrap()
            }));
        }

        let mut fresh = 0;
        for handle in handles {
            if !handle.await.unwrap() {
                fresh += 1;
            }
        }
        assert_eq!(fresh, 1, "exactly one delivery may pass the gate");
    }

    #[tokio::test]
    async fn test_inbound_within_window_reuses_talk() {
        let store = InMemoryStore::default();
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let talk_id = contact.active_talk_id.clone().unwrap();

        let refreshed = store
            .record_inbound("5511999", inbound("m1", "oi"))
            .await
            .unwrap();
        assert_eq!(refreshed.active_talk_id.as_deref(), Some(talk_id.as_str()));
        assert_eq!(store.messages("5511999", &talk_id).len(), 1);
    }

    #[tokio::test]
    async fn test_expired_window_opens_new_talk_and_resets_status() {
        // Zero-width window: any elapsed time expires the session.
        let store = InMemoryStore::new(chrono::Duration::zero());
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let old_talk = contact.active_talk_id.clone().unwrap();
        store
            .update_status("5511999", BotStatus::Workflow, Some("q4"))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let refreshed = store
            .record_inbound("5511999", inbound("m2", "voltei"))
            .await
            .unwrap();

        assert_eq!(refreshed.bot_status, BotStatus::Idle);
        assert_eq!(refreshed.current_step, None);
        let new_talk = refreshed.active_talk_id.unwrap();
        assert_ne!(old_talk, new_talk);
        assert_eq!(
            store.talk("5511999", &old_talk).unwrap().status,
            TalkStatus::ExpiredWindow
        );
        // The new message belongs to the new session.
        assert_eq!(store.messages("5511999", &new_talk).len(), 1);
    }

    #[tokio::test]
    async fn test_replayed_message_write_is_idempotent() {
        let store = InMemoryStore::default();
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let talk_id = contact.active_talk_id.unwrap();

        store
            .record_inbound("5511999", inbound("m1", "oi"))
            .await
            .unwrap();
        store
            .record_inbound("5511999", inbound("m1", "oi"))
            .await
            .unwrap();
        assert_eq!(store.messages("5511999", &talk_id).len(), 1);
    }

    #[tokio::test]
    async fn test_can_reply_tracks_window() {
        let store = InMemoryStore::default();
        assert!(!store.can_reply("nobody").await.unwrap());

        store.get_or_create_contact("5511999", "Ana").await.unwrap();
        store
            .record_inbound("5511999", inbound("m1", "oi"))
            .await
            .unwrap();
        assert!(store.can_reply("5511999").await.unwrap());

        let blocked = InMemoryStore::new(chrono::Duration::zero());
        blocked.get_or_create_contact("5511888", "Bia").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert!(!blocked.can_reply("5511888").await.unwrap());
    }

    #[tokio::test]
    async fn test_quiz_response_without_talk_is_dropped() {
        let store = InMemoryStore::default();
        store.get_or_create_contact("5511999", "Ana").await.unwrap();
        store.close_active_talk("5511999").await.unwrap();

        // Must not error; the warning is the contract.
        store
            .save_quiz_response("5511999", "q1", "q1_vendas")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_quiz_responses_merge() {
        let store = InMemoryStore::default();
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let talk_id = contact.active_talk_id.unwrap();

        store
            .save_quiz_response("5511999", "q1", "q1_vendas")
            .await
            .unwrap();
        store
            .save_quiz_response("5511999", "q4", "2 meses")
            .await
            .unwrap();

        let data = store
            .get_active_quiz_data("5511999", &talk_id)
            .await
            .unwrap();
        assert_eq!(data.get("q1").map(String::as_str), Some("q1_vendas"));
        assert_eq!(data.get("q4").map(String::as_str), Some("2 meses"));
    }

    #[tokio::test]
    async fn test_submit_quest_hands_off_and_is_unique_per_talk() {
        let store = InMemoryStore::default();
        let contact = store.get_or_create_contact("5511999", "Ana").await.unwrap();
        let talk_id = contact.active_talk_id.unwrap();

        let draft = QuestDraft {
            responses: HashMap::from([("q1".to_string(), "q1_vendas".to_string())]),
            summary: vec![],
            score: 50,
            category: leadbot_core::ProjectCategory::Ecommerce,
            priority: leadbot_core::LeadPriority::Medium,
        };

        let quest = store
            .submit_quest("5511999", &talk_id, draft.clone())
            .await
            .unwrap();
        assert_eq!(
            store.contact("5511999").unwrap().bot_status,
            BotStatus::HumanPending
        );

        let replay = store
            .submit_quest("5511999", &talk_id, draft)
            .await
            .unwrap();
        assert_eq!(quest.quest_id, replay.quest_id);
    }
}
