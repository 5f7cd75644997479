//! End-to-end router scenarios over the in-memory store

use async_trait::async_trait;
use leadbot_core::{BotStatus, Direction, MessageKind, TalkStatus};
use leadbot_persistence::{ConversationStore, InMemoryStore};
use leadbot_server::{router, AppState};
use leadbot_transport::{MessageSender, OutboundMessage, SendError, WebhookValue};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

const FROM: &str = "5511999990000";

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, OutboundMessage)>>,
}

impl RecordingSender {
    fn sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().clone()
    }

    fn bodies(&self) -> Vec<String> {
        self.sent()
            .iter()
            .map(|(_, m)| m.history_content())
            .collect()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, to: &str, message: &OutboundMessage) -> Result<(), SendError> {
        self.sent.lock().push((to.to_string(), message.clone()));
        Ok(())
    }
}

struct TestApp {
    state: AppState,
    store: Arc<InMemoryStore>,
    sender: Arc<RecordingSender>,
}

fn app() -> TestApp {
    app_with_window(chrono::Duration::hours(24))
}

fn app_with_window(window: chrono::Duration) -> TestApp {
    let store = Arc::new(InMemoryStore::new(window));
    let sender = Arc::new(RecordingSender::default());
    let state = AppState::new(
        leadbot_config::Settings::default(),
        store.clone(),
        sender.clone(),
        leadbot_catalog::QuizCatalog::default(),
    );
    TestApp {
        state,
        store,
        sender,
    }
}

fn text_event(message_id: &str, text: &str) -> WebhookValue {
    serde_json::from_value(json!({
        "contacts": [{ "profile": { "name": "Ana" }, "wa_id": FROM }],
        "messages": [{
            "from": FROM,
            "id": message_id,
            "timestamp": "1700000000",
            "type": "text",
            "text": { "body": text }
        }]
    }))
    .unwrap()
}

fn interaction_event(message_id: &str, reply_id: &str) -> WebhookValue {
    serde_json::from_value(json!({
        "contacts": [{ "profile": { "name": "Ana" }, "wa_id": FROM }],
        "messages": [{
            "from": FROM,
            "id": message_id,
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": { "id": reply_id, "title": "..." }
            }
        }]
    }))
    .unwrap()
}

fn template_button_event(message_id: &str, payload: &str) -> WebhookValue {
    serde_json::from_value(json!({
        "contacts": [{ "profile": { "name": "Ana" }, "wa_id": FROM }],
        "messages": [{
            "from": FROM,
            "id": message_id,
            "type": "button",
            "button": { "payload": payload, "text": payload }
        }]
    }))
    .unwrap()
}

fn audio_event(message_id: &str) -> WebhookValue {
    serde_json::from_value(json!({
        "messages": [{
            "from": FROM,
            "id": message_id,
            "type": "audio",
            "audio": { "id": "media1", "mime_type": "audio/ogg" }
        }]
    }))
    .unwrap()
}

fn status_event() -> WebhookValue {
    serde_json::from_value(json!({
        "statuses": [{
            "id": "wamid.out1",
            "status": "delivered",
            "recipient_id": FROM,
            "timestamp": "1700000001"
        }]
    }))
    .unwrap()
}

#[tokio::test]
async fn test_greeting_from_new_contact() {
    let app = app();

    router::handle_value(&app.state, text_event("m1", "oi")).await.unwrap();

    // Contact created, greeting template sent, status remains IDLE.
    let contact = app.store.contact(FROM).expect("contact created");
    assert_eq!(contact.bot_status, BotStatus::Idle);
    assert_eq!(contact.display_name, "Ana");

    let sent = app.sender.sent();
    assert_eq!(sent.len(), 1);
    match &sent[0].1 {
        OutboundMessage::Template {
            name, header_text, ..
        } => {
            assert_eq!(name, "welcome_gost_gothd");
            assert_eq!(header_text.as_deref(), Some("Ana"));
        }
        other => panic!("expected greeting template, got {other:?}"),
    }
}

#[tokio::test]
async fn test_quiz_answer_stores_raw_id_and_rerenders_menu() {
    let app = app();

    router::handle_value(&app.state, interaction_event("m1", "q1_vendas"))
        .await
        .unwrap();

    let contact = app.store.contact(FROM).unwrap();
    let talk_id = contact.active_talk_id.unwrap();
    let data = app
        .store
        .get_active_quiz_data(FROM, &talk_id)
        .await
        .unwrap();
    assert_eq!(data.get("q1").map(String::as_str), Some("q1_vendas"));

    let sent = app.sender.sent();
    assert_eq!(sent[0].1.history_content(), "✅ Resposta salva!");
    match &sent[1].1 {
        OutboundMessage::List { rows, .. } => {
            assert!(rows[0].title.starts_with("✅ "), "q1 must show as completed");
        }
        other => panic!("expected menu, got {other:?}"),
    }
}

#[tokio::test]
async fn test_redelivered_message_has_no_effect() {
    let app = app();

    router::handle_value(&app.state, text_event("m1", "oi")).await.unwrap();

    let contact = app.store.contact(FROM).unwrap();
    let talk_id = contact.active_talk_id.clone().unwrap();
    let messages_before = app.store.messages(FROM, &talk_id).len();
    let sends_before = app.sender.sent().len();

    // Same external id again: zero additional writes, zero additional sends.
    router::handle_value(&app.state, text_event("m1", "oi")).await.unwrap();

    assert_eq!(app.store.messages(FROM, &talk_id).len(), messages_before);
    assert_eq!(app.sender.sent().len(), sends_before);
}

#[tokio::test]
async fn test_human_states_are_silent_but_persist_messages() {
    for status in [BotStatus::HumanPending, BotStatus::HumanActive] {
        let app = app();
        app.store.get_or_create_contact(FROM, "Ana").await.unwrap();
        app.store.update_status(FROM, status, None).await.unwrap();

        router::handle_value(&app.state, text_event("m1", "alguém aí?"))
            .await
            .unwrap();

        // Message persisted, no bot reply, status untouched.
        let contact = app.store.contact(FROM).unwrap();
        assert_eq!(contact.bot_status, status);
        let talk_id = contact.active_talk_id.unwrap();
        let inbound: Vec<_> = app
            .store
            .messages(FROM, &talk_id)
            .into_iter()
            .filter(|m| m.direction == Direction::Inbound)
            .collect();
        assert_eq!(inbound.len(), 1);
        assert!(app.sender.sent().is_empty());
    }
}

#[tokio::test]
async fn test_closed_contact_resets_and_reenters_routing() {
    let app = app();
    app.store.get_or_create_contact(FROM, "Ana").await.unwrap();
    app.store
        .update_status(FROM, BotStatus::Closed, None)
        .await
        .unwrap();

    router::handle_value(&app.state, text_event("m1", "oi")).await.unwrap();

    assert_eq!(app.store.contact(FROM).unwrap().bot_status, BotStatus::Idle);
    // The greeting flowed after the reset.
    assert_eq!(app.sender.sent().len(), 1);
}

#[tokio::test]
async fn test_workflow_free_text_is_captured() {
    let app = app();
    app.store.get_or_create_contact(FROM, "Ana").await.unwrap();
    app.store
        .update_status(FROM, BotStatus::Workflow, Some("q4"))
        .await
        .unwrap();

    router::handle_value(&app.state, text_event("m1", "em uns 2 meses"))
        .await
        .unwrap();

    let contact = app.store.contact(FROM).unwrap();
    let talk_id = contact.active_talk_id.unwrap();
    let data = app
        .store
        .get_active_quiz_data(FROM, &talk_id)
        .await
        .unwrap();
    assert_eq!(data.get("q4").map(String::as_str), Some("em uns 2 meses"));
    assert_eq!(contact.bot_status, BotStatus::Idle);
}

#[tokio::test]
async fn test_idle_with_pending_step_resumes_workflow() {
    let app = app();
    app.store.get_or_create_contact(FROM, "Ana").await.unwrap();
    app.store
        .update_status(FROM, BotStatus::Idle, Some("q4"))
        .await
        .unwrap();

    router::handle_value(&app.state, text_event("m1", "voltei"))
        .await
        .unwrap();

    // Resumed question, not the progress menu.
    let contact = app.store.contact(FROM).unwrap();
    assert_eq!(contact.bot_status, BotStatus::Workflow);
    assert_eq!(contact.current_step.as_deref(), Some("q4"));

    let bodies = app.sender.bodies();
    assert!(bodies[0].contains("Você parou na etapa *Prazo*"));
    assert!(bodies[1].starts_with("Certo! E qual é o seu prazo"));
}

#[tokio::test]
async fn test_first_step_is_not_resumed() {
    let app = app();
    app.store.get_or_create_contact(FROM, "Ana").await.unwrap();
    app.store
        .update_status(FROM, BotStatus::Idle, Some("q1"))
        .await
        .unwrap();

    router::handle_value(&app.state, text_event("m1", "oi")).await.unwrap();

    // The first step never resumes; the greeting path handles the message.
    let contact = app.store.contact(FROM).unwrap();
    assert_eq!(contact.bot_status, BotStatus::Idle);
    assert!(matches!(
        app.sender.sent()[0].1,
        OutboundMessage::Template { .. }
    ));
}

#[tokio::test]
async fn test_start_quiz_template_button() {
    let app = app();

    router::handle_value(&app.state, template_button_event("m1", "Começar agora"))
        .await
        .unwrap();

    let contact = app.store.contact(FROM).unwrap();
    assert_eq!(contact.bot_status, BotStatus::Workflow);
    assert_eq!(contact.current_step.as_deref(), Some("q1"));
    // q1 has 3 options + exit: rendered as a list.
    assert!(matches!(app.sender.sent()[0].1, OutboundMessage::List { .. }));
}

#[tokio::test]
async fn test_menu_step_selection_asks_question() {
    let app = app();

    router::handle_value(&app.state, interaction_event("m1", "q4"))
        .await
        .unwrap();

    let contact = app.store.contact(FROM).unwrap();
    assert_eq!(contact.bot_status, BotStatus::Workflow);
    assert_eq!(contact.current_step.as_deref(), Some("q4"));
    assert!(app.sender.bodies()[0].starts_with("Certo! E qual é o seu prazo"));
}

#[tokio::test]
async fn test_site_keyword_opens_submenu() {
    let app = app();

    router::handle_value(&app.state, text_event("m1", "quero um site novo"))
        .await
        .unwrap();

    match &app.sender.sent()[0].1 {
        OutboundMessage::Buttons { buttons, .. } => {
            assert_eq!(buttons[0].id, "criar_site_info");
            assert_eq!(buttons[1].id, "criar_site_suporte");
        }
        other => panic!("expected submenu, got {other:?}"),
    }
}

#[tokio::test]
async fn test_site_support_button_hands_off() {
    let app = app();

    router::handle_value(&app.state, interaction_event("m1", "criar_site_suporte"))
        .await
        .unwrap();

    assert_eq!(
        app.store.contact(FROM).unwrap().bot_status,
        BotStatus::HumanPending
    );
}

#[tokio::test]
async fn test_unrecognized_text_falls_back() {
    let app = app();

    router::handle_value(&app.state, text_event("m1", "xyzzy plugh"))
        .await
        .unwrap();

    match &app.sender.sent()[0].1 {
        OutboundMessage::Buttons { body, .. } => {
            assert!(body.starts_with("Não entendi"));
        }
        other => panic!("expected fallback menu, got {other:?}"),
    }
}

#[tokio::test]
async fn test_media_without_caption_is_persisted_not_routed() {
    let app = app();

    router::handle_value(&app.state, audio_event("m1")).await.unwrap();

    let contact = app.store.contact(FROM).expect("contact still resolved");
    let talk_id = contact.active_talk_id.unwrap();
    let messages = app.store.messages(FROM, &talk_id);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].kind, MessageKind::Audio);
    assert!(app.sender.sent().is_empty());
}

#[tokio::test]
async fn test_delivery_statuses_are_logged_only() {
    let app = app();

    router::handle_value(&app.state, status_event()).await.unwrap();

    assert!(app.store.contact(FROM).is_none());
    assert!(app.sender.sent().is_empty());
}

#[tokio::test]
async fn test_expired_window_starts_fresh_session() {
    let app = app_with_window(chrono::Duration::zero());

    router::handle_value(&app.state, text_event("m1", "oi")).await.unwrap();
    let old_talk = app.store.contact(FROM).unwrap().active_talk_id.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    router::handle_value(&app.state, text_event("m2", "oi de novo"))
        .await
        .unwrap();

    let contact = app.store.contact(FROM).unwrap();
    let new_talk = contact.active_talk_id.unwrap();
    assert_ne!(old_talk, new_talk);
    assert_eq!(contact.bot_status, BotStatus::Idle);
    assert_eq!(
        app.store.talk(FROM, &old_talk).unwrap().status,
        TalkStatus::ExpiredWindow
    );
}

#[tokio::test]
async fn test_full_quiz_completion_produces_one_quest() {
    let app = app();

    // Answer every choice step through interactions and the text steps
    // through workflow answers.
    router::handle_value(&app.state, interaction_event("m1", "q1_vendas"))
        .await
        .unwrap();
    router::handle_value(&app.state, interaction_event("m2", "q2_sim"))
        .await
        .unwrap();
    router::handle_value(&app.state, interaction_event("m3", "q3_ecommerce"))
        .await
        .unwrap();
    router::handle_value(&app.state, interaction_event("m4", "q6_c"))
        .await
        .unwrap();

    // q4 next: pick it from the menu, then answer as text.
    router::handle_value(&app.state, interaction_event("m5", "q4"))
        .await
        .unwrap();
    router::handle_value(&app.state, text_event("m6", "urgente, para ontem"))
        .await
        .unwrap();

    // q5 is the single remaining step: the engine auto-asked it, so the
    // contact is already in WORKFLOW. Answering it completes the quiz.
    let contact = app.store.contact(FROM).unwrap();
    assert_eq!(contact.bot_status, BotStatus::Workflow);
    assert_eq!(contact.current_step.as_deref(), Some("q5"));
    router::handle_value(&app.state, text_event("m7", "https://exemplo.com"))
        .await
        .unwrap();

    let contact = app.store.contact(FROM).unwrap();
    assert_eq!(contact.bot_status, BotStatus::HumanPending);

    let talk_id = contact.active_talk_id.unwrap();
    let quest = app.store.quest_for_talk(&talk_id).expect("quest persisted");
    assert_eq!(quest.responses.len(), 6);
    assert_eq!(quest.summary.len(), 6);
    // Budget high (50) + urgency in q4 (20) + content ready (10).
    assert_eq!(quest.score, 80);
    assert_eq!(quest.category, leadbot_core::ProjectCategory::Ecommerce);
    assert_eq!(quest.priority, leadbot_core::LeadPriority::High);

    // And the completion hand-off message went out.
    let bodies = app.sender.bodies();
    assert!(bodies.last().unwrap().starts_with("🎉 Perfeito!"));
}
