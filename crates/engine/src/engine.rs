//! Quiz flow driver

use leadbot_catalog::{QuestionType, QuizCatalog};
use leadbot_config::constants::{
    ANSWER_SEPARATOR, EXIT_TO_AGENT_ID, HANDOFF_KEYWORDS, MAX_BUTTONS, SITE_INFO_ID,
    SITE_MENU_ID, SITE_SUPPORT_ID,
};
use leadbot_config::Settings;
use leadbot_core::BotStatus;
use leadbot_persistence::ConversationStore;
use leadbot_text_processing::normalize;
use leadbot_transport::{ButtonOption, ListRow, MessageSender, OutboundMessage};
use std::sync::Arc;

use crate::{replies, scoring, EngineError};

/// Drives the scripted quiz: question selection, answer capture, progress
/// menus, completion hand-off. All state lives in the store; the engine is
/// freely shared across handler invocations.
pub struct QuizEngine {
    store: Arc<dyn ConversationStore>,
    sender: Arc<dyn MessageSender>,
    catalog: Arc<QuizCatalog>,
    settings: Arc<Settings>,
}

impl QuizEngine {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        sender: Arc<dyn MessageSender>,
        catalog: Arc<QuizCatalog>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            store,
            sender,
            catalog,
            settings,
        }
    }

    pub fn catalog(&self) -> &QuizCatalog {
        &self.catalog
    }

    /// Window-gated send. Outside the reply window the send is converted
    /// into a talk close — a defined transition, not an error. Returns
    /// whether the message went out.
    async fn safe_send(&self, to: &str, message: OutboundMessage) -> Result<bool, EngineError> {
        if !self.store.can_reply(to).await? {
            tracing::warn!(
                contact_id = %to,
                "Reply window closed; dropping outbound send and closing talk"
            );
            metrics::counter!("leadbot_window_blocks_total").increment(1);
            self.store.close_active_talk(to).await?;
            return Ok(false);
        }

        self.sender.send(to, &message).await?;
        self.store
            .record_outbound(to, message.kind(), &message.history_content())
            .await?;
        Ok(true)
    }

    /// Greet a new conversation with the welcome template. Templates are the
    /// one payload the platform accepts outside the reply window, so this
    /// send is not gated.
    pub async fn greet(&self, to: &str, display_name: &str) -> Result<(), EngineError> {
        let whatsapp = &self.settings.whatsapp;
        let message = OutboundMessage::Template {
            name: whatsapp.welcome_template.clone(),
            language: whatsapp.language.clone(),
            header_text: Some(display_name.to_string()),
            body_texts: vec![],
            button_payloads: vec![],
        };

        self.sender.send(to, &message).await?;
        self.store
            .record_outbound(to, message.kind(), &message.history_content())
            .await?;
        Ok(())
    }

    /// Enter (or re-enter) the quiz. Three cases on the remaining steps:
    /// none → submit the quest and hand off; one → ask it straight away;
    /// several → show the progress menu.
    pub async fn start(&self, to: &str) -> Result<(), EngineError> {
        let contact = self.store.get_or_create_contact(to, "").await?;
        let Some(talk_id) = contact.active_talk_id else {
            return self.fallback(to, "session without active talk", None).await;
        };

        let responses = self.store.get_active_quiz_data(to, &talk_id).await?;
        let remaining = self.catalog.remaining_steps(&responses);

        match remaining.len() {
            0 => {
                let draft = scoring::build_quest_draft(
                    &self.catalog,
                    &self.settings.scoring,
                    responses,
                );
                self.store.submit_quest(to, &talk_id, draft).await?;
                metrics::counter!("leadbot_quests_submitted_total").increment(1);

                self.safe_send(to, OutboundMessage::text(replies::COMPLETION_BODY))
                    .await?;
                Ok(())
            }
            1 => {
                let step_id = remaining[0].id.clone();
                self.store
                    .update_status(to, BotStatus::Workflow, Some(step_id.as_str()))
                    .await?;

                self.safe_send(to, OutboundMessage::text(replies::ONE_REMAINING_BODY))
                    .await?;
                self.ask(to, &step_id).await
            }
            n => {
                self.store.update_status(to, BotStatus::Idle, None).await?;

                let rows = self
                    .catalog
                    .menu_rows(&responses)
                    .into_iter()
                    .map(|row| ListRow {
                        id: row.id,
                        title: row.title,
                        description: Some(row.description).filter(|d| !d.is_empty()),
                    })
                    .collect();

                self.safe_send(
                    to,
                    OutboundMessage::List {
                        body: replies::progress_menu_body(n),
                        button_label: replies::PROGRESS_BUTTON_LABEL.to_string(),
                        section_title: replies::PROGRESS_SECTION_TITLE.to_string(),
                        rows,
                    },
                )
                .await?;
                Ok(())
            }
        }
    }

    /// Ask one specific question. Choice questions go out as inline buttons
    /// when the choice set (plus the human-exit option) fits, as a list
    /// otherwise; text questions set the workflow expectation first.
    pub async fn ask(&self, to: &str, step_id: &str) -> Result<(), EngineError> {
        let Some(step) = self.catalog.step(step_id) else {
            return self.fallback(to, "unknown quiz step", Some(step_id)).await;
        };

        match step.question_type {
            QuestionType::Options => {
                let exit = (
                    EXIT_TO_AGENT_ID.to_string(),
                    replies::EXIT_OPTION_TITLE.to_string(),
                    Some(replies::EXIT_OPTION_DESCRIPTION.to_string()),
                );
                let mut choices: Vec<(String, String, Option<String>)> = step
                    .options
                    .iter()
                    .map(|o| (o.id.clone(), o.title.clone(), o.description.clone()))
                    .collect();
                choices.push(exit);

                if choices.len() <= MAX_BUTTONS {
                    let buttons = choices
                        .into_iter()
                        .map(|(id, title, _)| ButtonOption { id, title })
                        .collect();
                    self.safe_send(
                        to,
                        OutboundMessage::Buttons {
                            body: step.question.clone(),
                            buttons,
                        },
                    )
                    .await?;
                } else {
                    let rows = choices
                        .into_iter()
                        .map(|(id, title, description)| ListRow {
                            id,
                            title,
                            description,
                        })
                        .collect();
                    self.safe_send(
                        to,
                        OutboundMessage::List {
                            body: step.question.clone(),
                            button_label: replies::OPTIONS_BUTTON_LABEL.to_string(),
                            section_title: replies::OPTIONS_SECTION_TITLE.to_string(),
                            rows,
                        },
                    )
                    .await?;
                }
                Ok(())
            }
            QuestionType::Text => {
                self.store
                    .update_status(to, BotStatus::Workflow, Some(step_id))
                    .await?;
                self.safe_send(
                    to,
                    OutboundMessage::text(replies::text_question_body(&step.question)),
                )
                .await?;
                Ok(())
            }
        }
    }

    /// Handle a choice answer (`q1_vendas`) or the reserved exit id.
    pub async fn answer_option(&self, to: &str, answer_id: &str) -> Result<(), EngineError> {
        if answer_id == EXIT_TO_AGENT_ID {
            return self.transfer_to_agent(to).await;
        }

        let step_id = answer_id
            .split(ANSWER_SEPARATOR)
            .next()
            .unwrap_or_default()
            .to_string();

        let step = self
            .catalog
            .step(&step_id)
            .filter(|s| s.question_type == QuestionType::Options && !s.options.is_empty());
        let Some(step) = step else {
            // Stale button referencing a removed step: recover through the
            // main menu instead of leaving the user stuck.
            tracing::error!(
                contact_id = %to,
                step_id = %step_id,
                answer_id = %answer_id,
                "Invalid quiz step in answer; restarting from the menu"
            );
            self.safe_send(to, OutboundMessage::text(replies::STEP_ERROR_BODY))
                .await?;
            return self.start(to).await;
        };

        if step.option(answer_id).is_none() {
            tracing::warn!(
                contact_id = %to,
                step_id = %step_id,
                answer_id = %answer_id,
                "Unknown option for step; repeating the question"
            );
            self.safe_send(to, OutboundMessage::text(replies::INVALID_OPTION_BODY))
                .await?;
            return self.ask(to, &step_id).await;
        }

        tracing::info!(
            contact_id = %to,
            step_id = %step_id,
            answer_id = %answer_id,
            "Quiz answer recorded"
        );

        // The raw identifier is canonical; readable text is derived on read.
        self.store
            .save_quiz_response(to, &step_id, answer_id)
            .await?;

        self.safe_send(to, OutboundMessage::text(replies::ANSWER_SAVED_BODY))
            .await?;
        self.start(to).await
    }

    /// Handle free text while a workflow step is pending. The hand-off
    /// keywords win over everything; text without a pending step goes to the
    /// fallback rather than being dropped.
    pub async fn answer_free_text(&self, to: &str, text: &str) -> Result<(), EngineError> {
        let normalized = normalize(text);
        if HANDOFF_KEYWORDS.iter().any(|k| normalized.contains(k)) {
            return self.transfer_to_agent(to).await;
        }

        let contact = self.store.get_or_create_contact(to, "").await?;
        let Some(step_id) = contact.current_step else {
            return self.fallback(to, "free text with no pending step", Some(text)).await;
        };

        tracing::info!(
            contact_id = %to,
            step_id = %step_id,
            "Free-text quiz answer recorded"
        );
        self.store.save_quiz_response(to, &step_id, text).await?;
        self.store.update_status(to, BotStatus::Idle, None).await?;

        self.safe_send(to, OutboundMessage::text(replies::ANSWER_NOTED_BODY))
            .await?;
        self.start(to).await
    }

    /// Tell the contact where they left off and re-ask that question. Used
    /// when a previous session ended mid-workflow.
    pub async fn resume_after_gap(&self, to: &str, step_id: &str) -> Result<(), EngineError> {
        let Some(step) = self.catalog.step(step_id) else {
            tracing::warn!(contact_id = %to, step_id = %step_id, "Resume step vanished from catalog");
            return Ok(());
        };

        self.safe_send(to, OutboundMessage::text(replies::resume_body(&step.title)))
            .await?;
        self.ask(to, step_id).await
    }

    /// Hand the conversation to a human agent.
    pub async fn transfer_to_agent(&self, to: &str) -> Result<(), EngineError> {
        self.store
            .update_status(to, BotStatus::HumanPending, None)
            .await?;
        self.safe_send(to, OutboundMessage::text(replies::TRANSFER_BODY))
            .await?;
        Ok(())
    }

    /// "Criar site" sub-menu.
    pub async fn site_menu(&self, to: &str) -> Result<(), EngineError> {
        self.safe_send(
            to,
            OutboundMessage::Buttons {
                body: replies::SITE_MENU_BODY.to_string(),
                buttons: vec![
                    ButtonOption {
                        id: SITE_INFO_ID.to_string(),
                        title: replies::SITE_INFO_TITLE.to_string(),
                    },
                    ButtonOption {
                        id: SITE_SUPPORT_ID.to_string(),
                        title: replies::SITE_SUPPORT_TITLE.to_string(),
                    },
                ],
            },
        )
        .await?;
        Ok(())
    }

    pub async fn site_info(&self, to: &str) -> Result<(), EngineError> {
        self.safe_send(to, OutboundMessage::text(replies::SITE_INFO_BODY))
            .await?;
        Ok(())
    }

    /// Audited fallback: log enough to reconstruct the decision, then
    /// re-present the entry menu.
    pub async fn fallback(
        &self,
        to: &str,
        reason: &str,
        raw: Option<&str>,
    ) -> Result<(), EngineError> {
        tracing::warn!(contact_id = %to, reason = %reason, raw = ?raw, "Fallback triggered");
        metrics::counter!("leadbot_fallbacks_total").increment(1);

        self.safe_send(
            to,
            OutboundMessage::Buttons {
                body: replies::FALLBACK_BODY.to_string(),
                buttons: vec![ButtonOption {
                    id: SITE_MENU_ID.to_string(),
                    title: replies::FALLBACK_BUTTON_TITLE.to_string(),
                }],
            },
        )
        .await?;
        Ok(())
    }
}
