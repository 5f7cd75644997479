//! Message router — the per-event state machine
//!
//! For every inbound event: idempotency gate, event normalization, contact
//! resolution, atomic persistence with window handling, then a dispatch on
//! the contact's `bot_status`. Silent states stay silent; everything else
//! lands in the quiz engine, the greeting path or the fallback.

use leadbot_config::constants::{
    ANSWER_SEPARATOR, EXIT_TO_AGENT_ID, QUIZ_INTERACTION_PREFIX, SITE_INFO_ID, SITE_MENU_ID,
    SITE_SUPPORT_ID, START_QUIZ_PAYLOAD,
};
use leadbot_core::BotStatus;
use leadbot_persistence::NewInbound;
use leadbot_text_processing::{extract_keywords, is_greeting};
use leadbot_transport::{WebhookMessage, WebhookValue};

use crate::metrics;
use crate::state::AppState;
use crate::ServerError;

/// Display name used when the payload carries no contact profile.
const DEFAULT_DISPLAY_NAME: &str = "Cliente";

/// Keyword that opens the "criar site" sub-menu.
const SITE_KEYWORD: &str = "site";

/// Handle one webhook `value` object: route the newest message (platform
/// batches are processed newest-last) and log delivery receipts.
pub async fn handle_value(state: &AppState, value: WebhookValue) -> Result<(), ServerError> {
    if let Some(message) = value.messages.last() {
        let display_name = value
            .contacts
            .first()
            .map(|c| c.profile.name.clone())
            .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string());
        route_message(state, message, &display_name).await?;
    }

    for status in &value.statuses {
        metrics::record_status_event();
        tracing::info!(
            id = %status.id,
            status = %status.status,
            recipient = %status.recipient_id,
            timestamp = %status.timestamp,
            "Delivery status event"
        );
    }

    Ok(())
}

/// Route a single inbound message.
pub async fn route_message(
    state: &AppState,
    message: &WebhookMessage,
    display_name: &str,
) -> Result<(), ServerError> {
    // (1) Reject duplicates before any other state mutation.
    if state.store.is_message_processed(&message.id).await? {
        metrics::record_dedup_hit();
        tracing::info!(message_id = %message.id, "Duplicate webhook delivery ignored");
        return Ok(());
    }
    metrics::record_inbound_event();

    let from = message.from.as_str();
    let routing = message.routing_data();

    // (3) Resolve or create the contact.
    state.store.get_or_create_contact(from, display_name).await?;

    // (4) Persist the message with window-expiry handling; routing decisions
    // use the refreshed contact, so an expired session is already reset.
    let contact = state
        .store
        .record_inbound(
            from,
            NewInbound {
                external_id: message.id.clone(),
                kind: message.kind(),
                content: message.history_content(),
            },
        )
        .await?;

    // (2) Unsupported content: kept for history, not routed, no reply.
    if routing.is_empty() {
        tracing::info!(
            contact_id = %from,
            kind = message.kind().as_str(),
            "Event without text or interaction; persisted only"
        );
        return Ok(());
    }

    // (5) Dispatch on status.
    let mut status = contact.bot_status;
    let mut current_step = contact.current_step;

    // A human owns the conversation: the message is saved, the bot is mute.
    if status.is_silent() {
        tracing::debug!(contact_id = %from, status = status.as_str(), "Human in control; bot silent");
        return Ok(());
    }

    // Agent closed the session: reset and re-enter normal routing.
    if status == BotStatus::Closed {
        state
            .store
            .update_status(from, BotStatus::Idle, None)
            .await?;
        status = BotStatus::Idle;
        current_step = None;
    }

    // Awaiting a free-text answer for the current step.
    if status == BotStatus::Workflow {
        if let Some(text) = &routing.text {
            state.engine.answer_free_text(from, text).await?;
            return Ok(());
        }
    }

    // Resume a quiz the contact abandoned mid-workflow in a past session.
    if status == BotStatus::Idle {
        if let Some(step_id) = current_step {
            if step_id != state.catalog.first_step_id() {
                state
                    .store
                    .update_status(from, BotStatus::Workflow, Some(step_id.as_str()))
                    .await?;
                state.engine.resume_after_gap(from, &step_id).await?;
                return Ok(());
            }
        }
    }

    // Interactions: quiz buttons, menu selections, sub-menu actions.
    if let Some(interaction_id) = &routing.interaction_id {
        return route_interaction(state, from, interaction_id).await;
    }

    // Plain text while idle: greeting, keyword, or fallback.
    if let Some(text) = &routing.text {
        if status == BotStatus::Idle {
            if is_greeting(text) {
                state.engine.greet(from, display_name).await?;
            } else if extract_keywords(text).iter().any(|k| k.as_str() == SITE_KEYWORD) {
                state.engine.site_menu(from).await?;
            } else {
                state.engine.fallback(from, "unrecognized text", Some(text)).await?;
            }
        }
    }

    Ok(())
}

async fn route_interaction(
    state: &AppState,
    from: &str,
    interaction_id: &str,
) -> Result<(), ServerError> {
    let engine = &state.engine;

    if interaction_id == EXIT_TO_AGENT_ID {
        engine.answer_option(from, interaction_id).await?;
    } else if interaction_id.starts_with(QUIZ_INTERACTION_PREFIX) {
        if interaction_id.contains(ANSWER_SEPARATOR) {
            // `qN_...`: a quiz answer (the engine re-prompts on garbage and
            // recovers through the menu on stale steps).
            engine.answer_option(from, interaction_id).await?;
        } else {
            // Bare `qN`: a step picked from the progress menu.
            state
                .store
                .update_status(from, BotStatus::Workflow, Some(interaction_id))
                .await?;
            engine.ask(from, interaction_id).await?;
        }
    } else if interaction_id == START_QUIZ_PAYLOAD {
        let first = state.catalog.first_step_id().to_string();
        state
            .store
            .update_status(from, BotStatus::Workflow, Some(first.as_str()))
            .await?;
        engine.ask(from, &first).await?;
    } else if interaction_id == SITE_MENU_ID {
        engine.site_menu(from).await?;
    } else if interaction_id == SITE_INFO_ID {
        engine.site_info(from).await?;
    } else if interaction_id == SITE_SUPPORT_ID {
        engine.transfer_to_agent(from).await?;
    } else {
        engine
            .fallback(from, "unrecognized interaction", Some(interaction_id))
            .await?;
    }

    Ok(())
}
