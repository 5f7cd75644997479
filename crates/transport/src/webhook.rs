//! Inbound webhook payload types
//!
//! The platform posts a nested body: `entry[].changes[].value` carrying
//! either `messages[]` (plus `contacts[]` with the sender's display name) or
//! `statuses[]` (delivery receipts). Messages discriminate on `type`.

use leadbot_core::MessageKind;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
    #[serde(default)]
    pub statuses: Vec<DeliveryStatus>,
}

impl WebhookBody {
    /// The single `value` object this delivery carries, if any.
    pub fn into_value(mut self) -> Option<WebhookValue> {
        self.entry
            .drain(..)
            .next()
            .and_then(|mut e| e.changes.drain(..).next())
            .map(|c| c.value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookContact {
    pub profile: ContactProfile,
    #[serde(default)]
    pub wa_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    pub name: String,
}

/// Delivery receipt for a previously sent message. Logged only.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub recipient_id: String,
    #[serde(default)]
    pub timestamp: String,
}

/// One inbound message; the type-specific payload sits beside the common
/// envelope fields.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub from: String,
    pub id: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: TextContent },
    Interactive { interactive: InteractiveReply },
    /// Quick-reply press on a template message.
    Button { button: TemplateButtonReply },
    Image { image: MediaContent },
    Audio { audio: MediaContent },
    Video { video: MediaContent },
    Document { document: MediaContent },
    Sticker { sticker: MediaContent },
    /// Reactions, locations, system events and anything newer than us.
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub body: String,
}

/// The interactive payload sub-discriminates into button and list replies.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InteractiveReply {
    ButtonReply { button_reply: ReplyRef },
    ListReply { list_reply: ReplyRef },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateButtonReply {
    pub payload: String,
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub mime_type: String,
}

/// What the router needs from an event: free text, an interaction id, or
/// neither (unsupported content, kept for history only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingData {
    pub text: Option<String>,
    pub interaction_id: Option<String>,
}

impl RoutingData {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.interaction_id.is_none()
    }
}

impl WebhookMessage {
    pub fn kind(&self) -> MessageKind {
        match &self.body {
            MessageBody::Text { .. } => MessageKind::Text,
            MessageBody::Interactive { .. } => MessageKind::Interactive,
            MessageBody::Button { .. } => MessageKind::Button,
            MessageBody::Image { .. } => MessageKind::Image,
            MessageBody::Audio { .. } => MessageKind::Audio,
            MessageBody::Video { .. } => MessageKind::Video,
            MessageBody::Document { .. } => MessageKind::Document,
            MessageBody::Sticker { .. } => MessageKind::Sticker,
            MessageBody::Unknown => MessageKind::Unknown,
        }
    }

    /// Normalize the event into `{text?, interaction_id?}`.
    ///
    /// Captions count as free text; template quick replies carry their
    /// payload as an interaction id; media without caption yields nothing.
    pub fn routing_data(&self) -> RoutingData {
        match &self.body {
            MessageBody::Text { text } => RoutingData {
                text: Some(text.body.clone()),
                interaction_id: None,
            },
            MessageBody::Interactive { interactive } => {
                let id = match interactive {
                    InteractiveReply::ButtonReply { button_reply } => button_reply.id.clone(),
                    InteractiveReply::ListReply { list_reply } => list_reply.id.clone(),
                };
                RoutingData {
                    text: None,
                    interaction_id: Some(id),
                }
            }
            MessageBody::Button { button } => RoutingData {
                text: None,
                interaction_id: Some(button.payload.clone()),
            },
            MessageBody::Image { image: media }
            | MessageBody::Video { video: media }
            | MessageBody::Document { document: media } => RoutingData {
                text: media.caption.clone().filter(|c| !c.is_empty()),
                interaction_id: None,
            },
            MessageBody::Audio { .. } | MessageBody::Sticker { .. } | MessageBody::Unknown => {
                RoutingData::default()
            }
        }
    }

    /// Textual content stored in the message history.
    pub fn history_content(&self) -> String {
        self.routing_data()
            .text
            .or_else(|| self.routing_data().interaction_id)
            .unwrap_or_default()
    }
}
