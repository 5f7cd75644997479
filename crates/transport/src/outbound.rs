//! Outbound message payloads
//!
//! A closed, tagged set of everything the bot is able to send, so the
//! router can never hand the platform a malformed payload. Serialization to
//! the Cloud API JSON happens in one place, [`OutboundMessage::api_body`].

use leadbot_core::MessageKind;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// An inline-button choice (max 3 per message, 20-unit titles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonOption {
    pub id: String,
    pub title: String,
}

/// A selectable-list row (20-unit title, 72-unit optional description).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRow {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Everything the bot can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Plain text.
    Text { body: String },
    /// Interactive message with up to 3 inline buttons.
    Buttons {
        body: String,
        buttons: Vec<ButtonOption>,
    },
    /// Interactive selectable list (one section).
    List {
        body: String,
        button_label: String,
        section_title: String,
        rows: Vec<ListRow>,
    },
    /// Named template with parameter substitution. Templates are the only
    /// payload the platform accepts outside the reply window.
    Template {
        name: String,
        language: String,
        header_text: Option<String>,
        body_texts: Vec<String>,
        button_payloads: Vec<String>,
    },
}

impl OutboundMessage {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    /// Message kind recorded in the history.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Text { .. } => MessageKind::Text,
            Self::Buttons { .. } | Self::List { .. } => MessageKind::Interactive,
            Self::Template { .. } => MessageKind::Template,
        }
    }

    /// Rendered textual content for the history record.
    pub fn history_content(&self) -> String {
        match self {
            Self::Text { body } => body.clone(),
            Self::Buttons { body, .. } => body.clone(),
            Self::List { body, .. } => body.clone(),
            Self::Template { name, .. } => format!("template:{name}"),
        }
    }

    /// Build the Cloud API request body for a recipient.
    pub fn api_body(&self, to: &str) -> serde_json::Value {
        let mut body = match self {
            Self::Text { body } => json!({
                "type": "text",
                "text": { "body": body },
            }),
            Self::Buttons { body, buttons } => json!({
                "type": "interactive",
                "interactive": {
                    "type": "button",
                    "body": { "text": body },
                    "action": {
                        "buttons": buttons
                            .iter()
                            .map(|b| json!({
                                "type": "reply",
                                "reply": { "id": b.id, "title": b.title },
                            }))
                            .collect::<Vec<_>>(),
                    },
                },
            }),
            Self::List {
                body,
                button_label,
                section_title,
                rows,
            } => json!({
                "type": "interactive",
                "interactive": {
                    "type": "list",
                    "body": { "text": body },
                    "action": {
                        "button": button_label,
                        "sections": [{
                            "title": section_title,
                            "rows": rows,
                        }],
                    },
                },
            }),
            Self::Template {
                name,
                language,
                header_text,
                body_texts,
                button_payloads,
            } => {
                let mut components = Vec::new();
                if let Some(header) = header_text {
                    components.push(json!({
                        "type": "header",
                        "parameters": [{ "type": "text", "text": header }],
                    }));
                }
                if !body_texts.is_empty() {
                    components.push(json!({
                        "type": "body",
                        "parameters": body_texts
                            .iter()
                            .map(|t| json!({ "type": "text", "text": t }))
                            .collect::<Vec<_>>(),
                    }));
                }
                for (index, payload) in button_payloads.iter().enumerate() {
                    components.push(json!({
                        "type": "button",
                        "sub_type": "quick_reply",
                        "index": index.to_string(),
                        "parameters": [{ "type": "payload", "payload": payload }],
                    }));
                }
                json!({
                    "type": "template",
                    "template": {
                        "name": name,
                        "language": { "code": language },
                        "components": components,
                    },
                })
            }
        };

        let object = body.as_object_mut().expect("payload is always an object");
        object.insert("messaging_product".to_string(), json!("whatsapp"));
        object.insert("to".to_string(), json!(to));
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_body() {
        let body = OutboundMessage::text("oi").api_body("5511999");
        assert_eq!(body["messaging_product"], "whatsapp");
        assert_eq!(body["to"], "5511999");
        assert_eq!(body["type"], "text");
        assert_eq!(body["text"]["body"], "oi");
    }

    #[test]
    fn test_buttons_body() {
        let msg = OutboundMessage::Buttons {
            body: "Escolha:".to_string(),
            buttons: vec![ButtonOption {
                id: "criar_site".to_string(),
                title: "Criar site".to_string(),
            }],
        };
        let body = msg.api_body("5511999");
        assert_eq!(body["interactive"]["type"], "button");
        assert_eq!(
            body["interactive"]["action"]["buttons"][0]["reply"]["id"],
            "criar_site"
        );
    }

    #[test]
    fn test_list_body() {
        let msg = OutboundMessage::List {
            body: "Progresso".to_string(),
            button_label: "Ver etapas".to_string(),
            section_title: "Etapas".to_string(),
            rows: vec![
                ListRow {
                    id: "q1".to_string(),
                    title: "Objetivo do site".to_string(),
                    description: Some("Pergunta: ...".to_string()),
                },
                ListRow {
                    id: "q4".to_string(),
                    title: "Prazo".to_string(),
                    description: None,
                },
            ],
        };
        let body = msg.api_body("5511999");
        assert_eq!(body["interactive"]["type"], "list");
        let rows = &body["interactive"]["action"]["sections"][0]["rows"];
        assert_eq!(rows[0]["id"], "q1");
        // Rows without a description must omit the field entirely.
        assert!(rows[1].get("description").is_none());
    }

    #[test]
    fn test_template_body_with_header_and_quick_reply() {
        let msg = OutboundMessage::Template {
            name: "welcome_gost_gothd".to_string(),
            language: "pt_BR".to_string(),
            header_text: Some("Ana".to_string()),
            body_texts: vec![],
            button_payloads: vec!["Começar agora".to_string()],
        };
        let body = msg.api_body("5511999");
        assert_eq!(body["template"]["name"], "welcome_gost_gothd");
        assert_eq!(body["template"]["language"]["code"], "pt_BR");

        let components = body["template"]["components"].as_array().unwrap();
        assert_eq!(components[0]["type"], "header");
        assert_eq!(components[0]["parameters"][0]["text"], "Ana");
        assert_eq!(components[1]["sub_type"], "quick_reply");
        assert_eq!(components[1]["parameters"][0]["payload"], "Começar agora");
    }

    #[test]
    fn test_history_metadata() {
        assert_eq!(OutboundMessage::text("oi").kind(), MessageKind::Text);
        assert_eq!(OutboundMessage::text("oi").history_content(), "oi");

        let template = OutboundMessage::Template {
            name: "welcome".to_string(),
            language: "pt_BR".to_string(),
            header_text: None,
            body_texts: vec![],
            button_payloads: vec![],
        };
        assert_eq!(template.kind(), MessageKind::Template);
        assert_eq!(template.history_content(), "template:welcome");
    }
}
