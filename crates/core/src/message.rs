//! Append-only message history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of a message relative to the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "INBOUND",
            Self::Outbound => "OUTBOUND",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "OUTBOUND" => Self::Outbound,
            _ => Self::Inbound,
        }
    }
}

/// Platform message type, as received or sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Interactive,
    Button,
    Template,
    Image,
    Audio,
    Video,
    Document,
    Sticker,
    Unknown,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Interactive => "interactive",
            Self::Button => "button",
            Self::Template => "template",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Document => "document",
            Self::Sticker => "sticker",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "interactive" => Self::Interactive,
            "button" => Self::Button,
            "template" => Self::Template,
            "image" => Self::Image,
            "audio" => Self::Audio,
            "video" => Self::Video,
            "document" => Self::Document,
            "sticker" => Self::Sticker,
            _ => Self::Unknown,
        }
    }
}

/// One history entry under a talk. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Externally-assigned identifier for inbound messages; generated for
    /// outbound ones. Replayed inbound writes land on the same key.
    pub external_id: String,
    pub direction: Direction,
    pub kind: MessageKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            MessageKind::Text,
            MessageKind::Interactive,
            MessageKind::Button,
            MessageKind::Template,
            MessageKind::Image,
            MessageKind::Audio,
            MessageKind::Video,
            MessageKind::Document,
            MessageKind::Sticker,
        ] {
            assert_eq!(MessageKind::from_str(kind.as_str()), kind);
        }
        assert_eq!(MessageKind::from_str("reaction"), MessageKind::Unknown);
    }
}
