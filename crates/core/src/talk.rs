//! Talk (conversation session) lifecycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Lifecycle of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TalkStatus {
    Open,
    Closed,
    /// The reply window elapsed before a new inbound message arrived.
    ExpiredWindow,
}

impl TalkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
            Self::ExpiredWindow => "EXPIRED_WINDOW",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "CLOSED" => Self::Closed,
            "EXPIRED_WINDOW" => Self::ExpiredWindow,
            _ => Self::Open,
        }
    }
}

/// One conversation session for a contact.
///
/// `quiz_data` maps step identifiers to the raw submitted answer — the option
/// identifier for choice questions, the literal text otherwise. Readable text
/// is derived on demand from the catalog, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Talk {
    pub talk_id: String,
    pub status: TalkStatus,
    pub started_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub quiz_data: HashMap<String, String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Talk {
    /// Open a fresh talk with a generated identifier.
    pub fn open() -> Self {
        Self {
            talk_id: Uuid::new_v4().to_string(),
            status: TalkStatus::Open,
            started_at: Utc::now(),
            closed_at: None,
            quiz_data: HashMap::new(),
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_talk_defaults() {
        let talk = Talk::open();
        assert_eq!(talk.status, TalkStatus::Open);
        assert!(talk.closed_at.is_none());
        assert!(talk.quiz_data.is_empty());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [TalkStatus::Open, TalkStatus::Closed, TalkStatus::ExpiredWindow] {
            assert_eq!(TalkStatus::from_str(status.as_str()), status);
        }
    }
}
