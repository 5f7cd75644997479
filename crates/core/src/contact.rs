//! Contact state and bot status

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who is in control of a conversation and what the bot expects next.
///
/// Stored on the contact and consulted by the router on every inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    /// No pending expectation; free text is classified, interactions dispatched.
    #[default]
    Idle,
    /// Awaiting a free-text answer for the contact's `current_step`.
    Workflow,
    /// Hand-off requested; bot is muted until an agent picks up.
    HumanPending,
    /// A human agent owns the conversation; bot is muted.
    HumanActive,
    /// The agent ended the session; next inbound resets to `Idle`.
    Closed,
}

impl BotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Workflow => "WORKFLOW",
            Self::HumanPending => "HUMAN_PENDING",
            Self::HumanActive => "HUMAN_ACTIVE",
            Self::Closed => "CLOSED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "WORKFLOW" => Self::Workflow,
            "HUMAN_PENDING" => Self::HumanPending,
            "HUMAN_ACTIVE" => Self::HumanActive,
            "CLOSED" => Self::Closed,
            _ => Self::Idle,
        }
    }

    /// States in which the bot never replies, regardless of input.
    pub fn is_silent(&self) -> bool {
        matches!(self, Self::HumanPending | Self::HumanActive)
    }
}

/// One external party, keyed by its platform identifier (phone number).
///
/// Invariant: `current_step` is only meaningful while `bot_status` is
/// [`BotStatus::Workflow`]; at most one talk is active at a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: String,
    pub display_name: String,
    pub bot_status: BotStatus,
    pub current_step: Option<String>,
    pub active_talk_id: Option<String>,
    /// Timestamp of the most recent message received from this party.
    /// Drives the reply-window policy.
    pub last_inbound_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Contact {
    pub fn new(contact_id: &str, display_name: &str) -> Self {
        Self {
            contact_id: contact_id.to_string(),
            display_name: display_name.to_string(),
            bot_status: BotStatus::Idle,
            current_step: None,
            active_talk_id: None,
            last_inbound_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }
}
