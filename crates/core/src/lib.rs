//! Core domain types for the lead bot
//!
//! Everything the router, engine and store exchange lives here:
//! - [`Contact`] with its durable [`BotStatus`]
//! - [`Talk`] conversation sessions bounded by the reply window
//! - append-only [`MessageRecord`] history entries
//! - the immutable [`Quest`] snapshot produced at quiz completion

pub mod contact;
pub mod message;
pub mod quest;
pub mod talk;

pub use contact::{BotStatus, Contact};
pub use message::{Direction, MessageKind, MessageRecord};
pub use quest::{LeadPriority, ProjectCategory, Quest, QuestSummaryItem, ReviewStatus};
pub use talk::{Talk, TalkStatus};
