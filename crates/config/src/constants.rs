//! Centralized constants for interaction identifiers and platform limits

/// Reserved interaction id that ends the quiz and requests a human agent.
pub const EXIT_TO_AGENT_ID: &str = "EXIT_TO_AGENT";

/// Quick-reply payload on the welcome template that starts the quiz.
pub const START_QUIZ_PAYLOAD: &str = "Começar agora";

/// Interaction ids of the "criar site" sub-menu.
pub const SITE_MENU_ID: &str = "criar_site";
pub const SITE_INFO_ID: &str = "criar_site_info";
pub const SITE_SUPPORT_ID: &str = "criar_site_suporte";

/// Every quiz interaction id (step or answer) starts with this prefix.
pub const QUIZ_INTERACTION_PREFIX: &str = "q";

/// Separator between a step id and an option suffix in answer ids
/// (`q1_vendas` belongs to step `q1`).
pub const ANSWER_SEPARATOR: char = '_';

/// Prefix marking answered steps in the progress menu. Counted against the
/// title limit.
pub const PROGRESS_PREFIX: &str = "✅ ";

/// Hard display limits imposed by the messaging platform.
pub const TITLE_MAX_LENGTH: usize = 20;
pub const DESCRIPTION_MAX_LENGTH: usize = 72;

/// Buttons are limited to this many choices; larger sets go out as a list.
pub const MAX_BUTTONS: usize = 3;

/// Free-text trigger words that hand the conversation to a human.
pub const HANDOFF_KEYWORDS: &[&str] = &["humano", "consultor"];
