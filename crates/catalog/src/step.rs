//! Quiz step definitions

use serde::{Deserialize, Serialize};

/// Kind of question: fixed choices or open text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Options,
    Text,
}

/// One selectable choice of an `options` step.
///
/// `description` is only rendered when the step goes out as a list (the
/// platform's button rows have no description field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A single step of the questionnaire.
///
/// `title` is bounded by the menu title limit; option titles likewise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizStep {
    pub id: String,
    pub title: String,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<QuizOption>,
}

impl QuizStep {
    /// Find a choice of this step by its full answer identifier.
    pub fn option(&self, answer_id: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.id == answer_id)
    }
}
