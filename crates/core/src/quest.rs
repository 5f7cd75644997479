//! Quest: the immutable lead snapshot produced at quiz completion

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Project category derived from the quiz answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectCategory {
    Ecommerce,
    BlogNews,
    LandingPage,
    Institutional,
}

impl ProjectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ecommerce => "ECOMMERCE",
            Self::BlogNews => "BLOG/NEWS",
            Self::LandingPage => "LANDING_PAGE",
            Self::Institutional => "INSTITUCIONAL",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "ECOMMERCE" => Self::Ecommerce,
            "BLOG/NEWS" => Self::BlogNews,
            "LANDING_PAGE" => Self::LandingPage,
            _ => Self::Institutional,
        }
    }
}

/// Lead priority, a monotonic function of the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadPriority {
    Low,
    Medium,
    High,
}

impl LeadPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Review state, managed by the operator tooling, not by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Contacted,
    Archived,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "contacted" => Self::Contacted,
            "archived" => Self::Archived,
            _ => Self::Pending,
        }
    }
}

/// One human-readable row of the quest summary: the question that was asked
/// and the answer resolved to display text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSummaryItem {
    pub step_id: String,
    pub question: String,
    pub answer: String,
}

/// Immutable record created once per completed quiz.
///
/// `responses` keeps the raw identifiers as submitted; `summary` is the
/// derived readable rendition captured at submission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quest {
    pub quest_id: Uuid,
    pub contact_id: String,
    pub talk_id: String,
    pub responses: HashMap<String, String>,
    pub summary: Vec<QuestSummaryItem>,
    pub score: u32,
    pub category: ProjectCategory,
    pub priority: LeadPriority,
    pub submitted_at: DateTime<Utc>,
    pub review_status: ReviewStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for cat in [
            ProjectCategory::Ecommerce,
            ProjectCategory::BlogNews,
            ProjectCategory::LandingPage,
            ProjectCategory::Institutional,
        ] {
            assert_eq!(ProjectCategory::from_str(cat.as_str()), cat);
        }
    }

    #[test]
    fn test_priority_is_ordered() {
        assert!(LeadPriority::High > LeadPriority::Medium);
        assert!(LeadPriority::Medium > LeadPriority::Low);
    }
}
