//! Config-driven lead scoring rules
//!
//! Which answers contribute how much, and where the priority cut-offs sit,
//! are product decisions. They ship with defaults matching the current quiz
//! catalog and can be overridden from the configuration files.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Scoring rules applied once, at quest submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Step whose answer carries the budget tier.
    #[serde(default = "default_budget_step")]
    pub budget_step: String,

    /// Weight contributed per budget option id.
    #[serde(default = "default_budget_weights")]
    pub budget_weights: HashMap<String, u32>,

    /// Free-text step scanned for urgency keywords.
    #[serde(default = "default_deadline_step")]
    pub deadline_step: String,

    /// Keywords (compared against normalized text) that signal urgency.
    #[serde(default = "default_urgency_keywords")]
    pub urgency_keywords: Vec<String>,

    #[serde(default = "default_urgency_weight")]
    pub urgency_weight: u32,

    /// Step and option signalling the content is already prepared.
    #[serde(default = "default_content_step")]
    pub content_step: String,
    #[serde(default = "default_content_ready_option")]
    pub content_ready_option: String,
    #[serde(default = "default_content_ready_weight")]
    pub content_ready_weight: u32,

    /// Steps consulted by the category decision table.
    #[serde(default = "default_objective_step")]
    pub objective_step: String,
    #[serde(default = "default_features_step")]
    pub features_step: String,

    /// Option ids feeding the category decision table.
    #[serde(default = "default_ecommerce_feature_option")]
    pub ecommerce_feature_option: String,
    #[serde(default = "default_sales_objective_option")]
    pub sales_objective_option: String,
    #[serde(default = "default_blog_feature_option")]
    pub blog_feature_option: String,
    #[serde(default = "default_leads_objective_option")]
    pub leads_objective_option: String,

    /// Monotonic priority cut-offs over the final score.
    #[serde(default)]
    pub priority_thresholds: PriorityThresholds,
}

/// Score thresholds mapping to high/medium priority; anything below is low.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriorityThresholds {
    #[serde(default = "default_high_threshold")]
    pub high: u32,
    #[serde(default = "default_medium_threshold")]
    pub medium: u32,
}

impl Default for PriorityThresholds {
    fn default() -> Self {
        Self {
            high: default_high_threshold(),
            medium: default_medium_threshold(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            budget_step: default_budget_step(),
            budget_weights: default_budget_weights(),
            deadline_step: default_deadline_step(),
            urgency_keywords: default_urgency_keywords(),
            urgency_weight: default_urgency_weight(),
            content_step: default_content_step(),
            content_ready_option: default_content_ready_option(),
            content_ready_weight: default_content_ready_weight(),
            objective_step: default_objective_step(),
            features_step: default_features_step(),
            ecommerce_feature_option: default_ecommerce_feature_option(),
            sales_objective_option: default_sales_objective_option(),
            blog_feature_option: default_blog_feature_option(),
            leads_objective_option: default_leads_objective_option(),
            priority_thresholds: PriorityThresholds::default(),
        }
    }
}

fn default_budget_step() -> String {
    "q6".to_string()
}

fn default_budget_weights() -> HashMap<String, u32> {
    HashMap::from([
        ("q6_c".to_string(), 50),
        ("q6_b".to_string(), 30),
        ("q6_a".to_string(), 10),
    ])
}

fn default_deadline_step() -> String {
    "q4".to_string()
}

fn default_urgency_keywords() -> Vec<String> {
    vec![
        "urgente".to_string(),
        "ontem".to_string(),
        "imediatamente".to_string(),
    ]
}

fn default_urgency_weight() -> u32 {
    20
}

fn default_content_step() -> String {
    "q2".to_string()
}

fn default_content_ready_option() -> String {
    "q2_sim".to_string()
}

fn default_content_ready_weight() -> u32 {
    10
}

fn default_objective_step() -> String {
    "q1".to_string()
}

fn default_features_step() -> String {
    "q3".to_string()
}

fn default_ecommerce_feature_option() -> String {
    "q3_ecommerce".to_string()
}

fn default_sales_objective_option() -> String {
    "q1_vendas".to_string()
}

fn default_blog_feature_option() -> String {
    "q3_blog".to_string()
}

fn default_leads_objective_option() -> String {
    "q1_leads".to_string()
}

fn default_high_threshold() -> u32 {
    60
}

fn default_medium_threshold() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights() {
        let cfg = ScoringConfig::default();
        assert_eq!(cfg.budget_weights.get("q6_c"), Some(&50));
        assert_eq!(cfg.budget_weights.get("q6_b"), Some(&30));
        assert_eq!(cfg.budget_weights.get("q6_a"), Some(&10));
        assert_eq!(cfg.urgency_weight, 20);
        assert_eq!(cfg.content_ready_weight, 10);
    }

    #[test]
    fn test_default_thresholds_are_monotonic() {
        let thresholds = PriorityThresholds::default();
        assert!(thresholds.high > thresholds.medium);
    }
}
