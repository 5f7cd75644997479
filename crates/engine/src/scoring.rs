//! Lead scoring
//!
//! Executed once, at quest submission: a weighted sum over specific catalog
//! answers, a small decision table for the project category, and a monotonic
//! priority derived from the score. All weights and thresholds come from
//! [`ScoringConfig`].

use leadbot_catalog::QuizCatalog;
use leadbot_config::ScoringConfig;
use leadbot_core::{LeadPriority, ProjectCategory, QuestSummaryItem};
use leadbot_persistence::QuestDraft;
use leadbot_text_processing::normalize;
use std::collections::HashMap;

/// Weighted score over the raw responses.
pub fn score_responses(config: &ScoringConfig, responses: &HashMap<String, String>) -> u32 {
    let mut score = 0;

    // Budget tier is the strongest signal.
    if let Some(weight) = responses
        .get(&config.budget_step)
        .and_then(|answer| config.budget_weights.get(answer))
    {
        score += weight;
    }

    // Urgency keywords in the free-text deadline answer.
    if let Some(deadline) = responses.get(&config.deadline_step) {
        let normalized = normalize(deadline);
        if config
            .urgency_keywords
            .iter()
            .any(|keyword| normalized.contains(keyword.as_str()))
        {
            score += config.urgency_weight;
        }
    }

    // Content already prepared: the project moves faster.
    if responses
        .get(&config.content_step)
        .is_some_and(|answer| *answer == config.content_ready_option)
    {
        score += config.content_ready_weight;
    }

    score
}

/// Decision table over the objective and feature answers.
pub fn categorize(config: &ScoringConfig, responses: &HashMap<String, String>) -> ProjectCategory {
    let features = responses.get(&config.features_step);
    let objective = responses.get(&config.objective_step);

    if features == Some(&config.ecommerce_feature_option)
        || objective == Some(&config.sales_objective_option)
    {
        ProjectCategory::Ecommerce
    } else if features == Some(&config.blog_feature_option) {
        ProjectCategory::BlogNews
    } else if objective == Some(&config.leads_objective_option) {
        ProjectCategory::LandingPage
    } else {
        ProjectCategory::Institutional
    }
}

/// Priority from the configured thresholds (monotonic in the score).
pub fn priority_for(config: &ScoringConfig, score: u32) -> LeadPriority {
    let thresholds = &config.priority_thresholds;
    if score >= thresholds.high {
        LeadPriority::High
    } else if score >= thresholds.medium {
        LeadPriority::Medium
    } else {
        LeadPriority::Low
    }
}

/// Readable summary rows, in catalog order. Keys that do not exist in the
/// catalog (stray metadata) are skipped.
pub fn summarize(
    catalog: &QuizCatalog,
    responses: &HashMap<String, String>,
) -> Vec<QuestSummaryItem> {
    catalog
        .steps()
        .iter()
        .filter_map(|step| {
            responses.get(&step.id).map(|raw| QuestSummaryItem {
                step_id: step.id.clone(),
                question: step.question.clone(),
                answer: catalog.readable_answer(&step.id, raw),
            })
        })
        .collect()
}

/// Everything the store needs to persist a quest.
pub fn build_quest_draft(
    catalog: &QuizCatalog,
    config: &ScoringConfig,
    responses: HashMap<String, String>,
) -> QuestDraft {
    let score = score_responses(config, &responses);
    QuestDraft {
        summary: summarize(catalog, &responses),
        score,
        category: categorize(config, &responses),
        priority: priority_for(config, score),
        responses,
    }
}
