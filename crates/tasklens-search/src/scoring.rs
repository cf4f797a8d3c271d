//! Additive bonus scoring and the composite ranking key.
//!
//! Every bonus is a configuration-overridable point value; the composite key
//! is `relevance×R + due_urgency×D + priority×P` with caller-supplied
//! coefficients. Magnitudes are policy; the additive weighted shape is the
//! mechanism.

use std::collections::HashSet;

use chrono::NaiveDate;

use tasklens_core::{
    Item, QueryIntent, ScoreBreakdown, ScoringWeights, Settings, TieBreaker,
};

use crate::filter;

/// Everything scoring needs besides the intent.
///
/// The reference date is injected rather than read from the clock so that a
/// fixed corpus, query, and configuration always produce byte-identical
/// rankings.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub today: NaiveDate,
    pub weights: ScoringWeights,
    pub tie_break: Vec<TieBreaker>,
    /// Status categories that earn the incomplete bonus, lowercased.
    pub incomplete_statuses: HashSet<String>,
}

impl SearchContext {
    pub fn new(today: NaiveDate, settings: &Settings) -> Self {
        Self {
            today,
            weights: settings.weights,
            tie_break: settings.tie_break.clone(),
            incomplete_statuses: settings
                .recognition
                .incomplete_statuses
                .iter()
                .map(|s| s.to_lowercase())
                .collect(),
        }
    }
}

/// Score one item against the intent. The breakdown is advisory; ordering is
/// decided by the returned composite score alone.
pub fn score_item(item: &Item, intent: &QueryIntent, ctx: &SearchContext) -> ScoreBreakdown {
    let weights = &ctx.weights;
    let text = item.text.to_lowercase();

    let mut relevance = 0.0f32;
    let mut exact_match = 0.0f32;
    let mut keyword_matches = 0u32;

    // Exact full-query phrase, reconstructed from the core keywords.
    let phrase = intent.core_keywords.join(" ");
    if !phrase.is_empty() && text.contains(&phrase) {
        exact_match = weights.exact_match_bonus;
        relevance += exact_match;
    }

    for keyword in &intent.expanded_keywords {
        if text.contains(keyword.as_str()) {
            relevance += weights.keyword_match_points;
            keyword_matches += 1;
        }
    }

    if intent.folder.is_some() && item.folder.is_some() {
        relevance += weights.folder_match_bonus;
    }
    if intent.tags.is_some() && !item.tags.is_empty() {
        relevance += weights.tag_match_bonus;
    }
    if ctx.incomplete_statuses.contains(&item.status.to_lowercase()) {
        relevance += weights.incomplete_bonus;
    }

    let priority = item
        .priority
        .map(|level| weights.priority_level_points * level as f32)
        .unwrap_or(0.0);

    let due_urgency = item
        .due
        .map(|due| weights.has_due_date_bonus + urgency_tier_points(due, ctx.today, weights))
        .unwrap_or(0.0);

    ScoreBreakdown {
        relevance,
        due_urgency,
        priority,
        exact_match,
        keyword_matches,
    }
}

/// Combine a breakdown into the composite ranking key.
pub fn composite(breakdown: &ScoreBreakdown, weights: &ScoringWeights) -> f32 {
    breakdown.relevance * weights.relevance
        + breakdown.due_urgency * weights.due_urgency
        + breakdown.priority * weights.priority
}

fn urgency_tier_points(due: NaiveDate, today: NaiveDate, weights: &ScoringWeights) -> f32 {
    let days = (due - today).num_days();
    if days < 0 {
        weights.urgency.overdue
    } else if days == 0 {
        weights.urgency.today
    } else if days == 1 {
        weights.urgency.tomorrow
    } else if days <= 7 {
        weights.urgency.this_week
    } else {
        weights.urgency.later
    }
}

/// Convenience: does the item pass the intent's filters?
pub fn passes_filters(item: &Item, intent: &QueryIntent) -> bool {
    filter::matches(item, intent)
}
