//! Prioritization orchestrator.
//!
//! Offers the top ranked candidates to the AI service under call-scoped
//! opaque identifiers and resolves the answer back to candidates by
//! identifier alone. When nothing is resolvable, or the transport fails,
//! the fallback is the deterministic top-K of the already-ranked list, never
//! a fuzzy text match against candidate content (fuzzy matching was a
//! documented reliability problem in an earlier design).

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use tasklens_core::{
    AiSettings, CompletionBackend, CompletionRequest, DegradationKind, FinalSelection,
    RankedResult, ScoredCandidate, SelectionSource, StructuredError,
};

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)candidate[_\s]*(\d+)").expect("identifier pattern is valid"));

// =============================================================================
// PROMPTS
// =============================================================================

/// System instruction for the prioritization call.
pub fn prioritize_system_prompt() -> String {
    r#"You pick which tasks someone should focus on, given their query and a numbered list of candidates.

Rules:
- Refer to your choices ONLY by their identifier (for example CANDIDATE_2).
- List the best choice first.
- Pick at most five candidates.
- Do not repeat candidate text and do not invent identifiers."#
        .to_string()
}

/// User content: the query plus the identified shortlist.
pub fn prioritize_user_prompt(query: &str, shortlist: &[ScoredCandidate]) -> String {
    let mut lines = Vec::with_capacity(shortlist.len() + 2);
    lines.push(format!("Query: {}", query));
    lines.push("Candidates:".to_string());
    for (index, candidate) in shortlist.iter().enumerate() {
        let item = &candidate.item;
        let priority = item
            .priority
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let due = item
            .due
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        lines.push(format!(
            "CANDIDATE_{}: {} (priority: {}, due: {}, status: {})",
            index + 1,
            item.text,
            priority,
            due,
            item.status
        ));
    }
    lines.join("\n")
}

// =============================================================================
// EXTRACTION
// =============================================================================

/// Extract candidate indices (1-based) from a free-form answer.
///
/// Occurrences are taken in first-appearance order and deduplicated;
/// out-of-range indices are dropped. `"I'd pick CANDIDATE_3 and also
/// CANDIDATE_1, CANDIDATE_3 again"` resolves to `[3, 1]`.
pub fn extract_identifiers(answer: &str, shortlist_len: usize) -> Vec<usize> {
    let mut indices = Vec::new();
    for captures in IDENTIFIER.captures_iter(answer) {
        let Some(index) = captures.get(1).and_then(|m| m.as_str().parse::<usize>().ok()) else {
            continue;
        };
        if index == 0 || index > shortlist_len {
            continue;
        }
        if !indices.contains(&index) {
            indices.push(index);
        }
    }
    indices
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Ask the AI service to choose among the ranked candidates.
///
/// Truncates the input to `max_candidates_to_ai`, assigns call-scoped
/// identifiers, and resolves the answer by identifier. Every failure path
/// falls back deterministically to the top-K already-ranked candidates and
/// records a [`StructuredError`]; the selection is always usable.
pub async fn prioritize(
    ranked: &RankedResult,
    query: &str,
    client: &dyn CompletionBackend,
    ai: &AiSettings,
) -> FinalSelection {
    if ranked.candidates.is_empty() {
        return FinalSelection {
            chosen: Vec::new(),
            source: SelectionSource::FallbackTopK,
            degradation: None,
        };
    }

    let shortlist: Vec<ScoredCandidate> = ranked
        .candidates
        .iter()
        .take(ai.max_candidates_to_ai)
        .cloned()
        .collect();

    let request = CompletionRequest::new(
        prioritize_system_prompt(),
        prioritize_user_prompt(query, &shortlist),
    )
    .with_temperature(ai.temperature)
    .with_max_tokens(tasklens_core::defaults::MAX_ANSWER_TOKENS);

    let timeout = Duration::from_secs(ai.completion_timeout_secs);
    let answer = match tokio::time::timeout(timeout, client.complete(&request)).await {
        Ok(Ok(answer)) => answer,
        Ok(Err(error)) => {
            warn!(error = %error, fallback = true, "Prioritization transport failed");
            return fallback_top_k(
                &shortlist,
                ai.fallback_top_k,
                StructuredError::new(
                    DegradationKind::CompletionTransportFailure,
                    format!("prioritization call failed: {}", error),
                )
                .with_hints(vec![
                    "check that the completion service is reachable".to_string(),
                    "the top-ranked candidates were returned instead".to_string(),
                ])
                .recovered(),
            );
        }
        Err(_) => {
            warn!(
                timeout_secs = ai.completion_timeout_secs,
                fallback = true,
                "Prioritization call timed out"
            );
            return fallback_top_k(
                &shortlist,
                ai.fallback_top_k,
                StructuredError::new(
                    DegradationKind::CompletionTransportFailure,
                    format!(
                        "prioritization call exceeded the {}s bound",
                        ai.completion_timeout_secs
                    ),
                )
                .with_hints(vec![
                    "raise ai.completion_timeout_secs or use a faster model".to_string(),
                    "the top-ranked candidates were returned instead".to_string(),
                ])
                .recovered(),
            );
        }
    };

    let indices = extract_identifiers(&answer, shortlist.len());
    if indices.is_empty() {
        debug!(
            response_len = answer.len(),
            fallback = true,
            "No resolvable identifiers in answer"
        );
        return fallback_top_k(
            &shortlist,
            ai.fallback_top_k,
            StructuredError::new(
                DegradationKind::ExtractionFailure,
                "the answer referenced no candidate identifiers".to_string(),
            )
            .with_hints(vec![
                "a stricter model or lower temperature usually fixes this".to_string(),
                "the top-ranked candidates were returned instead".to_string(),
            ])
            .recovered(),
        );
    }

    let chosen: Vec<ScoredCandidate> = indices
        .iter()
        .map(|index| shortlist[index - 1].clone())
        .collect();

    debug!(result_count = chosen.len(), "AI selection resolved");
    FinalSelection {
        chosen,
        source: SelectionSource::AiSelected,
        degradation: None,
    }
}

/// Deterministic fallback: the first K already-ranked candidates.
fn fallback_top_k(
    shortlist: &[ScoredCandidate],
    k: usize,
    degradation: StructuredError,
) -> FinalSelection {
    FinalSelection {
        chosen: shortlist.iter().take(k).cloned().collect(),
        source: SelectionSource::FallbackTopK,
        degradation: Some(degradation),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use tasklens_core::{AppliedFilters, Item, ScoreBreakdown};
    use tasklens_inference::MockCompletionBackend;
    use uuid::Uuid;

    fn candidate(id_byte: u8, text: &str, score: f32) -> ScoredCandidate {
        ScoredCandidate {
            item: Item {
                id: Uuid::from_bytes([id_byte; 16]),
                text: text.to_string(),
                status: "open".to_string(),
                priority: Some(2),
                due: NaiveDate::from_ymd_opt(2025, 1, 21),
                created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
                folder: None,
                tags: Vec::new(),
            },
            score,
            breakdown: ScoreBreakdown::default(),
        }
    }

    fn ranked(count: u8) -> RankedResult {
        RankedResult {
            candidates: (1..=count)
                .map(|i| candidate(i, &format!("task {}", i), (count - i + 1) as f32))
                .collect(),
            applied: AppliedFilters::default(),
            degradation: None,
        }
    }

    fn ai() -> AiSettings {
        AiSettings::default()
    }

    #[test]
    fn test_extraction_first_appearance_order_with_dedup() {
        let indices = extract_identifiers(
            "I'd pick CANDIDATE_3 and also CANDIDATE_1, CANDIDATE_3 again",
            5,
        );
        assert_eq!(indices, vec![3, 1]);
    }

    #[test]
    fn test_extraction_tolerates_casing_and_separators() {
        assert_eq!(extract_identifiers("candidate 2, Candidate_4", 5), vec![2, 4]);
    }

    #[test]
    fn test_extraction_drops_out_of_range() {
        assert_eq!(extract_identifiers("CANDIDATE_9 CANDIDATE_2", 3), vec![2]);
        assert_eq!(extract_identifiers("CANDIDATE_0", 3), Vec::<usize>::new());
    }

    #[test]
    fn test_extraction_ignores_prose_without_identifiers() {
        assert!(extract_identifiers("work on the report first", 3).is_empty());
    }

    #[tokio::test]
    async fn test_ai_selection_resolves_by_identifier() {
        let backend = MockCompletionBackend::new()
            .with_fixed_answer("Start with CANDIDATE_2, then CANDIDATE_1.");
        let selection = prioritize(&ranked(3), "what first?", &backend, &ai()).await;

        assert_eq!(selection.source, SelectionSource::AiSelected);
        assert!(selection.degradation.is_none());
        assert_eq!(selection.chosen.len(), 2);
        assert_eq!(selection.chosen[0].item.text, "task 2");
        assert_eq!(selection.chosen[1].item.text, "task 1");
    }

    #[tokio::test]
    async fn test_no_identifiers_falls_back_to_top_k() {
        let backend = MockCompletionBackend::new()
            // Mentions candidate text, but no identifiers: must not fuzzy-match.
            .with_fixed_answer("You should clearly do task 3 first.");
        let mut settings = ai();
        settings.fallback_top_k = 2;

        let selection = prioritize(&ranked(3), "what first?", &backend, &settings).await;
        assert_eq!(selection.source, SelectionSource::FallbackTopK);
        assert_eq!(selection.chosen.len(), 2);
        // Deterministic top of the ranking, not the mentioned "task 3".
        assert_eq!(selection.chosen[0].item.text, "task 1");
        let degradation = selection.degradation.unwrap();
        assert_eq!(degradation.kind, DegradationKind::ExtractionFailure);
        assert!(degradation.recovered);
        assert!(!degradation.hints.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_falls_back_to_top_k() {
        let backend = MockCompletionBackend::new().with_permanent_failure();
        let mut settings = ai();
        settings.fallback_top_k = 1;

        let selection = prioritize(&ranked(3), "q", &backend, &settings).await;
        assert_eq!(selection.source, SelectionSource::FallbackTopK);
        assert_eq!(selection.chosen.len(), 1);
        assert_eq!(
            selection.degradation.unwrap().kind,
            DegradationKind::CompletionTransportFailure
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_falls_back_to_top_k() {
        let backend = MockCompletionBackend::new()
            .with_latency_ms(5_000)
            .with_fixed_answer("CANDIDATE_1");
        let mut settings = ai();
        settings.completion_timeout_secs = 1;

        let selection = prioritize(&ranked(2), "q", &backend, &settings).await;
        assert_eq!(selection.source, SelectionSource::FallbackTopK);
        assert_eq!(
            selection.degradation.unwrap().kind,
            DegradationKind::CompletionTransportFailure
        );
    }

    #[tokio::test]
    async fn test_truncates_to_max_candidates() {
        let backend = MockCompletionBackend::new().with_fixed_answer("CANDIDATE_1");
        let mut settings = ai();
        settings.max_candidates_to_ai = 2;

        prioritize(&ranked(5), "q", &backend, &settings).await;

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].user.contains("CANDIDATE_2"));
        assert!(!calls[0].user.contains("CANDIDATE_3"));
    }

    #[tokio::test]
    async fn test_empty_ranking_never_calls_ai() {
        let backend = MockCompletionBackend::new();
        let empty = RankedResult::empty();
        let selection = prioritize(&empty, "q", &backend, &ai()).await;

        assert!(selection.chosen.is_empty());
        assert!(selection.degradation.is_none());
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_prompt_instructs_identifier_references() {
        let backend = MockCompletionBackend::new().with_fixed_answer("CANDIDATE_1");
        prioritize(&ranked(2), "pick one", &backend, &ai()).await;

        let calls = backend.calls();
        assert!(calls[0].system.contains("ONLY by their identifier"));
        assert!(calls[0].user.contains("Query: pick one"));
        assert!(calls[0].user.contains("CANDIDATE_1: task 1"));
    }
}
