//! # tasklens-search
//!
//! Filtering, scoring, and multi-criteria ranking over an immutable item
//! snapshot. Pure and lock-free: given a fixed corpus, intent, and context,
//! the ranking is byte-identical across runs.

pub mod filter;
pub mod scoring;
pub mod sort;

pub use scoring::SearchContext;

use tracing::debug;

use tasklens_core::{QueryIntent, RankedResult, ScoredCandidate};

/// Rank a corpus snapshot against a query intent.
///
/// Filtering is AND across categories and OR within a category's value set;
/// scoring and ordering follow the context's weights and tie-break chain.
/// Never fails: an empty corpus or an empty intent yields an empty result.
pub fn search(
    corpus: &[tasklens_core::Item],
    intent: &QueryIntent,
    ctx: &SearchContext,
) -> RankedResult {
    let mut candidates: Vec<ScoredCandidate> = corpus
        .iter()
        .filter(|item| filter::matches(item, intent))
        .map(|item| {
            let breakdown = scoring::score_item(item, intent, ctx);
            ScoredCandidate {
                item: item.clone(),
                score: scoring::composite(&breakdown, &ctx.weights),
                breakdown,
            }
        })
        .collect();

    candidates.sort_by(|a, b| sort::compare(a, b, &ctx.tie_break));

    debug!(
        corpus_size = corpus.len(),
        result_count = candidates.len(),
        "Search complete"
    );

    RankedResult {
        candidates,
        applied: filter::applied_filters(intent),
        degradation: None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
