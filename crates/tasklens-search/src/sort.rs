//! Total ordering over scored candidates.
//!
//! Primary key: composite score descending. Ties walk the configured
//! criteria chain, and identifier-ascending is always applied last, so no
//! two distinct items ever compare equal; the sort is total and stable by
//! construction.

use std::cmp::Ordering;

use chrono::NaiveDate;

use tasklens_core::{ScoredCandidate, TieBreaker};

/// Compare two candidates under the configured tie-break chain.
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate, chain: &[TieBreaker]) -> Ordering {
    // Scores are finite by construction (weights are validated), so the
    // partial comparison cannot fail; equal-or-incomparable falls through.
    match b.score.partial_cmp(&a.score) {
        Some(Ordering::Equal) | None => {}
        Some(order) => return order,
    }

    for criterion in chain {
        let order = match criterion {
            TieBreaker::PriorityDesc => b.item.priority.cmp(&a.item.priority),
            TieBreaker::PriorityAsc => a.item.priority.cmp(&b.item.priority),
            TieBreaker::DueDateAsc => due_key(a.item.due).cmp(&due_key(b.item.due)),
            TieBreaker::DueDateDesc => due_key(b.item.due).cmp(&due_key(a.item.due)),
            TieBreaker::CreatedDesc => b.item.created_at.cmp(&a.item.created_at),
            TieBreaker::CreatedAsc => a.item.created_at.cmp(&b.item.created_at),
        };
        if order != Ordering::Equal {
            return order;
        }
    }

    // Mandatory final criterion: identifier ascending.
    a.item.id.cmp(&b.item.id)
}

/// Items without a due date sort after dated items in ascending order.
fn due_key(due: Option<NaiveDate>) -> (bool, NaiveDate) {
    (due.is_none(), due.unwrap_or(NaiveDate::MAX))
}
