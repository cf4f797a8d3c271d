//! Property recognition: compact filter markers and multilingual bare terms.
//!
//! Scans a raw query for per-category signals and strips what it claims,
//! leaving residual text for keyword extraction. Two recognition passes run
//! over the same token list:
//!
//! 1. Compact markers (`p:1,2`, `due:today`, `s:open`, `f:work`, `t:home`,
//!    `#tag`); these take precedence over bare terms.
//! 2. Bare multilingual terms from the compiled term lists ("urgent",
//!    "erledigt", "今天"); repeated bare tokens of one category mean
//!    logical OR.
//!
//! No token is claimed twice. Sentinel values ("all"/"none" and their
//! configured synonyms) short-circuit normal value parsing for a category.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

use tasklens_core::{CompiledTerms, FilterSpec, TimeLabel};

use crate::script::is_cjk_char;

static MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(p|prio|priority|d|due|s|status|f|folder|t|tag):(.+)$")
        .expect("marker pattern is valid")
});

// =============================================================================
// RESULT TYPES
// =============================================================================

/// Due-date signal as recognized, before time-context resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum DueToken {
    /// An explicit ISO date (`d:2025-01-20`).
    Explicit(NaiveDate),
    /// A normalized relative-time label, to be resolved by the time context
    /// service against a reference date.
    Label(String),
    Present,
    Absent,
}

/// Everything recognition claimed, per category, plus the residual text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizedTokens {
    pub priority: Option<FilterSpec<u8>>,
    pub status: Option<FilterSpec<String>>,
    pub folder: Option<FilterSpec<String>>,
    pub tags: Option<FilterSpec<String>>,
    pub due: Option<DueToken>,
    /// The query with recognized tokens stripped, single-space joined.
    pub residual: String,
}

impl RecognizedTokens {
    pub fn has_any(&self) -> bool {
        self.priority.is_some()
            || self.status.is_some()
            || self.folder.is_some()
            || self.tags.is_some()
            || self.due.is_some()
    }
}

// =============================================================================
// COLLECTORS
// =============================================================================

/// Accumulates values for one category; a sentinel wins over any values.
#[derive(Debug, Default)]
struct Collector<T> {
    values: Vec<T>,
    sentinel: Option<bool>, // true = all/present, false = none/absent
    /// Set when a compact marker claimed this category; bare terms then
    /// leave the category alone (and stay in the residual as keywords).
    from_marker: bool,
}

impl<T: PartialEq> Collector<T> {
    fn push(&mut self, value: T) {
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    fn into_filter(self) -> Option<FilterSpec<T>> {
        match self.sentinel {
            Some(true) => Some(FilterSpec::Present),
            Some(false) => Some(FilterSpec::Absent),
            None => FilterSpec::from_values(self.values),
        }
    }
}

// =============================================================================
// RECOGNITION
// =============================================================================

/// Recognize filter signals in `text` against the compiled term lists.
pub fn recognize(text: &str, terms: &CompiledTerms) -> RecognizedTokens {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let mut claimed = vec![false; tokens.len()];
    // Residual replacement for partially claimed (CJK) tokens.
    let mut replacement: Vec<Option<String>> = vec![None; tokens.len()];

    let mut priority: Collector<u8> = Collector::default();
    let mut status: Collector<String> = Collector::default();
    let mut folder: Collector<String> = Collector::default();
    let mut tags: Collector<String> = Collector::default();
    let mut due: Option<DueToken> = None;
    let mut due_from_marker = false;

    // Pass 1: compact markers.
    for (i, token) in tokens.iter().enumerate() {
        if let Some(caps) = MARKER.captures(token) {
            let category = caps.get(1).map(|m| m.as_str().to_lowercase()).unwrap_or_default();
            let raw_values = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let values: Vec<String> = raw_values
                .split(',')
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect();
            if values.is_empty() {
                continue;
            }

            claimed[i] = true;
            match category.as_str() {
                "p" | "prio" | "priority" => {
                    priority.from_marker = true;
                    for value in &values {
                        if let Some(sentinel) = sentinel_of(value, terms) {
                            priority.sentinel = Some(sentinel);
                        } else if let Ok(level) = value.parse::<u8>() {
                            priority.push(level);
                        } else if let Some(level) = terms.priority.get(value) {
                            priority.push(*level);
                        } else {
                            trace!(value = %value, "Unrecognized priority marker value");
                        }
                    }
                }
                "s" | "status" => {
                    status.from_marker = true;
                    for value in &values {
                        if let Some(sentinel) = sentinel_of(value, terms) {
                            status.sentinel = Some(sentinel);
                        } else if let Some(category) = terms.status.get(value) {
                            status.push(category.clone());
                        } else {
                            status.push(value.clone());
                        }
                    }
                }
                "f" | "folder" => {
                    folder.from_marker = true;
                    for value in &values {
                        if let Some(sentinel) = sentinel_of(value, terms) {
                            folder.sentinel = Some(sentinel);
                        } else {
                            folder.push(value.clone());
                        }
                    }
                }
                "t" | "tag" => {
                    tags.from_marker = true;
                    for value in &values {
                        if let Some(sentinel) = sentinel_of(value, terms) {
                            tags.sentinel = Some(sentinel);
                        } else {
                            tags.push(value.trim_start_matches('#').to_string());
                        }
                    }
                }
                "d" | "due" => {
                    due_from_marker = true;
                    // First parseable value wins; a sentinel wins over values.
                    for value in &values {
                        if let Some(sentinel) = sentinel_of(value, terms) {
                            due = Some(if sentinel {
                                DueToken::Present
                            } else {
                                DueToken::Absent
                            });
                            break;
                        }
                        if due.is_some() {
                            continue;
                        }
                        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
                            due = Some(DueToken::Explicit(date));
                        } else if let Some(label) = terms.time.get(value) {
                            due = Some(DueToken::Label(label.clone()));
                        } else if TimeLabel::parse(value).is_some() {
                            due = Some(DueToken::Label(value.clone()));
                        } else {
                            trace!(value = %value, "Unrecognized due marker value");
                        }
                    }
                }
                _ => unreachable!("marker pattern limits categories"),
            }
        } else if let Some(name) = token.strip_prefix('#') {
            let name = name.trim().to_lowercase();
            if !name.is_empty() {
                claimed[i] = true;
                tags.from_marker = true;
                tags.push(name);
            }
        }
    }

    // Pass 2: bare multilingual terms on unclaimed tokens.
    for (i, token) in tokens.iter().enumerate() {
        if claimed[i] {
            continue;
        }
        let bare = trim_token(token);
        if bare.is_empty() {
            continue;
        }

        if !priority.from_marker {
            if let Some(level) = terms.priority.get(&bare) {
                priority.push(*level);
                claimed[i] = true;
                continue;
            }
        }
        if !status.from_marker {
            if let Some(category) = terms.status.get(&bare) {
                status.push(category.clone());
                claimed[i] = true;
                continue;
            }
        }
        if !due_from_marker && due.is_none() {
            if let Some(label) = terms.time.get(&bare) {
                due = Some(DueToken::Label(label.clone()));
                claimed[i] = true;
                continue;
            }
        }

        // CJK tokens are rarely space-delimited; claim embedded terms.
        if bare.chars().any(is_cjk_char) {
            if let Some(rest) = claim_embedded_cjk(
                &bare,
                terms,
                &mut priority,
                &mut status,
                &mut due,
                due_from_marker,
            ) {
                if rest.is_empty() {
                    claimed[i] = true;
                } else {
                    replacement[i] = Some(rest);
                }
            }
        }
    }

    let residual = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| !claimed[*i])
        .map(|(i, token)| replacement[i].clone().unwrap_or_else(|| token.to_string()))
        .collect::<Vec<String>>()
        .join(" ");

    RecognizedTokens {
        priority: priority.into_filter(),
        status: status.into_filter(),
        folder: folder.into_filter(),
        tags: tags.into_filter(),
        due,
        residual,
    }
}

fn sentinel_of(value: &str, terms: &CompiledTerms) -> Option<bool> {
    if terms.sentinel_all.contains(value) {
        Some(true)
    } else if terms.sentinel_none.contains(value) {
        Some(false)
    } else {
        None
    }
}

fn trim_token(token: &str) -> String {
    token
        .to_lowercase()
        .trim_matches(|c: char| !c.is_alphanumeric() && !is_cjk_char(c))
        .to_string()
}

/// Claim configured CJK terms embedded in a token.
///
/// Matches are selected greedily left-to-right, longest-first at each
/// position; candidate ordering is fully sorted so recognition never depends
/// on hash-map iteration order. Returns the token with claimed spans removed,
/// or `None` if nothing matched.
fn claim_embedded_cjk(
    token: &str,
    terms: &CompiledTerms,
    priority: &mut Collector<u8>,
    status: &mut Collector<String>,
    due: &mut Option<DueToken>,
    due_from_marker: bool,
) -> Option<String> {
    #[derive(Debug)]
    enum Claim {
        Priority(u8),
        Status(String),
        Time(String),
    }

    // (start, -len) ordering gives leftmost-longest.
    let mut candidates: Vec<(usize, usize, String, Claim)> = Vec::new();
    if !priority.from_marker {
        for (term, level) in &terms.priority {
            if term.chars().any(is_cjk_char) {
                for (pos, _) in token.match_indices(term.as_str()) {
                    candidates.push((pos, term.len(), term.clone(), Claim::Priority(*level)));
                }
            }
        }
    }
    if !status.from_marker {
        for (term, category) in &terms.status {
            if term.chars().any(is_cjk_char) {
                for (pos, _) in token.match_indices(term.as_str()) {
                    candidates.push((pos, term.len(), term.clone(), Claim::Status(category.clone())));
                }
            }
        }
    }
    if !due_from_marker && due.is_none() {
        for (term, label) in &terms.time {
            if term.chars().any(is_cjk_char) {
                for (pos, _) in token.match_indices(term.as_str()) {
                    candidates.push((pos, term.len(), term.clone(), Claim::Time(label.clone())));
                }
            }
        }
    }
    if candidates.is_empty() {
        return None;
    }

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

    let mut claimed_spans: Vec<(usize, usize)> = Vec::new();
    for (start, len, _, claim) in candidates {
        let end = start + len;
        if claimed_spans.iter().any(|(s, e)| start < *e && end > *s) {
            continue;
        }
        match claim {
            Claim::Priority(level) => priority.push(level),
            Claim::Status(category) => status.push(category),
            Claim::Time(label) => {
                if due.is_some() {
                    continue;
                }
                *due = Some(DueToken::Label(label));
            }
        }
        claimed_spans.push((start, end));
    }
    if claimed_spans.is_empty() {
        return None;
    }

    let mut rest = String::new();
    for (pos, ch) in token.char_indices() {
        let end = pos + ch.len_utf8();
        if !claimed_spans.iter().any(|(s, e)| pos >= *s && end <= *e) {
            rest.push(ch);
        }
    }
    Some(rest)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tasklens_core::RecognitionConfig;

    fn terms() -> CompiledTerms {
        RecognitionConfig::builtin().compile()
    }

    #[test]
    fn test_priority_marker_single_value() {
        let rec = recognize("p:2 review", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Equals(2)));
        assert_eq!(rec.residual, "review");
    }

    #[test]
    fn test_priority_marker_comma_list() {
        let rec = recognize("s:open p:1,2", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::OneOf(vec![1, 2])));
        assert_eq!(rec.status, Some(FilterSpec::Equals("open".to_string())));
        assert_eq!(rec.residual, "");
    }

    #[test]
    fn test_marker_word_value() {
        let rec = recognize("p:high mockups", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Equals(3)));
    }

    #[test]
    fn test_sentinel_short_circuits_values() {
        let rec = recognize("p:1,all,2", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Present));

        let rec = recognize("d:none", &terms());
        assert_eq!(rec.due, Some(DueToken::Absent));
    }

    #[test]
    fn test_due_marker_label_and_date() {
        let rec = recognize("d:today", &terms());
        assert_eq!(rec.due, Some(DueToken::Label("today".to_string())));

        let rec = recognize("due:2025-03-01", &terms());
        assert_eq!(
            rec.due,
            Some(DueToken::Explicit(
                NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
            ))
        );
    }

    #[test]
    fn test_bare_terms_multilingual() {
        let rec = recognize("dringend Entwürfe prüfen", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Equals(3)));
        assert_eq!(rec.residual, "Entwürfe prüfen");
    }

    #[test]
    fn test_repeated_bare_tokens_mean_or() {
        let rec = recognize("urgent low tasks", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::OneOf(vec![3, 1])));
    }

    #[test]
    fn test_marker_takes_precedence_over_bare_terms() {
        // p:2 claims the category; "urgent" stays residual text.
        let rec = recognize("urgent p:2", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Equals(2)));
        assert_eq!(rec.residual, "urgent");
    }

    #[test]
    fn test_no_token_claimed_twice() {
        // "open" is both a status term and could be a keyword; once claimed
        // for status it must not reappear in the residual.
        let rec = recognize("open issues", &terms());
        assert_eq!(rec.status, Some(FilterSpec::Equals("open".to_string())));
        assert_eq!(rec.residual, "issues");
    }

    #[test]
    fn test_tag_shorthand() {
        let rec = recognize("#work report", &terms());
        assert_eq!(rec.tags, Some(FilterSpec::Equals("work".to_string())));
        assert_eq!(rec.residual, "report");
    }

    #[test]
    fn test_tag_marker_list() {
        let rec = recognize("t:home,garden", &terms());
        assert_eq!(
            rec.tags,
            Some(FilterSpec::OneOf(vec![
                "home".to_string(),
                "garden".to_string()
            ]))
        );
    }

    #[test]
    fn test_folder_marker() {
        let rec = recognize("f:projects/alpha docs", &terms());
        assert_eq!(
            rec.folder,
            Some(FilterSpec::Equals("projects/alpha".to_string()))
        );
        assert_eq!(rec.residual, "docs");
    }

    #[test]
    fn test_bare_time_label() {
        let rec = recognize("heute einkaufen", &terms());
        assert_eq!(rec.due, Some(DueToken::Label("today".to_string())));
        assert_eq!(rec.residual, "einkaufen");
    }

    #[test]
    fn test_cjk_embedded_terms() {
        // "今天" (today) embedded in an unsegmented CJK token.
        let rec = recognize("今天的任务", &terms());
        assert_eq!(rec.due, Some(DueToken::Label("today".to_string())));
        assert_eq!(rec.residual, "的任务");
    }

    #[test]
    fn test_cjk_embedded_priority_and_time() {
        let rec = recognize("紧急今天", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Equals(3)));
        assert_eq!(rec.due, Some(DueToken::Label("today".to_string())));
        assert_eq!(rec.residual, "");
    }

    #[test]
    fn test_value_dedup() {
        let rec = recognize("p:2,2,2", &terms());
        assert_eq!(rec.priority, Some(FilterSpec::Equals(2)));
    }

    #[test]
    fn test_unrecognized_marker_value_ignored() {
        let rec = recognize("p:banana review", &terms());
        assert_eq!(rec.priority, None);
        // The marker token itself is still claimed.
        assert_eq!(rec.residual, "review");
    }

    #[test]
    fn test_plain_text_claims_nothing() {
        let rec = recognize("write the quarterly report", &terms());
        assert!(!rec.has_any());
        assert_eq!(rec.residual, "write the quarterly report");
    }

    #[test]
    fn test_empty_input() {
        let rec = recognize("", &terms());
        assert!(!rec.has_any());
        assert_eq!(rec.residual, "");
    }

    #[test]
    fn test_determinism_over_repeated_runs() {
        let t = terms();
        let first = recognize("urgent done today #work p:1,2 设计", &t);
        for _ in 0..20 {
            assert_eq!(recognize("urgent done today #work p:1,2 设计", &t), first);
        }
    }
}
