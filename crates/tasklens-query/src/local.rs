//! Deterministic query parser.
//!
//! Composes recognition, language detection, keyword extraction, and time
//! resolution into a [`QueryIntent`]. Pure: the same query, settings, and
//! reference date always produce the same intent. The only failure mode is
//! malformed settings, which is fatal and never retried.

use chrono::NaiveDate;
use tracing::debug;

use tasklens_core::{
    defaults, detect_and_convert, CompiledTerms, DueFilter, QueryIntent, Result, Settings,
};

use crate::keywords;
use crate::recognize::{recognize, DueToken};
use crate::script::detect_script;

/// Parse a query deterministically.
///
/// Validates the settings (fatal on malformed configuration), compiles the
/// term lists, and delegates to [`parse_local_compiled`].
pub fn parse_local(query: &str, settings: &Settings, reference: NaiveDate) -> Result<QueryIntent> {
    settings.validate()?;
    let terms = settings.recognition.compile();
    Ok(parse_local_compiled(query, &terms, reference))
}

/// Parse a query against already-compiled term lists. Infallible.
///
/// The pipeline compiles terms once per settings load and calls this
/// directly; [`parse_local`] exists for one-shot callers.
pub fn parse_local_compiled(
    query: &str,
    terms: &CompiledTerms,
    reference: NaiveDate,
) -> QueryIntent {
    let recognized = recognize(query, terms);
    let language = detect_language(query, terms);
    let core_keywords = keywords::extract(&recognized.residual, &language, terms);

    let due = resolve_due(recognized.due, reference);
    let has_filters = recognized.priority.is_some()
        || due.is_some()
        || recognized.status.is_some()
        || recognized.folder.is_some()
        || recognized.tags.is_some();

    let vague = core_keywords.is_empty() && !has_filters;
    let confidence = if has_filters {
        defaults::CONFIDENCE_FILTERS
    } else if !core_keywords.is_empty() {
        defaults::CONFIDENCE_KEYWORDS
    } else {
        defaults::CONFIDENCE_VAGUE
    };

    debug!(
        keyword_count = core_keywords.len(),
        vague,
        language = %language,
        "Local parse complete"
    );

    QueryIntent {
        expanded_keywords: core_keywords.clone(),
        core_keywords,
        priority: recognized.priority,
        due,
        status: recognized.status,
        folder: recognized.folder,
        tags: recognized.tags,
        vague,
        language,
        confidence,
    }
}

/// Resolve a recognized due token into a concrete filter.
///
/// Labels go through the time context service; an unresolvable label drops
/// the filter rather than guessing.
pub(crate) fn resolve_due(token: Option<DueToken>, reference: NaiveDate) -> Option<DueFilter> {
    match token? {
        DueToken::Explicit(date) => Some(DueFilter::On(date)),
        DueToken::Label(label) => {
            let resolution = detect_and_convert(&label, reference);
            if resolution.matched {
                Some(DueFilter::Within(resolution.range))
            } else {
                debug!(label = %label, "Unresolvable time label, dropping due filter");
                None
            }
        }
        DueToken::Present => Some(DueFilter::Present),
        DueToken::Absent => Some(DueFilter::Absent),
    }
}

/// Detect the query language.
///
/// Counts which configured locale's terms appear in the query; the locale
/// with the most hits wins (ties resolve lexicographically). Falls back to
/// the primary Unicode script when no term matched.
pub fn detect_language(query: &str, terms: &CompiledTerms) -> String {
    let mut hits: Vec<(&String, usize)> = Vec::new();
    for token in keywords::segment(&query.to_lowercase()) {
        if let Some(locale) = terms.locale_of.get(&token) {
            match hits.iter_mut().find(|(l, _)| *l == locale) {
                Some((_, count)) => *count += 1,
                None => hits.push((locale, 1)),
            }
        }
    }

    hits.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    match hits.first() {
        Some((locale, _)) => (*locale).clone(),
        None => detect_script(query).fallback_locale().to_string(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tasklens_core::{DateRange, FilterSpec};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn settings() -> Settings {
        Settings::builtin()
    }

    #[test]
    fn test_parse_filters_and_keywords() {
        let intent =
            parse_local("review mockups s:open p:1,2", &settings(), date(2025, 1, 20)).unwrap();

        assert_eq!(intent.core_keywords, vec!["review", "mockups"]);
        assert_eq!(intent.expanded_keywords, intent.core_keywords);
        assert_eq!(intent.priority, Some(FilterSpec::OneOf(vec![1, 2])));
        assert_eq!(intent.status, Some(FilterSpec::Equals("open".to_string())));
        assert!(!intent.vague);
        assert_eq!(intent.confidence, defaults::CONFIDENCE_FILTERS);
    }

    #[test]
    fn test_parse_keywords_only() {
        let intent = parse_local("quarterly report", &settings(), date(2025, 1, 20)).unwrap();
        assert_eq!(intent.core_keywords, vec!["quarterly", "report"]);
        assert!(intent.due.is_none());
        assert!(!intent.vague);
        assert_eq!(intent.confidence, defaults::CONFIDENCE_KEYWORDS);
    }

    #[test]
    fn test_parse_vague_query() {
        // Every token is a stop word: no keywords, no filters.
        let intent = parse_local("what should i do", &settings(), date(2025, 1, 20)).unwrap();
        assert!(intent.core_keywords.is_empty());
        assert!(intent.vague);
        assert_eq!(intent.confidence, defaults::CONFIDENCE_VAGUE);
    }

    #[test]
    fn test_time_label_resolved_through_time_context() {
        let intent = parse_local("overdue", &settings(), date(2025, 1, 20)).unwrap();
        assert_eq!(
            intent.due,
            Some(DueFilter::Within(DateRange::new(
                None,
                Some(date(2025, 1, 19))
            )))
        );
        assert!(!intent.vague);
    }

    #[test]
    fn test_explicit_due_date() {
        let intent = parse_local("d:2025-03-01 taxes", &settings(), date(2025, 1, 20)).unwrap();
        assert_eq!(intent.due, Some(DueFilter::On(date(2025, 3, 1))));
    }

    #[test]
    fn test_due_sentinels() {
        let intent = parse_local("d:none", &settings(), date(2025, 1, 20)).unwrap();
        assert_eq!(intent.due, Some(DueFilter::Absent));

        let intent = parse_local("d:all", &settings(), date(2025, 1, 20)).unwrap();
        assert_eq!(intent.due, Some(DueFilter::Present));
    }

    #[test]
    fn test_german_query() {
        let intent = parse_local("dringende Aufgaben heute", &settings(), date(2025, 1, 20)).unwrap();
        // "dringende" is not the exact configured term ("dringend"); it stays
        // a keyword, while "heute" resolves to a due range.
        assert_eq!(intent.language, "de");
        assert_eq!(
            intent.due,
            Some(DueFilter::Within(DateRange::new(
                None,
                Some(date(2025, 1, 20))
            )))
        );
    }

    #[test]
    fn test_cjk_query() {
        let intent = parse_local("今天的任务", &settings(), date(2025, 1, 20)).unwrap();
        assert_eq!(intent.language, "zh");
        assert!(intent.due.is_some());
        assert!(!intent.core_keywords.is_empty());
    }

    #[test]
    fn test_malformed_settings_fatal() {
        let mut bad = settings();
        bad.weights.relevance = f32::NAN;
        let err = parse_local("anything", &bad, date(2025, 1, 20)).unwrap_err();
        assert!(matches!(err, tasklens_core::Error::Config(_)));
    }

    #[test]
    fn test_determinism_byte_identical() {
        let s = settings();
        let reference = date(2025, 1, 20);
        let a = parse_local("urgent review p:1 d:today #work", &s, reference).unwrap();
        let b = parse_local("urgent review p:1 d:today #work", &s, reference).unwrap();
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    #[test]
    fn test_detect_language_prefers_term_hits() {
        let terms = settings().recognition.compile();
        assert_eq!(detect_language("erledigt offen", &terms), "de");
        assert_eq!(detect_language("open done today", &terms), "en");
    }

    #[test]
    fn test_detect_language_script_fallback() {
        let terms = settings().recognition.compile();
        // No configured Cyrillic terms: falls back to script.
        assert_eq!(detect_language("срочные задачи", &terms), "ru");
    }
}
