//! AI-assisted query parser.
//!
//! Asks the completion service for a fixed-shape JSON interpretation of the
//! query, validates it strictly, and merges it with the deterministic parse.
//! The model is only allowed to *detect* temporal intent as a normalized
//! label; all date arithmetic happens in the time context service, identical
//! to the deterministic path.
//!
//! The free-form answer is adversarial input: it is fence-stripped, reduced
//! to its first JSON object, decoded with `deny_unknown_fields`, and
//! validated before anything reaches a [`QueryIntent`]. Any failure returns
//! a tagged [`ParserFailure`] (no retry, no panic) so the caller can fall
//! back to the deterministic parser.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use tasklens_core::{
    defaults, CompiledTerms, CompletionBackend, CompletionRequest, DueFilter, FilterSpec,
    QueryIntent, Settings,
};

use crate::local::parse_local_compiled;
use crate::recognize::DueToken;

// =============================================================================
// FAILURE TYPE
// =============================================================================

/// Why the AI-assisted parse did not produce an intent.
///
/// Carried back to the pipeline so it can fall back to the deterministic
/// parser and attach an informational structured error to the final result.
#[derive(Debug, Clone, Error)]
pub enum ParserFailure {
    /// The completion call itself failed (network, timeout, non-success).
    #[error("completion transport failed: {0}")]
    Transport(String),
    /// The answer was not decodable as the requested JSON shape.
    #[error("malformed answer: {0}")]
    Malformed(String),
    /// The answer decoded but violated shape constraints.
    #[error("invalid answer shape: {0}")]
    InvalidShape(String),
}

// =============================================================================
// ANSWER SHAPE
// =============================================================================

/// The fixed answer shape requested from the model. Unknown fields are a
/// decode error by design.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct AiAnswer {
    #[serde(default)]
    core_keywords: Vec<String>,
    /// Per-keyword synonym expansions.
    #[serde(default)]
    expansions: HashMap<String, Vec<String>>,
    /// Compact filter value syntax: "1,2", "high", "all", "none".
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    folder: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    /// An explicit date written in the query, ISO formatted.
    #[serde(default)]
    due_date: Option<String>,
    /// A normalized relative-time label; never a computed date.
    #[serde(default)]
    time_label: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    vague: Option<bool>,
    #[serde(default)]
    confidence: Option<f32>,
}

/// JSON schema hint sent alongside the request for backends that support
/// constrained output.
pub fn answer_shape_hint() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "core_keywords": {"type": "array", "items": {"type": "string"}},
            "expansions": {
                "type": "object",
                "additionalProperties": {"type": "array", "items": {"type": "string"}}
            },
            "priority": {"type": ["string", "null"]},
            "status": {"type": ["string", "null"]},
            "folder": {"type": ["string", "null"]},
            "tags": {"type": ["array", "null"], "items": {"type": "string"}},
            "due_date": {"type": ["string", "null"]},
            "time_label": {"type": ["string", "null"]},
            "language": {"type": ["string", "null"]},
            "vague": {"type": "boolean"},
            "confidence": {"type": "number"}
        },
        "required": ["core_keywords"]
    })
}

// =============================================================================
// PROMPTS
// =============================================================================

/// System instruction for the parse call.
pub fn parse_system_prompt() -> String {
    r#"You interpret task search queries. Answer with a single JSON object and nothing else, using exactly these keys: core_keywords, expansions, priority, status, folder, tags, due_date, time_label, language, vague, confidence.

Rules:
- core_keywords: content words from the query, lowercased, no filter words.
- expansions: up to a few close synonyms per core keyword, same language as the query.
- priority/status/folder: a value, a comma-separated list, "all", "none", or null.
- tags: a list of tag names, or null.
- due_date: only a date literally written in the query, formatted YYYY-MM-DD, else null.
- time_label: if the query implies a time frame, exactly one of: today, tomorrow, overdue, this_week, next_week, this_weekend, this_month, next_month. Never compute or output any other date. Else null.
- language: the query's language code (e.g. "en", "de", "zh").
- vague: true when the query has no directly filterable criteria.
- confidence: your confidence in this interpretation, 0.0 to 1.0."#
        .to_string()
}

/// User content for the parse call.
pub fn parse_user_prompt(query: &str) -> String {
    format!("Query:\n{}", query)
}

// =============================================================================
// PARSER
// =============================================================================

/// Parse a query with AI assistance.
///
/// Settings are assumed validated (the pipeline validates once per load).
/// On any failure the caller falls back to [`parse_local_compiled`]; the
/// fallback path yields non-empty keywords whenever the raw query contains
/// recognizable tokens.
pub async fn parse_with_ai(
    query: &str,
    settings: &Settings,
    client: &dyn CompletionBackend,
    reference: NaiveDate,
) -> Result<QueryIntent, ParserFailure> {
    let terms = settings.recognition.compile();
    parse_with_ai_compiled(query, settings, &terms, client, reference).await
}

/// [`parse_with_ai`] against already-compiled term lists.
pub async fn parse_with_ai_compiled(
    query: &str,
    settings: &Settings,
    terms: &CompiledTerms,
    client: &dyn CompletionBackend,
    reference: NaiveDate,
) -> Result<QueryIntent, ParserFailure> {
    let request = CompletionRequest::new(parse_system_prompt(), parse_user_prompt(query))
        .with_shape_hint(answer_shape_hint())
        .with_temperature(settings.ai.temperature)
        .with_max_tokens(defaults::MAX_ANSWER_TOKENS);

    let answer = client
        .complete(&request)
        .await
        .map_err(|e| ParserFailure::Transport(e.to_string()))?;

    if answer.len() > settings.ai.max_answer_bytes {
        return Err(ParserFailure::Malformed(format!(
            "answer of {} bytes exceeds the {} byte bound",
            answer.len(),
            settings.ai.max_answer_bytes
        )));
    }

    let object = extract_json_object(&answer)
        .ok_or_else(|| ParserFailure::Malformed("no JSON object in answer".to_string()))?;
    let decoded: AiAnswer = serde_json::from_str(object)
        .map_err(|e| ParserFailure::Malformed(e.to_string()))?;

    build_intent(query, settings, terms, decoded, reference)
}

/// Merge the decoded answer with the deterministic parse.
///
/// Locally recognized filters win over AI-claimed filters: determinism over
/// nuance, the same trade-off the extraction fallback makes.
fn build_intent(
    query: &str,
    settings: &Settings,
    terms: &CompiledTerms,
    answer: AiAnswer,
    reference: NaiveDate,
) -> Result<QueryIntent, ParserFailure> {
    let confidence = answer.confidence.unwrap_or(0.5);
    if !confidence.is_finite() {
        return Err(ParserFailure::InvalidShape(
            "confidence is not a finite number".to_string(),
        ));
    }

    let local = parse_local_compiled(query, terms, reference);

    let mut core_keywords: Vec<String> = Vec::new();
    for keyword in &answer.core_keywords {
        let keyword = keyword.trim().to_lowercase();
        if !keyword.is_empty() && !core_keywords.contains(&keyword) {
            core_keywords.push(keyword);
        }
    }
    if core_keywords.is_empty() {
        core_keywords = local.core_keywords.clone();
    }

    let expanded_keywords = bound_expansions(
        &core_keywords,
        &answer.expansions,
        settings.ai.max_expansions_per_keyword,
        settings.ai.max_total_expansions,
    );

    let priority = local.priority.clone().or_else(|| {
        answer
            .priority
            .as_deref()
            .and_then(|v| parse_priority_values(v, terms))
    });
    let status = local.status.clone().or_else(|| {
        answer
            .status
            .as_deref()
            .and_then(|v| parse_string_values(v, Some(&terms.status), terms))
    });
    let folder = local.folder.clone().or_else(|| {
        answer
            .folder
            .as_deref()
            .and_then(|v| parse_string_values(v, None, terms))
    });
    let tags = local.tags.clone().or_else(|| {
        answer.tags.as_ref().and_then(|list| {
            let values: Vec<String> = list
                .iter()
                .map(|t| t.trim().trim_start_matches('#').to_lowercase())
                .filter(|t| !t.is_empty())
                .collect();
            FilterSpec::from_values(dedup(values))
        })
    });

    let due = local.due.clone().or_else(|| resolve_answer_due(&answer, reference));

    let language = answer
        .language
        .as_deref()
        .map(|l| l.trim().to_lowercase())
        .filter(|l| !l.is_empty() && l.len() <= 8)
        .unwrap_or_else(|| local.language.clone());

    let vague = answer.vague.unwrap_or(local.vague);

    debug!(
        keyword_count = core_keywords.len(),
        expanded = expanded_keywords.len(),
        vague,
        "AI parse accepted"
    );

    Ok(QueryIntent {
        core_keywords,
        expanded_keywords,
        priority,
        due,
        status,
        folder,
        tags,
        vague,
        language,
        confidence: confidence.clamp(0.0, 1.0),
    })
}

fn resolve_answer_due(answer: &AiAnswer, reference: NaiveDate) -> Option<DueFilter> {
    if let Some(raw) = answer.due_date.as_deref() {
        if let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
            return Some(DueFilter::On(date));
        }
        warn!(due_date = %raw, "AI returned an unparseable due_date, ignoring");
    }
    let label = answer.time_label.as_deref()?.trim();
    if label.is_empty() {
        return None;
    }
    // Same resolution as the deterministic path; the label is the only thing
    // the model was allowed to produce.
    crate::local::resolve_due(Some(DueToken::Label(label.to_string())), reference)
}

/// Expand core keywords, bounded per keyword and in total.
fn bound_expansions(
    core: &[String],
    expansions: &HashMap<String, Vec<String>>,
    per_keyword: usize,
    total: usize,
) -> Vec<String> {
    let mut expanded: Vec<String> = core.to_vec();
    let mut added = 0usize;

    for keyword in core {
        let Some(synonyms) = expansions.get(keyword) else {
            continue;
        };
        let mut taken = 0usize;
        for synonym in synonyms {
            if taken >= per_keyword || added >= total {
                break;
            }
            let synonym = synonym.trim().to_lowercase();
            if synonym.is_empty() || expanded.contains(&synonym) {
                continue;
            }
            expanded.push(synonym);
            taken += 1;
            added += 1;
        }
    }
    expanded
}

fn parse_priority_values(raw: &str, terms: &CompiledTerms) -> Option<FilterSpec<u8>> {
    let raw = raw.trim().to_lowercase();
    if terms.sentinel_all.contains(&raw) {
        return Some(FilterSpec::Present);
    }
    if terms.sentinel_none.contains(&raw) {
        return Some(FilterSpec::Absent);
    }
    let mut values = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if let Ok(level) = part.parse::<u8>() {
            if !values.contains(&level) {
                values.push(level);
            }
        } else if let Some(level) = terms.priority.get(part) {
            if !values.contains(level) {
                values.push(*level);
            }
        }
    }
    FilterSpec::from_values(values)
}

fn parse_string_values(
    raw: &str,
    mapping: Option<&HashMap<String, String>>,
    terms: &CompiledTerms,
) -> Option<FilterSpec<String>> {
    let raw = raw.trim().to_lowercase();
    if terms.sentinel_all.contains(&raw) {
        return Some(FilterSpec::Present);
    }
    if terms.sentinel_none.contains(&raw) {
        return Some(FilterSpec::Absent);
    }
    let values: Vec<String> = raw
        .split(',')
        .map(|part| {
            let part = part.trim();
            mapping
                .and_then(|m| m.get(part).cloned())
                .unwrap_or_else(|| part.to_string())
        })
        .filter(|v| !v.is_empty())
        .collect();
    FilterSpec::from_values(dedup(values))
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut out = Vec::new();
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

// =============================================================================
// JSON EXTRACTION
// =============================================================================

/// Extract the first balanced JSON object from free-form answer text.
///
/// Tolerates surrounding prose and Markdown code fences. String literals are
/// respected so braces inside values cannot unbalance the scan.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
