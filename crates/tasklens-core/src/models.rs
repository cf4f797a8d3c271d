//! Core data model for the query understanding and ranking pipeline.
//!
//! All types here are value types: created fresh per query, never mutated
//! after construction, and discarded once the caller consumes them. The item
//! corpus itself is owned by the external store and read-only to this crate.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// ITEMS
// =============================================================================

/// A schedulable work-unit from the external store.
///
/// `status` is an open category name (the host application configures which
/// categories exist and which of them count as incomplete), `priority` is a
/// nullable ordinal where a higher value means a higher priority level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub text: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

// =============================================================================
// FILTERS
// =============================================================================

/// A filter on a single category of item properties.
///
/// `Present` and `Absent` are the reserved sentinel values ("all"/"none" in
/// query syntax): `Present` matches any item where the property is set,
/// `Absent` matches items where it is null/empty. `OneOf` has OR semantics
/// within the category; categories combine with AND at search time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterSpec<T> {
    Equals(T),
    OneOf(Vec<T>),
    /// Sentinel "all": matches items where the property is present.
    Present,
    /// Sentinel "none": matches items where the property is absent.
    Absent,
}

impl<T> FilterSpec<T> {
    /// Collapse a value list into the simplest representation.
    pub fn from_values(mut values: Vec<T>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => Some(FilterSpec::Equals(values.remove(0))),
            _ => Some(FilterSpec::OneOf(values)),
        }
    }
}

/// An inclusive date range; either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Check whether `date` falls within the range (inclusive on both ends).
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map(|s| date >= s).unwrap_or(true) && self.end.map(|e| date <= e).unwrap_or(true)
    }
}

/// Due-date filter.
///
/// A single date and a range are mutually exclusive by construction; the
/// sentinels follow the same presence/absence semantics as [`FilterSpec`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DueFilter {
    On(NaiveDate),
    Within(DateRange),
    Present,
    Absent,
}

// =============================================================================
// QUERY INTENT
// =============================================================================

/// Structured interpretation of a raw query.
///
/// `expanded_keywords` is a superset of `core_keywords` (equal on the
/// deterministic path). When `vague` is true and a temporal label was
/// detected, the label has already been resolved into `due` by the time the
/// intent is constructed; downstream consumers never see raw labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    pub core_keywords: Vec<String>,
    pub expanded_keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<FilterSpec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DueFilter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<FilterSpec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<FilterSpec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<FilterSpec<String>>,
    pub vague: bool,
    /// Detected locale code (e.g. "en", "de", "zh").
    pub language: String,
    /// Parser confidence in [0, 1].
    pub confidence: f32,
}

impl QueryIntent {
    /// Check whether any filter dimension is set.
    pub fn has_filters(&self) -> bool {
        self.priority.is_some()
            || self.due.is_some()
            || self.status.is_some()
            || self.folder.is_some()
            || self.tags.is_some()
    }

    /// An intent that matches nothing in particular: no keywords, no filters.
    pub fn empty(language: impl Into<String>) -> Self {
        Self {
            core_keywords: Vec::new(),
            expanded_keywords: Vec::new(),
            priority: None,
            due: None,
            status: None,
            folder: None,
            tags: None,
            vague: true,
            language: language.into(),
            confidence: 0.0,
        }
    }
}

// =============================================================================
// RANKING OUTPUT
// =============================================================================

/// Per-bonus score components. Advisory only: ordering is decided by
/// [`ScoredCandidate::score`], the breakdown exists for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub relevance: f32,
    pub due_urgency: f32,
    pub priority: f32,
    pub exact_match: f32,
    pub keyword_matches: u32,
}

/// An item paired with its composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub item: Item,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
}

/// Summary of the filters a search actually applied. Carried on the result
/// so callers can render "filtered by ..." without re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppliedFilters {
    pub priority: bool,
    pub due: bool,
    pub status: bool,
    pub folder: bool,
    pub tags: bool,
}

/// Ordered search output. An empty candidate list is a valid result, not an
/// error (empty corpus and no-matches both land here).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidates: Vec<ScoredCandidate>,
    pub applied: AppliedFilters,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation: Option<StructuredError>,
}

impl RankedResult {
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            applied: AppliedFilters::default(),
            degradation: None,
        }
    }
}

// =============================================================================
// FINAL SELECTION
// =============================================================================

/// How the final candidate subset was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionSource {
    /// The AI service chose candidates by identifier.
    AiSelected,
    /// Deterministic top-K of the already-ranked candidates.
    FallbackTopK,
}

/// The delivered subset of candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSelection {
    pub chosen: Vec<ScoredCandidate>,
    pub source: SelectionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degradation: Option<StructuredError>,
}

// =============================================================================
// STRUCTURED ERRORS
// =============================================================================

/// Classification of a recoverable pipeline degradation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    /// AI parse failed; the deterministic parser supplied the intent.
    ParserFailure,
    /// Completion transport failed (network, timeout, non-success status).
    CompletionTransportFailure,
    /// No candidate identifiers were resolvable from the AI answer.
    ExtractionFailure,
}

impl std::fmt::Display for DegradationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ParserFailure => write!(f, "parser_failure"),
            Self::CompletionTransportFailure => write!(f, "completion_transport_failure"),
            Self::ExtractionFailure => write!(f, "extraction_failure"),
        }
    }
}

/// A recoverable failure, converted at the boundary where it occurred and
/// attached to the final output. The pipeline never throws these across
/// component boundaries, and never degrades silently: the message states
/// which stage degraded and why, `hints` carry ordered remediation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredError {
    pub kind: DegradationKind,
    pub message: String,
    #[serde(default)]
    pub hints: Vec<String>,
    /// True when a fallback still produced usable output.
    pub recovered: bool,
}

impl StructuredError {
    pub fn new(kind: DegradationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            hints: Vec::new(),
            recovered: false,
        }
    }

    pub fn with_hints(mut self, hints: Vec<String>) -> Self {
        self.hints = hints;
        self
    }

    pub fn recovered(mut self) -> Self {
        self.recovered = true;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================
