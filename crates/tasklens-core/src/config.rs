//! Pipeline configuration: term lists, scoring weights, tie-break order,
//! and AI call bounds.
//!
//! Every field is explicitly recognized (`deny_unknown_fields`): a settings
//! document with an unknown key fails deserialization instead of being
//! silently ignored. [`Settings::validate`] catches the remaining malformed
//! states as fatal `Error::Config`; validation failures are never retried.
//!
//! Multilingual term lists are declared per locale but merged at load time
//! into one lookup map per category ([`CompiledTerms`]), so recognition cost
//! is proportional to token count rather than token × term-list count.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// RECOGNITION
// =============================================================================

/// Per-locale term lists for property recognition.
///
/// Outer keys are locale codes ("en", "de", ...); inner maps go from the
/// surface term to its normalized meaning (a priority level, a status
/// category, or a normalized time label understood by
/// [`crate::temporal::TimeLabel`]).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub priority_terms: HashMap<String, HashMap<String, u8>>,
    #[serde(default)]
    pub status_terms: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub time_labels: HashMap<String, HashMap<String, String>>,
    /// Surface forms of the "all" sentinel, per locale.
    #[serde(default)]
    pub sentinel_all: HashMap<String, Vec<String>>,
    /// Surface forms of the "none" sentinel, per locale.
    #[serde(default)]
    pub sentinel_none: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub stop_words: HashMap<String, Vec<String>>,
    /// Status categories that count as not-done for scoring.
    #[serde(default)]
    pub incomplete_statuses: Vec<String>,
}

impl RecognitionConfig {
    /// Built-in multilingual defaults (en, de, zh). Documented policy, not
    /// mechanism: hosts may replace any list wholesale.
    pub fn builtin() -> Self {
        let mut priority_terms = HashMap::new();
        priority_terms.insert(
            "en".to_string(),
            [
                ("urgent".to_string(), 3u8),
                ("high".to_string(), 3u8),
                ("important".to_string(), 3u8),
                ("medium".to_string(), 2u8),
                ("low".to_string(), 1u8),
            ]
            .into_iter()
            .collect(),
        );
        priority_terms.insert(
            "de".to_string(),
            [
                ("dringend".to_string(), 3u8),
                ("hoch".to_string(), 3u8),
                ("wichtig".to_string(), 3u8),
                ("mittel".to_string(), 2u8),
                ("niedrig".to_string(), 1u8),
            ]
            .into_iter()
            .collect(),
        );
        priority_terms.insert(
            "zh".to_string(),
            [("紧急".to_string(), 3u8), ("重要".to_string(), 3u8)]
                .into_iter()
                .collect(),
        );

        let mut status_terms = HashMap::new();
        status_terms.insert(
            "en".to_string(),
            [
                ("open".to_string(), "open".to_string()),
                ("pending".to_string(), "open".to_string()),
                ("done".to_string(), "done".to_string()),
                ("completed".to_string(), "done".to_string()),
                ("cancelled".to_string(), "cancelled".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        status_terms.insert(
            "de".to_string(),
            [
                ("offen".to_string(), "open".to_string()),
                ("erledigt".to_string(), "done".to_string()),
                ("abgebrochen".to_string(), "cancelled".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        status_terms.insert(
            "zh".to_string(),
            [
                ("未完成".to_string(), "open".to_string()),
                ("完成".to_string(), "done".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        let mut time_labels = HashMap::new();
        time_labels.insert(
            "en".to_string(),
            [
                ("today".to_string(), "today".to_string()),
                ("tomorrow".to_string(), "tomorrow".to_string()),
                ("overdue".to_string(), "overdue".to_string()),
                ("week".to_string(), "this_week".to_string()),
                ("weekend".to_string(), "this_weekend".to_string()),
                ("month".to_string(), "this_month".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        time_labels.insert(
            "de".to_string(),
            [
                ("heute".to_string(), "today".to_string()),
                ("morgen".to_string(), "tomorrow".to_string()),
                ("überfällig".to_string(), "overdue".to_string()),
                ("woche".to_string(), "this_week".to_string()),
                ("wochenende".to_string(), "this_weekend".to_string()),
                ("monat".to_string(), "this_month".to_string()),
            ]
            .into_iter()
            .collect(),
        );
        time_labels.insert(
            "zh".to_string(),
            [
                ("今天".to_string(), "today".to_string()),
                ("明天".to_string(), "tomorrow".to_string()),
                ("过期".to_string(), "overdue".to_string()),
                ("本周".to_string(), "this_week".to_string()),
            ]
            .into_iter()
            .collect(),
        );

        let mut sentinel_all = HashMap::new();
        sentinel_all.insert("en".to_string(), vec!["all".to_string(), "any".to_string()]);
        sentinel_all.insert("de".to_string(), vec!["alle".to_string()]);

        let mut sentinel_none = HashMap::new();
        sentinel_none.insert(
            "en".to_string(),
            vec!["none".to_string(), "without".to_string()],
        );
        sentinel_none.insert("de".to_string(), vec!["keine".to_string()]);

        let mut stop_words = HashMap::new();
        stop_words.insert(
            "en".to_string(),
            [
                "a", "an", "the", "me", "my", "i", "to", "for", "of", "on", "in", "is", "are",
                "do", "what", "which", "show", "find", "list", "tasks", "task", "should", "and",
                "or", "with", "please",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        stop_words.insert(
            "de".to_string(),
            [
                "der", "die", "das", "ein", "eine", "ich", "mir", "und", "oder", "mit", "für",
                "zu", "was", "zeige", "aufgaben", "aufgabe", "bitte", "soll", "sollte",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        );
        stop_words.insert(
            "zh".to_string(),
            ["的", "了", "我", "是", "在", "吗", "请"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        Self {
            priority_terms,
            status_terms,
            time_labels,
            sentinel_all,
            sentinel_none,
            stop_words,
            incomplete_statuses: vec!["open".to_string(), "pending".to_string()],
        }
    }

    /// Merge the per-locale lists into per-category lookup maps.
    ///
    /// Terms are lowercased. When two locales claim the same surface term
    /// with different meanings, the lexicographically smaller locale wins,
    /// keeping compilation deterministic.
    pub fn compile(&self) -> CompiledTerms {
        let mut compiled = CompiledTerms::default();

        let mut locales: Vec<&String> = self.priority_terms.keys().collect();
        locales.sort();
        for locale in locales {
            for (term, level) in &self.priority_terms[locale] {
                let key = term.to_lowercase();
                compiled.locale_of.entry(key.clone()).or_insert_with(|| locale.clone());
                compiled.priority.entry(key).or_insert(*level);
            }
        }

        let mut locales: Vec<&String> = self.status_terms.keys().collect();
        locales.sort();
        for locale in locales {
            for (term, category) in &self.status_terms[locale] {
                let key = term.to_lowercase();
                compiled.locale_of.entry(key.clone()).or_insert_with(|| locale.clone());
                compiled.status.entry(key).or_insert_with(|| category.clone());
            }
        }

        let mut locales: Vec<&String> = self.time_labels.keys().collect();
        locales.sort();
        for locale in locales {
            for (term, label) in &self.time_labels[locale] {
                let key = term.to_lowercase();
                compiled.locale_of.entry(key.clone()).or_insert_with(|| locale.clone());
                compiled.time.entry(key).or_insert_with(|| label.clone());
            }
        }

        for terms in self.sentinel_all.values() {
            compiled
                .sentinel_all
                .extend(terms.iter().map(|t| t.to_lowercase()));
        }
        for terms in self.sentinel_none.values() {
            compiled
                .sentinel_none
                .extend(terms.iter().map(|t| t.to_lowercase()));
        }

        for (locale, words) in &self.stop_words {
            let set: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
            for word in &set {
                compiled
                    .locale_of
                    .entry(word.clone())
                    .or_insert_with(|| locale.clone());
            }
            compiled.stop_words.insert(locale.clone(), set);
        }

        compiled.incomplete_statuses = self
            .incomplete_statuses
            .iter()
            .map(|s| s.to_lowercase())
            .collect();

        tracing::debug!(
            priority_terms = compiled.priority.len(),
            status_terms = compiled.status.len(),
            time_labels = compiled.time.len(),
            locales = compiled.stop_words.len(),
            "Compiled recognition term lists"
        );

        compiled
    }
}

/// Merged per-category lookup maps, built once per settings load.
#[derive(Debug, Clone, Default)]
pub struct CompiledTerms {
    /// Surface term → priority level.
    pub priority: HashMap<String, u8>,
    /// Surface term → status category.
    pub status: HashMap<String, String>,
    /// Surface term → normalized time label.
    pub time: HashMap<String, String>,
    pub sentinel_all: HashSet<String>,
    pub sentinel_none: HashSet<String>,
    /// Locale → stop-word set (kept per locale; extraction is locale-aware).
    pub stop_words: HashMap<String, HashSet<String>>,
    /// Surface term → locale that declared it. Used for language detection.
    pub locale_of: HashMap<String, String>,
    pub incomplete_statuses: HashSet<String>,
}

impl CompiledTerms {
    /// Stop words for a locale; empty set when the locale has none configured.
    pub fn stop_words_for(&self, locale: &str) -> Option<&HashSet<String>> {
        self.stop_words.get(locale)
    }
}

// =============================================================================
// SCORING
// =============================================================================

/// Due-urgency tier points, by proximity of the due date to the reference day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UrgencyTiers {
    pub overdue: f32,
    pub today: f32,
    pub tomorrow: f32,
    pub this_week: f32,
    pub later: f32,
}

impl Default for UrgencyTiers {
    fn default() -> Self {
        Self {
            overdue: 4.0,
            today: 3.0,
            tomorrow: 2.0,
            this_week: 1.0,
            later: 0.0,
        }
    }
}

/// Scoring coefficients and per-bonus point values.
///
/// The additive, weighted shape is mechanism; the magnitudes are policy and
/// deliberately overridable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeights {
    /// Coefficient R applied to the summed relevance bonuses.
    pub relevance: f32,
    /// Coefficient D applied to the due-urgency component.
    pub due_urgency: f32,
    /// Coefficient P applied to the priority component.
    pub priority: f32,

    /// Bonus when the full query appears as a substring of the item text.
    pub exact_match_bonus: f32,
    /// Points per expanded keyword substring-matched in the item text.
    pub keyword_match_points: f32,
    pub folder_match_bonus: f32,
    pub tag_match_bonus: f32,
    /// Bonus for items whose status category counts as incomplete.
    pub incomplete_bonus: f32,
    /// Priority component: points × priority level (0 when priority is null).
    pub priority_level_points: f32,
    /// Base due-urgency points for having any due date at all.
    pub has_due_date_bonus: f32,
    #[serde(default)]
    pub urgency: UrgencyTiers,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            relevance: 10.0,
            due_urgency: 4.0,
            priority: 1.0,
            exact_match_bonus: 10.0,
            keyword_match_points: 2.0,
            folder_match_bonus: 3.0,
            tag_match_bonus: 2.0,
            incomplete_bonus: 1.0,
            priority_level_points: 1.0,
            has_due_date_bonus: 1.0,
            urgency: UrgencyTiers::default(),
        }
    }
}

// =============================================================================
// TIE-BREAK ORDER
// =============================================================================

/// A single secondary sort criterion.
///
/// Identifier-ascending is not listed here: it is always appended as the
/// mandatory final criterion, guaranteeing a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreaker {
    PriorityDesc,
    PriorityAsc,
    DueDateAsc,
    DueDateDesc,
    CreatedDesc,
    CreatedAsc,
}

/// Default tie-break chain: priority desc, due date asc, creation desc.
pub fn default_tie_break() -> Vec<TieBreaker> {
    vec![
        TieBreaker::PriorityDesc,
        TieBreaker::DueDateAsc,
        TieBreaker::CreatedDesc,
    ]
}

// =============================================================================
// AI CALL BOUNDS
// =============================================================================

/// Bounds and determinism settings for the two external-call boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiSettings {
    /// Maximum synonym expansions per core keyword.
    pub max_expansions_per_keyword: usize,
    /// Cap on the total expanded keyword count.
    pub max_total_expansions: usize,
    /// How many ranked candidates are offered to the AI prioritizer.
    pub max_candidates_to_ai: usize,
    /// K for the deterministic top-K fallback.
    pub fallback_top_k: usize,
    /// Sampling temperature; near-zero is the documented determinism setting.
    pub temperature: f32,
    /// Bound on each completion call, in seconds.
    pub completion_timeout_secs: u64,
    /// Bound on accepted answer size, in bytes.
    pub max_answer_bytes: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            max_expansions_per_keyword: 3,
            max_total_expansions: 24,
            max_candidates_to_ai: 20,
            fallback_top_k: 5,
            temperature: 0.05,
            completion_timeout_secs: 30,
            max_answer_bytes: 16 * 1024,
        }
    }
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Complete pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_tie_break")]
    pub tie_break: Vec<TieBreaker>,
    #[serde(default)]
    pub ai: AiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig::default(),
            weights: ScoringWeights::default(),
            tie_break: default_tie_break(),
            ai: AiSettings::default(),
        }
    }
}

impl Settings {
    /// Settings with the built-in multilingual term lists.
    pub fn builtin() -> Self {
        Self {
            recognition: RecognitionConfig::builtin(),
            weights: ScoringWeights::default(),
            tie_break: default_tie_break(),
            ai: AiSettings::default(),
        }
    }

    /// Validate the configuration. Malformed settings are fatal: the caller
    /// must not retry, and no fallback applies.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("weights.relevance", self.weights.relevance),
            ("weights.due_urgency", self.weights.due_urgency),
            ("weights.priority", self.weights.priority),
            ("weights.exact_match_bonus", self.weights.exact_match_bonus),
            (
                "weights.keyword_match_points",
                self.weights.keyword_match_points,
            ),
            ("weights.folder_match_bonus", self.weights.folder_match_bonus),
            ("weights.tag_match_bonus", self.weights.tag_match_bonus),
            ("weights.incomplete_bonus", self.weights.incomplete_bonus),
            (
                "weights.priority_level_points",
                self.weights.priority_level_points,
            ),
            ("weights.has_due_date_bonus", self.weights.has_due_date_bonus),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(Error::Config(format!(
                "ai.temperature must be within [0, 2], got {}",
                self.ai.temperature
            )));
        }
        if self.ai.max_candidates_to_ai == 0 {
            return Err(Error::Config(
                "ai.max_candidates_to_ai must be at least 1".to_string(),
            ));
        }
        if self.ai.fallback_top_k == 0 {
            return Err(Error::Config(
                "ai.fallback_top_k must be at least 1".to_string(),
            ));
        }
        if self.ai.completion_timeout_secs == 0 {
            return Err(Error::Config(
                "ai.completion_timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.ai.max_answer_bytes < 256 {
            return Err(Error::Config(
                "ai.max_answer_bytes must be at least 256".to_string(),
            ));
        }

        let locale_keys: [(&str, Vec<&String>); 3] = [
            (
                "priority_terms",
                self.recognition.priority_terms.keys().collect(),
            ),
            (
                "status_terms",
                self.recognition.status_terms.keys().collect(),
            ),
            ("time_labels", self.recognition.time_labels.keys().collect()),
        ];
        for (category, locales) in locale_keys {
            for locale in locales {
                if locale.trim().is_empty() {
                    return Err(Error::Config(format!(
                        "recognition.{} contains an empty locale key",
                        category
                    )));
                }
            }
        }
        for terms in self.recognition.priority_terms.values() {
            for (term, level) in terms {
                if term.trim().is_empty() {
                    return Err(Error::Config(
                        "recognition.priority_terms contains an empty term".to_string(),
                    ));
                }
                if *level > 9 {
                    return Err(Error::Config(format!(
                        "priority level for term {:?} exceeds 9",
                        term
                    )));
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
