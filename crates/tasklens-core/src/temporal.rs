//! Time-context resolution for vague temporal language.
//!
//! This module is the single place where relative-time labels become concrete
//! date ranges. Both query parsers (deterministic and AI-assisted) hand
//! normalized labels here; the AI parser in particular is only allowed to
//! *detect* a label, never to compute date arithmetic itself. Centralizing
//! the arithmetic keeps range computation deterministic: the same label and
//! reference date always produce the same range.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::DateRange;

// =============================================================================
// NORMALIZED LABELS
// =============================================================================

/// Normalized relative-time labels the pipeline understands.
///
/// Labels are what recognition and the AI parser emit; locale-specific
/// surface forms ("heute", "mañana") are mapped to these by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeLabel {
    Today,
    Tomorrow,
    Overdue,
    ThisWeek,
    NextWeek,
    ThisWeekend,
    ThisMonth,
    NextMonth,
}

impl TimeLabel {
    /// Parse a normalized label string. Accepts space, hyphen, or underscore
    /// separators and is case-insensitive.
    pub fn parse(label: &str) -> Option<Self> {
        let normalized: String = label
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c })
            .collect();
        match normalized.as_str() {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "overdue" => Some(Self::Overdue),
            "this_week" => Some(Self::ThisWeek),
            "next_week" => Some(Self::NextWeek),
            "this_weekend" | "weekend" => Some(Self::ThisWeekend),
            "this_month" => Some(Self::ThisMonth),
            "next_month" => Some(Self::NextMonth),
            _ => None,
        }
    }

    /// Convert the label to a concrete inclusive date range.
    ///
    /// - `Today` keeps the start open so overdue items stay included.
    /// - `Overdue` ends the day before `reference` (an exclusive upper bound
    ///   at start-of-reference-day).
    /// - Period labels cover the period containing (or following) `reference`.
    pub fn to_range(self, reference: NaiveDate) -> DateRange {
        match self {
            Self::Today => DateRange::new(None, Some(reference)),
            Self::Tomorrow => {
                let d = next_day(reference);
                DateRange::new(Some(d), Some(d))
            }
            Self::Overdue => DateRange::new(None, Some(prev_day(reference))),
            Self::ThisWeek => {
                let start = week_start(reference);
                DateRange::new(Some(start), Some(start + Duration::days(6)))
            }
            Self::NextWeek => {
                let start = week_start(reference) + Duration::days(7);
                DateRange::new(Some(start), Some(start + Duration::days(6)))
            }
            Self::ThisWeekend => {
                let saturday = week_start(reference) + Duration::days(5);
                DateRange::new(Some(saturday), Some(saturday + Duration::days(1)))
            }
            Self::ThisMonth => month_range(reference.year(), reference.month()),
            Self::NextMonth => {
                let (year, month) = if reference.month() == 12 {
                    (reference.year() + 1, 1)
                } else {
                    (reference.year(), reference.month() + 1)
                };
                month_range(year, month)
            }
        }
    }
}

/// Result of resolving a temporal label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeResolution {
    pub range: DateRange,
    /// Whether the label was recognized. Unmatched labels resolve to an
    /// unbounded range so callers can treat the result uniformly.
    pub matched: bool,
}

/// Resolve a relative-time label against a reference date.
///
/// Deterministic: same `label` and `reference` always yield the same range.
pub fn detect_and_convert(label: &str, reference: NaiveDate) -> TimeResolution {
    match TimeLabel::parse(label) {
        Some(parsed) => TimeResolution {
            range: parsed.to_range(reference),
            matched: true,
        },
        None => TimeResolution {
            range: DateRange::default(),
            matched: false,
        },
    }
}

// =============================================================================
// DATE HELPERS
// =============================================================================

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn prev_day(date: NaiveDate) -> NaiveDate {
    date.pred_opt().unwrap_or(date)
}

/// Monday of the week containing `date`.
fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn month_range(year: i32, month: u32) -> DateRange {
    let start = NaiveDate::from_ymd_opt(year, month, 1);
    let next_month_start = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    DateRange::new(start, next_month_start.map(prev_day))
}

// =============================================================================
// TESTS
// =============================================================================
