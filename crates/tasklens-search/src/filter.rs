//! Filter predicates over the item snapshot.
//!
//! Categories combine with AND; a value set within one category is OR. The
//! sentinels follow presence semantics: `Present` matches any non-null
//! value, `Absent` matches null. String comparisons are case-insensitive.

use tasklens_core::{AppliedFilters, DueFilter, FilterSpec, Item, QueryIntent};

/// Check whether an item satisfies every filter present on the intent.
pub fn matches(item: &Item, intent: &QueryIntent) -> bool {
    matches_priority(item, intent.priority.as_ref())
        && matches_due(item, intent.due.as_ref())
        && matches_status(item, intent.status.as_ref())
        && matches_folder(item, intent.folder.as_ref())
        && matches_tags(item, intent.tags.as_ref())
}

/// Summarize which filter dimensions the intent carries.
pub fn applied_filters(intent: &QueryIntent) -> AppliedFilters {
    AppliedFilters {
        priority: intent.priority.is_some(),
        due: intent.due.is_some(),
        status: intent.status.is_some(),
        folder: intent.folder.is_some(),
        tags: intent.tags.is_some(),
    }
}

fn matches_priority(item: &Item, filter: Option<&FilterSpec<u8>>) -> bool {
    match filter {
        None => true,
        Some(FilterSpec::Equals(level)) => item.priority == Some(*level),
        Some(FilterSpec::OneOf(levels)) => item
            .priority
            .map(|p| levels.contains(&p))
            .unwrap_or(false),
        Some(FilterSpec::Present) => item.priority.is_some(),
        Some(FilterSpec::Absent) => item.priority.is_none(),
    }
}

fn matches_due(item: &Item, filter: Option<&DueFilter>) -> bool {
    match filter {
        None => true,
        Some(DueFilter::On(date)) => item.due == Some(*date),
        Some(DueFilter::Within(range)) => item.due.map(|d| range.contains(d)).unwrap_or(false),
        Some(DueFilter::Present) => item.due.is_some(),
        Some(DueFilter::Absent) => item.due.is_none(),
    }
}

fn matches_status(item: &Item, filter: Option<&FilterSpec<String>>) -> bool {
    let status = item.status.to_lowercase();
    match filter {
        None => true,
        Some(FilterSpec::Equals(category)) => status == category.to_lowercase(),
        Some(FilterSpec::OneOf(categories)) => {
            categories.iter().any(|c| status == c.to_lowercase())
        }
        Some(FilterSpec::Present) => !status.is_empty(),
        Some(FilterSpec::Absent) => status.is_empty(),
    }
}

/// Folder values match the item's folder exactly or as a path-prefix segment
/// (`f:projects` matches `projects/alpha` but not `projectsarchive`).
fn folder_value_matches(folder: &str, value: &str) -> bool {
    let folder = folder.to_lowercase();
    let value = value.to_lowercase();
    folder == value || folder.starts_with(&format!("{}/", value))
}

fn matches_folder(item: &Item, filter: Option<&FilterSpec<String>>) -> bool {
    match filter {
        None => true,
        Some(FilterSpec::Equals(value)) => item
            .folder
            .as_deref()
            .map(|f| folder_value_matches(f, value))
            .unwrap_or(false),
        Some(FilterSpec::OneOf(values)) => item
            .folder
            .as_deref()
            .map(|f| values.iter().any(|v| folder_value_matches(f, v)))
            .unwrap_or(false),
        Some(FilterSpec::Present) => item.folder.is_some(),
        Some(FilterSpec::Absent) => item.folder.is_none(),
    }
}

fn matches_tags(item: &Item, filter: Option<&FilterSpec<String>>) -> bool {
    let has_tag = |value: &String| {
        item.tags
            .iter()
            .any(|t| t.to_lowercase() == value.to_lowercase())
    };
    match filter {
        None => true,
        Some(FilterSpec::Equals(value)) => has_tag(value),
        Some(FilterSpec::OneOf(values)) => values.iter().any(has_tag),
        Some(FilterSpec::Present) => !item.tags.is_empty(),
        Some(FilterSpec::Absent) => item.tags.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use tasklens_core::DateRange;
    use uuid::Uuid;

    fn item() -> Item {
        Item {
            id: Uuid::new_v4(),
            text: "review mockups".to_string(),
            status: "open".to_string(),
            priority: Some(2),
            due: Some(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()),
            created_at: Utc::now(),
            folder: Some("projects/alpha".to_string()),
            tags: vec!["Work".to_string()],
        }
    }

    fn intent() -> QueryIntent {
        QueryIntent::empty("en")
    }

    #[test]
    fn test_no_filters_matches_everything() {
        assert!(matches(&item(), &intent()));
    }

    #[test]
    fn test_priority_one_of() {
        let mut i = intent();
        i.priority = Some(FilterSpec::OneOf(vec![1, 2]));
        assert!(matches(&item(), &i));

        i.priority = Some(FilterSpec::OneOf(vec![1, 3]));
        assert!(!matches(&item(), &i));
    }

    #[test]
    fn test_priority_sentinels() {
        let mut no_priority = item();
        no_priority.priority = None;

        let mut i = intent();
        i.priority = Some(FilterSpec::Present);
        assert!(matches(&item(), &i));
        assert!(!matches(&no_priority, &i));

        i.priority = Some(FilterSpec::Absent);
        assert!(!matches(&item(), &i));
        assert!(matches(&no_priority, &i));
    }

    #[test]
    fn test_due_sentinels() {
        let mut no_due = item();
        no_due.due = None;

        let mut i = intent();
        i.due = Some(DueFilter::Present);
        assert!(matches(&item(), &i));
        assert!(!matches(&no_due, &i));

        i.due = Some(DueFilter::Absent);
        assert!(!matches(&item(), &i));
        assert!(matches(&no_due, &i));
    }

    #[test]
    fn test_due_range() {
        let mut i = intent();
        i.due = Some(DueFilter::Within(DateRange::new(
            None,
            Some(NaiveDate::from_ymd_opt(2025, 1, 19).unwrap()),
        )));
        // Item due 2025-01-20 is outside the overdue range.
        assert!(!matches(&item(), &i));

        let mut earlier = item();
        earlier.due = Some(NaiveDate::from_ymd_opt(2025, 1, 19).unwrap());
        assert!(matches(&earlier, &i));
    }

    #[test]
    fn test_status_case_insensitive() {
        let mut i = intent();
        i.status = Some(FilterSpec::Equals("Open".to_string()));
        assert!(matches(&item(), &i));
    }

    #[test]
    fn test_folder_prefix_segment() {
        let mut i = intent();
        i.folder = Some(FilterSpec::Equals("projects".to_string()));
        assert!(matches(&item(), &i));

        i.folder = Some(FilterSpec::Equals("proj".to_string()));
        assert!(!matches(&item(), &i), "prefix must stop at a path segment");
    }

    #[test]
    fn test_tags_case_insensitive_or() {
        let mut i = intent();
        i.tags = Some(FilterSpec::OneOf(vec![
            "home".to_string(),
            "work".to_string(),
        ]));
        assert!(matches(&item(), &i));
    }

    #[test]
    fn test_and_across_categories() {
        let mut i = intent();
        i.priority = Some(FilterSpec::Equals(2));
        i.status = Some(FilterSpec::Equals("done".to_string()));
        // Priority matches but status does not: AND fails.
        assert!(!matches(&item(), &i));
    }
}
