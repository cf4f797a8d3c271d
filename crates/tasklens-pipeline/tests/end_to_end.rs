//! End-to-end pipeline tests through the public API only.

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use tasklens_core::{CorpusProvider, DegradationKind, Item, SelectionSource, Settings};
use tasklens_inference::MockCompletionBackend;
use tasklens_pipeline::{QueryPipeline, QuerySequencer, QueryStage};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn item(
    id_byte: u8,
    text: &str,
    status: &str,
    priority: Option<u8>,
    due: Option<NaiveDate>,
) -> Item {
    Item {
        id: Uuid::from_bytes([id_byte; 16]),
        text: text.to_string(),
        status: status.to_string(),
        priority,
        due,
        created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        folder: None,
        tags: Vec::new(),
    }
}

/// The reference corpus from the ranking scenario: A due tomorrow, B due
/// today, C completed.
fn scenario_corpus() -> Vec<Item> {
    vec![
        item(1, "design mockups", "open", Some(2), Some(date(2025, 1, 21))),
        item(2, "code review", "open", Some(1), Some(date(2025, 1, 20))),
        item(3, "write docs", "done", None, None),
    ]
}

#[tokio::test]
async fn scenario_query_orders_by_due_urgency_without_ai() {
    let mut settings = Settings::builtin();
    settings.weights.relevance = 20.0;
    settings.weights.due_urgency = 4.0;
    settings.weights.priority = 1.0;

    let pipeline = QueryPipeline::new(settings).unwrap();
    let outcome = pipeline
        .run("s:open p:1,2", &scenario_corpus(), None, date(2025, 1, 20))
        .await;

    let texts: Vec<&str> = outcome
        .ranked
        .candidates
        .iter()
        .map(|c| c.item.text.as_str())
        .collect();
    assert_eq!(texts, vec!["code review", "design mockups"]);
    assert_eq!(outcome.selection.source, SelectionSource::FallbackTopK);
    assert!(outcome.degradations().is_empty());
}

#[tokio::test]
async fn ai_choices_resolve_by_identifier_end_to_end() {
    let backend = MockCompletionBackend::new()
        .with_answer_for("Candidates:", "I'd pick CANDIDATE_2 and also CANDIDATE_1, CANDIDATE_2 again")
        .with_answer_for(
            "Query:",
            r#"{"core_keywords": ["design", "review"], "confidence": 0.9}"#,
        );

    let pipeline = QueryPipeline::new(Settings::builtin()).unwrap();
    let outcome = pipeline
        .run(
            "design review",
            &scenario_corpus(),
            Some(&backend),
            date(2025, 1, 20),
        )
        .await;

    assert_eq!(outcome.selection.source, SelectionSource::AiSelected);
    assert_eq!(outcome.selection.chosen.len(), 2);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn every_failure_point_still_delivers() {
    let backend = MockCompletionBackend::new().with_permanent_failure();
    let pipeline = QueryPipeline::new(Settings::builtin()).unwrap();

    let outcome = pipeline
        .run(
            "urgent design work",
            &scenario_corpus(),
            Some(&backend),
            date(2025, 1, 20),
        )
        .await;

    // Delivered, with both degradations stated: nothing silent.
    assert_eq!(*outcome.stages.last().unwrap(), QueryStage::Delivered);
    assert!(!outcome.selection.chosen.is_empty());
    let kinds: Vec<DegradationKind> = outcome.degradations().iter().map(|d| d.kind).collect();
    assert!(kinds.contains(&DegradationKind::ParserFailure));
    assert!(kinds.contains(&DegradationKind::CompletionTransportFailure));
    for degradation in outcome.degradations() {
        assert!(degradation.recovered);
        assert!(!degradation.hints.is_empty());
    }
}

#[tokio::test]
async fn corpus_snapshot_is_isolated_from_refresh() {
    let pipeline = QueryPipeline::new(Settings::builtin()).unwrap();
    let snapshot = scenario_corpus();
    let mut refreshed = scenario_corpus();
    refreshed.push(item(9, "new arrival", "open", None, None));

    // The in-flight query completes against its original snapshot.
    let outcome = pipeline
        .run("s:open", &snapshot, None, date(2025, 1, 20))
        .await;
    assert!(outcome
        .ranked
        .candidates
        .iter()
        .all(|c| c.item.text != "new arrival"));
}

struct InMemoryStore {
    items: Vec<Item>,
}

#[async_trait]
impl CorpusProvider for InMemoryStore {
    async fn list_items(&self) -> tasklens_core::Result<Vec<Item>> {
        Ok(self.items.clone())
    }
}

#[tokio::test]
async fn provider_snapshot_feeds_the_pipeline() {
    let store = InMemoryStore {
        items: scenario_corpus(),
    };
    let pipeline = QueryPipeline::new(Settings::builtin()).unwrap();

    let outcome = pipeline
        .run_from_provider(&store, "s:open", None, date(2025, 1, 20))
        .await
        .unwrap();

    assert_eq!(outcome.ranked.candidates.len(), 2);
    assert!(outcome
        .ranked
        .candidates
        .iter()
        .all(|c| c.item.status == "open"));
}

#[tokio::test]
async fn sequencer_keeps_latest_query_only() {
    let pipeline = QueryPipeline::new(Settings::builtin()).unwrap();
    let sequencer = QuerySequencer::new();

    let first = pipeline
        .run_tracked(&sequencer, "review", &scenario_corpus(), None, date(2025, 1, 20))
        .await;
    assert!(first.is_some());

    let second = pipeline
        .run_tracked(&sequencer, "design", &scenario_corpus(), None, date(2025, 1, 20))
        .await;
    assert!(second.is_some());
    assert_eq!(sequencer.latest(), 2);
}
