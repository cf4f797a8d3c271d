//! End-to-end query pipeline.
//!
//! Per query the state machine is:
//!
//! ```text
//! Received → LocallyParsed → {AiParsing | SkippedAi}
//!          → FilteredScored → {AiPrioritized | FallbackTopK} → Delivered
//! ```
//!
//! `Delivered` always carries a usable result plus an optional structured
//! error; no failure on the way terminates the pipeline. Local stages are
//! pure and lock-free; the only suspension points are the two external-call
//! boundaries, both wrapped in a bounded timeout.

use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use tasklens_core::{
    CompiledTerms, CompletionBackend, CorpusProvider, DegradationKind, FinalSelection, Item,
    QueryIntent, RankedResult, Result, SelectionSource, Settings, StructuredError,
};
use tasklens_query::{parse_local_compiled, parse_with_ai_compiled, ParserFailure};
use tasklens_search::{search, SearchContext};

use crate::prioritize::prioritize;
use crate::sequence::QuerySequencer;

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Stages a query passes through; recorded in order on the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStage {
    Received,
    LocallyParsed,
    AiParsing,
    SkippedAi,
    FilteredScored,
    AiPrioritized,
    FallbackTopK,
    Delivered,
}

/// Everything a delivered query carries.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub intent: QueryIntent,
    pub ranked: RankedResult,
    pub selection: FinalSelection,
    pub stages: Vec<QueryStage>,
}

impl PipelineOutcome {
    /// All degradations that occurred, in pipeline order. Empty means every
    /// stage ran clean.
    pub fn degradations(&self) -> Vec<&StructuredError> {
        self.ranked
            .degradation
            .iter()
            .chain(self.selection.degradation.iter())
            .collect()
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// The query pipeline: validated settings plus compiled term lists.
///
/// Construction fails fast on malformed settings; afterwards every run is
/// infallible and always delivers a result.
pub struct QueryPipeline {
    settings: Settings,
    terms: CompiledTerms,
}

impl QueryPipeline {
    /// Build a pipeline, validating the settings once.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let terms = settings.recognition.compile();
        Ok(Self { settings, terms })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run one query against a corpus snapshot.
    ///
    /// `client: None` skips both AI stages deterministically. The snapshot is
    /// borrowed immutably for the whole run, so concurrent refreshes of the
    /// caller's corpus never tear an in-flight query.
    pub async fn run(
        &self,
        query: &str,
        corpus: &[Item],
        client: Option<&dyn CompletionBackend>,
        reference: NaiveDate,
    ) -> PipelineOutcome {
        self.run_inner(None, query, corpus, client, reference)
            .await
            .expect("an unguarded run is never stale")
    }

    async fn run_inner(
        &self,
        guard: Option<(&QuerySequencer, crate::sequence::QueryTicket)>,
        query: &str,
        corpus: &[Item],
        client: Option<&dyn CompletionBackend>,
        reference: NaiveDate,
    ) -> Option<PipelineOutcome> {
        let is_stale = |&(sequencer, ticket): &(&QuerySequencer, crate::sequence::QueryTicket)| {
            !sequencer.is_current(ticket)
        };
        let mut stages = vec![QueryStage::Received];

        // Deterministic parse always runs: it is the fallback base.
        let local_intent = parse_local_compiled(query, &self.terms, reference);
        stages.push(QueryStage::LocallyParsed);

        let timeout = Duration::from_secs(self.settings.ai.completion_timeout_secs);
        let (intent, parse_degradation) = match client {
            Some(client) => {
                stages.push(QueryStage::AiParsing);
                let attempt = tokio::time::timeout(
                    timeout,
                    parse_with_ai_compiled(query, &self.settings, &self.terms, client, reference),
                )
                .await;
                match attempt {
                    Ok(Ok(intent)) => (intent, None),
                    Ok(Err(failure)) => {
                        warn!(error = %failure, fallback = true, "AI parse failed");
                        (local_intent, Some(parse_failure_error(&failure)))
                    }
                    Err(_) => {
                        warn!(
                            timeout_secs = self.settings.ai.completion_timeout_secs,
                            fallback = true,
                            "AI parse timed out"
                        );
                        (
                            local_intent,
                            Some(parse_failure_error(&ParserFailure::Transport(format!(
                                "parse call exceeded the {}s bound",
                                self.settings.ai.completion_timeout_secs
                            )))),
                        )
                    }
                }
            }
            None => {
                stages.push(QueryStage::SkippedAi);
                (local_intent, None)
            }
        };

        // A newer query may have started while the parse call was in flight.
        if guard.as_ref().map(is_stale).unwrap_or(false) {
            return None;
        }

        let ctx = SearchContext::new(reference, &self.settings);
        let mut ranked = search(corpus, &intent, &ctx);
        ranked.degradation = parse_degradation;
        stages.push(QueryStage::FilteredScored);

        let selection = match client {
            Some(client) if !ranked.candidates.is_empty() => {
                prioritize(&ranked, query, client, &self.settings.ai).await
            }
            _ => FinalSelection {
                chosen: ranked
                    .candidates
                    .iter()
                    .take(self.settings.ai.fallback_top_k)
                    .cloned()
                    .collect(),
                source: SelectionSource::FallbackTopK,
                degradation: None,
            },
        };
        stages.push(match selection.source {
            SelectionSource::AiSelected => QueryStage::AiPrioritized,
            SelectionSource::FallbackTopK => QueryStage::FallbackTopK,
        });

        if guard.as_ref().map(is_stale).unwrap_or(false) {
            return None;
        }

        stages.push(QueryStage::Delivered);
        info!(
            corpus_size = corpus.len(),
            result_count = selection.chosen.len(),
            fallback = selection.source == SelectionSource::FallbackTopK,
            "Query delivered"
        );

        Some(PipelineOutcome {
            intent,
            ranked,
            selection,
            stages,
        })
    }

    /// Pull a fresh snapshot from the corpus provider, then run.
    ///
    /// The snapshot is taken once; refreshes on the provider's side during
    /// the run are invisible to this query. Only the snapshot pull itself
    /// can fail; the pipeline proper always delivers.
    pub async fn run_from_provider(
        &self,
        provider: &dyn CorpusProvider,
        query: &str,
        client: Option<&dyn CompletionBackend>,
        reference: NaiveDate,
    ) -> Result<PipelineOutcome> {
        let snapshot = provider.list_items().await?;
        Ok(self.run(query, &snapshot, client, reference).await)
    }

    /// Like [`run`](Self::run), guarded by a query sequencer.
    ///
    /// A ticket is taken when the run starts; after each suspension point the
    /// run checks whether a newer query superseded it. A stale run returns
    /// `None` and its result is discarded, so a slow AI response can never
    /// overwrite a fresher query's result.
    pub async fn run_tracked(
        &self,
        sequencer: &QuerySequencer,
        query: &str,
        corpus: &[Item],
        client: Option<&dyn CompletionBackend>,
        reference: NaiveDate,
    ) -> Option<PipelineOutcome> {
        let ticket = sequencer.begin();
        let outcome = self
            .run_inner(Some((sequencer, ticket)), query, corpus, client, reference)
            .await;

        if outcome.is_none() {
            debug!(
                query_seq = ticket.value(),
                latest = sequencer.latest(),
                "Discarding stale query result"
            );
        }
        outcome
    }
}

/// Convert an AI parse failure into the structured error attached to the
/// delivered result. Recovery is always via the deterministic parser, so the
/// kind is `ParserFailure` with the transport/decoding cause in the message.
fn parse_failure_error(failure: &ParserFailure) -> StructuredError {
    StructuredError::new(
        DegradationKind::ParserFailure,
        format!("AI parse failed, deterministic parse used: {}", failure),
    )
    .with_hints(vec![
        "the deterministic interpretation of the query was used".to_string(),
        "check the completion service if this persists".to_string(),
    ])
    .recovered()
}

// =============================================================================
// TESTS
// =============================================================================
