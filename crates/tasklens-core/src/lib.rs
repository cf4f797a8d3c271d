//! # tasklens-core
//!
//! Core types, traits, and configuration for the tasklens query
//! understanding and task ranking pipeline.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the other tasklens crates depend on.

pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod temporal;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{
    default_tie_break, AiSettings, CompiledTerms, RecognitionConfig, ScoringWeights, Settings,
    TieBreaker, UrgencyTiers,
};
pub use error::{Error, Result};
pub use models::{
    AppliedFilters, DateRange, DegradationKind, DueFilter, FilterSpec, FinalSelection, Item,
    QueryIntent, RankedResult, ScoreBreakdown, ScoredCandidate, SelectionSource, StructuredError,
};
pub use temporal::{detect_and_convert, TimeLabel, TimeResolution};
pub use traits::{CompletionBackend, CompletionRequest, CorpusProvider};
