//! # tasklens-pipeline
//!
//! End-to-end query pipeline: deterministic parse, optional AI-assisted
//! parse, filter-and-score ranking, AI prioritization with deterministic
//! top-K fallback, and a staleness guard keyed by query sequence numbers.
//!
//! Every run delivers a usable result; recoverable failures are attached as
//! structured errors at the boundary where they occurred.

pub mod pipeline;
pub mod prioritize;
pub mod sequence;

pub use pipeline::{PipelineOutcome, QueryPipeline, QueryStage};
pub use prioritize::{extract_identifiers, prioritize};
pub use sequence::{QuerySequencer, QueryTicket};
