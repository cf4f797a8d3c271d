//! Structured logging schema and field name constants for tasklens.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Fatal configuration problems |
//! | WARN  | Recoverable failure, automatic fallback applied |
//! | INFO  | Lifecycle events, delivered results |
//! | DEBUG | Decision points, intermediate values, parse outcomes |
//! | TRACE | Per-item iteration (scoring, token claims) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Monotonic query sequence number propagated through a pipeline run.
pub const QUERY_SEQ: &str = "query_seq";

/// Component within the pipeline.
/// Values: "recognize", "keywords", "local_parse", "ai_parse", "search",
/// "prioritize", "pipeline"
pub const COMPONENT: &str = "component";

/// Logical operation name.
pub const OPERATION: &str = "op";

// ─── Query fields ──────────────────────────────────────────────────────────

/// Raw query text.
pub const QUERY: &str = "query";

/// Detected locale code.
pub const LANGUAGE: &str = "language";

/// Number of core keywords extracted.
pub const KEYWORD_COUNT: &str = "keyword_count";

/// Whether the query was classified as vague.
pub const VAGUE: &str = "vague";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of candidates in a ranked or selected result.
pub const RESULT_COUNT: &str = "result_count";

/// Number of items in the corpus snapshot.
pub const CORPUS_SIZE: &str = "corpus_size";

/// Byte length of a model answer.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for a completion call.
pub const MODEL: &str = "model";

/// Sampling temperature of a completion call.
pub const TEMPERATURE: &str = "temperature";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Pipeline stage that degraded.
pub const STAGE: &str = "stage";

/// Whether a fallback path was taken.
pub const FALLBACK: &str = "fallback";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
