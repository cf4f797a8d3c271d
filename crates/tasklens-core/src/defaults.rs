//! Default constants, gathered in one place so they are discoverable and
//! documented rather than scattered through call sites.

/// Deterministic-parser confidence when at least one filter was recognized.
pub const CONFIDENCE_FILTERS: f32 = 1.0;

/// Deterministic-parser confidence when only keywords were extracted.
pub const CONFIDENCE_KEYWORDS: f32 = 0.8;

/// Deterministic-parser confidence for a vague query.
pub const CONFIDENCE_VAGUE: f32 = 0.2;

/// Locale assumed when no configured term matched and the script gives no
/// better hint.
pub const FALLBACK_LOCALE: &str = "en";

/// Default Ollama endpoint for the bundled completion backend.
pub const OLLAMA_URL: &str = "http://localhost:11434";

/// Default generation model for the bundled completion backend.
pub const GEN_MODEL: &str = "qwen3:8b";

/// Default bound on completion answers, in tokens.
pub const MAX_ANSWER_TOKENS: u32 = 1024;
