//! # tasklens-query
//!
//! Query understanding for tasklens: property recognition, multilingual
//! keyword extraction, and the two query parsers (deterministic and
//! AI-assisted).
//!
//! The deterministic parser is pure and always available; the AI-assisted
//! parser returns a tagged failure on any transport or decoding problem so
//! callers can fall back without losing the query.

pub mod ai;
pub mod keywords;
pub mod local;
pub mod recognize;
pub mod script;

pub use ai::{parse_with_ai, parse_with_ai_compiled, ParserFailure};
pub use keywords::extract;
pub use local::{detect_language, parse_local, parse_local_compiled};
pub use recognize::{recognize, DueToken, RecognizedTokens};
pub use script::{detect_script, has_cjk, DetectedScript};
