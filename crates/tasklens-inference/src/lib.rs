//! # tasklens-inference
//!
//! Completion backend implementations for tasklens.
//!
//! This crate provides:
//! - Ollama implementation of the core `CompletionBackend` trait (default)
//! - A deterministic mock backend for tests (feature `mock`)
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable the Ollama backend
//! - `mock`: Expose the mock backend to downstream test suites

#[cfg(feature = "ollama")]
pub mod ollama;

// Mock completion backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use tasklens_core::{CompletionBackend, CompletionRequest};

#[cfg(feature = "ollama")]
pub use ollama::OllamaBackend;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockCompletionBackend;
