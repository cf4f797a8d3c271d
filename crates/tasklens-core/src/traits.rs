//! External collaborator seams.
//!
//! The pipeline only ever talks to the outside world through these traits:
//! the item store behind [`CorpusProvider`] and the text-completion service
//! behind [`CompletionBackend`]. Backends are passed explicitly per call;
//! provider/model selection is never ambient global state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::models::Item;

// =============================================================================
// CORPUS PROVIDER
// =============================================================================

/// Pull-style access to the external item store.
///
/// Each call returns an immutable snapshot; an in-flight query completes
/// against the snapshot it started with, so concurrent refreshes never cause
/// a torn read.
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    async fn list_items(&self) -> Result<Vec<Item>>;
}

// =============================================================================
// COMPLETION BACKEND
// =============================================================================

/// A single text-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    /// Optional response shape hint (a JSON schema) for backends that can
    /// constrain their output format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_hint: Option<JsonValue>,
    /// Sampling temperature; near-zero requests deterministic output. This
    /// is a documented assumption about the external service, not an
    /// enforced guarantee.
    pub temperature: f32,
    /// Bound on the answer size, in tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            shape_hint: None,
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_shape_hint(mut self, hint: JsonValue) -> Self {
        self.shape_hint = Some(hint);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Backend for the external text-completion service.
///
/// All failure modes (timeout, non-success status, malformed body) surface
/// uniformly as [`Error::Completion`](crate::Error::Completion), independent
/// of vendor.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Run one completion and return the raw answer text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// The model identifier this backend targets.
    fn model_name(&self) -> &str;
}
