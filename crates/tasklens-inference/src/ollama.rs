//! Ollama completion backend implementation.
//!
//! Talks to the `/api/chat` endpoint, which separates thinking/reasoning
//! from the final response content on models that emit it. All failures
//! (connection, timeout, non-success status, undecodable body) surface
//! uniformly as `Error::Completion`, so callers never see vendor detail.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tasklens_core::{defaults, CompletionBackend, CompletionRequest, Error, Result};

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = defaults::OLLAMA_URL;

/// Default generation model.
pub const DEFAULT_GEN_MODEL: &str = defaults::GEN_MODEL;

/// Default timeout for completion requests (seconds).
pub const COMPLETION_TIMEOUT_SECS: u64 = 120;

/// Ollama completion backend.
pub struct OllamaBackend {
    client: Client,
    base_url: String,
    gen_model: String,
    timeout_secs: u64,
    /// Fixed sampling seed; combined with near-zero temperature this is the
    /// backend's determinism setting (an assumption about the service, not a
    /// guarantee).
    seed: Option<u64>,
}

impl OllamaBackend {
    /// Create a new Ollama backend with default settings.
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_OLLAMA_URL.to_string(),
            DEFAULT_GEN_MODEL.to_string(),
        )
    }

    /// Create a new Ollama backend with custom configuration.
    pub fn with_config(base_url: String, gen_model: String) -> Self {
        let timeout_secs = std::env::var("TASKLENS_GEN_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(COMPLETION_TIMEOUT_SECS);

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        info!(
            "Initializing Ollama backend: url={}, model={}",
            base_url, gen_model
        );

        Self {
            client,
            base_url,
            gen_model,
            timeout_secs,
            seed: Some(0),
        }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OLLAMA_BASE").unwrap_or_else(|_| DEFAULT_OLLAMA_URL.to_string());
        let gen_model =
            std::env::var("OLLAMA_GEN_MODEL").unwrap_or_else(|_| DEFAULT_GEN_MODEL.to_string());
        Self::with_config(base_url, gen_model)
    }

    /// Set the generation model to use.
    pub fn set_gen_model(&mut self, model_name: String) {
        info!(
            "Switching generation model from {} to {}",
            self.gen_model, model_name
        );
        self.gen_model = model_name;
    }

    /// Override the sampling seed (None disables seeding).
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for OllamaBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let start = Instant::now();

        let mut messages = Vec::new();
        if !request.system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: request.system.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        // A shape hint means the caller will parse the answer as JSON; ask
        // Ollama to enforce the format and suppress thinking output.
        let format = request
            .shape_hint
            .as_ref()
            .map(|_| serde_json::Value::String("json".to_string()));
        let think = if format.is_some() { Some(false) } else { None };

        let payload = ChatRequest {
            model: self.gen_model.clone(),
            messages,
            stream: false,
            format,
            think,
            options: ChatOptions {
                temperature: request.temperature,
                seed: self.seed,
                num_predict: request.max_tokens,
            },
        };

        debug!(
            model = %self.gen_model,
            temperature = request.temperature,
            "Starting completion via chat API"
        );

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::Completion(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(format!("Failed to parse response: {}", e)))?;

        let content = result.message.content;
        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            response_len = content.len(),
            duration_ms = elapsed,
            "Completion complete"
        );
        if elapsed > 30000 {
            warn!(duration_ms = elapsed, slow = true, "Slow completion");
        }
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.gen_model
    }
}

/// Chat API message for `/api/chat`.
#[derive(Serialize, Deserialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Request payload for the Ollama `/api/chat` endpoint.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    /// Ollama format enforcement. Set to `"json"` for guaranteed valid JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<serde_json::Value>,
    /// Suppress chain-of-thought output on thinking models.
    #[serde(skip_serializing_if = "Option::is_none")]
    think: Option<bool>,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Response from the Ollama `/api/chat` endpoint.
#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

// =============================================================================
// TESTS
// =============================================================================
