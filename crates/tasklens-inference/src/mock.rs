//! Mock completion backend for deterministic testing.
//!
//! Answers are scripted per request, calls are logged for assertions, and
//! failures can be injected either deterministically (a fixed number of
//! failures, or permanent) or probabilistically.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tasklens_core::{CompletionBackend, CompletionRequest, Error, Result};

/// Mock completion backend.
#[derive(Clone)]
pub struct MockCompletionBackend {
    config: Arc<MockConfig>,
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Clone)]
struct MockConfig {
    /// (needle, answer): the first entry whose needle appears in the user
    /// content wins, in insertion order.
    mapped_answers: Vec<(String, String)>,
    default_answer: String,
    latency_ms: u64,
    failure_rate: f64,
    always_fail: bool,
    model: String,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<MockCall>,
    /// Scripted answers consumed before mapping/default kick in.
    queued_answers: VecDeque<String>,
    fail_remaining: usize,
}

/// One logged completion call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            mapped_answers: Vec::new(),
            default_answer: "Mock answer".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
            always_fail: false,
            model: "mock-model".to_string(),
        }
    }
}

impl MockCompletionBackend {
    /// Create a new mock backend with default configuration.
    pub fn new() -> Self {
        Self {
            config: Arc::new(MockConfig::default()),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Set the default answer for unmapped requests.
    pub fn with_fixed_answer(mut self, answer: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_answer = answer.into();
        self
    }

    /// Add an answer for requests whose user content contains `needle`.
    pub fn with_answer_for(mut self, needle: impl Into<String>, answer: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config)
            .mapped_answers
            .push((needle.into(), answer.into()));
        self
    }

    /// Set simulated latency for all calls.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Fail every call, permanently.
    pub fn with_permanent_failure(mut self) -> Self {
        Arc::make_mut(&mut self.config).always_fail = true;
        self
    }

    /// Set failure rate (0.0 - 1.0) for probabilistic error-path testing.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Fail the next `count` calls, then recover.
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap().fail_remaining = count;
    }

    /// Queue an answer consumed before mappings and the default.
    pub fn queue_answer(&self, answer: impl Into<String>) {
        self.state
            .lock()
            .unwrap()
            .queued_answers
            .push_back(answer.into());
    }

    /// All logged calls, for assertions.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().unwrap().calls.len()
    }

    fn should_fail(&self) -> bool {
        if self.config.always_fail {
            return true;
        }
        {
            let mut state = self.state.lock().unwrap();
            if state.fail_remaining > 0 {
                state.fail_remaining -= 1;
                return true;
            }
        }
        if self.config.failure_rate > 0.0 {
            use rand::Rng;
            return rand::thread_rng().gen::<f64>() < self.config.failure_rate;
        }
        false
    }
}

impl Default for MockCompletionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockCompletionBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.state.lock().unwrap().calls.push(MockCall {
            system: request.system.clone(),
            user: request.user.clone(),
            temperature: request.temperature,
        });

        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if self.should_fail() {
            return Err(Error::Completion("simulated transport failure".to_string()));
        }

        if let Some(answer) = self.state.lock().unwrap().queued_answers.pop_front() {
            return Ok(answer);
        }

        for (needle, answer) in &self.config.mapped_answers {
            if request.user.contains(needle.as_str()) {
                return Ok(answer.clone());
            }
        }

        Ok(self.config.default_answer.clone())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(user: &str) -> CompletionRequest {
        CompletionRequest::new("system", user)
    }

    #[tokio::test]
    async fn test_default_answer() {
        let backend = MockCompletionBackend::new().with_fixed_answer("custom");
        assert_eq!(backend.complete(&request("hi")).await.unwrap(), "custom");
    }

    #[tokio::test]
    async fn test_mapped_answers_by_needle() {
        let backend = MockCompletionBackend::new()
            .with_answer_for("parse", "parsed")
            .with_answer_for("rank", "ranked");

        assert_eq!(
            backend.complete(&request("please parse this")).await.unwrap(),
            "parsed"
        );
        assert_eq!(
            backend.complete(&request("please rank this")).await.unwrap(),
            "ranked"
        );
    }

    #[tokio::test]
    async fn test_queued_answers_win() {
        let backend = MockCompletionBackend::new().with_fixed_answer("default");
        backend.queue_answer("first");
        backend.queue_answer("second");

        assert_eq!(backend.complete(&request("a")).await.unwrap(), "first");
        assert_eq!(backend.complete(&request("a")).await.unwrap(), "second");
        assert_eq!(backend.complete(&request("a")).await.unwrap(), "default");
    }

    #[tokio::test]
    async fn test_permanent_failure() {
        let backend = MockCompletionBackend::new().with_permanent_failure();
        assert!(backend.complete(&request("a")).await.is_err());
        assert!(backend.complete(&request("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_fail_next_then_recover() {
        let backend = MockCompletionBackend::new().with_fixed_answer("ok");
        backend.fail_next(2);

        assert!(backend.complete(&request("a")).await.is_err());
        assert!(backend.complete(&request("a")).await.is_err());
        assert_eq!(backend.complete(&request("a")).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_call_logging() {
        let backend = MockCompletionBackend::new();
        backend.complete(&request("one")).await.unwrap();
        backend
            .complete(&request("two").with_temperature(0.7))
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].user, "one");
        assert_eq!(calls[1].temperature, 0.7);
    }

    #[tokio::test]
    async fn test_failure_rate_full() {
        let backend = MockCompletionBackend::new().with_failure_rate(1.0);
        assert!(backend.complete(&request("a")).await.is_err());
    }

    #[tokio::test]
    async fn test_latency_simulation() {
        let backend = MockCompletionBackend::new().with_latency_ms(50);
        let start = std::time::Instant::now();
        backend.complete(&request("a")).await.unwrap();
        assert!(start.elapsed().as_millis() >= 50);
    }
}
