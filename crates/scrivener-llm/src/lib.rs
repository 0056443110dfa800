//! Scrivener LLM Provider Layer
//!
//! Pluggable completion and embedding backends behind the `LlmProvider` and
//! `EmbeddingModel` traits from `scrivener-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `OllamaProvider` / `OllamaEmbeddingModel`: Local Ollama API
//! - `OpenAiProvider` / `OpenAiEmbeddingModel`: OpenAI-compatible HTTP API
//!
//! The HTTP providers expose synchronous trait methods that drive a private
//! single-threaded runtime. Call them from a blocking context (for example
//! `tokio::task::spawn_blocking`), never directly from an async task.
//!
//! # Examples
//!
//! ```
//! use scrivener_llm::MockProvider;
//! use scrivener_domain::traits::{LlmProvider, TransientError};
//!
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt").unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! ```

#![warn(missing_docs)]

pub mod ollama;
pub mod openai;

use scrivener_domain::traits::{LlmProvider, TransientError};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use ollama::{OllamaEmbeddingModel, OllamaProvider};
pub use openai::{OpenAiEmbeddingModel, OpenAiProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Non-success HTTP status not covered by a more specific variant
    #[error("HTTP {status}: {body}")]
    Http {
        /// Status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Request did not complete in time
    #[error("Request timed out")]
    Timeout,

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Credentials missing or rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl TransientError for LlmError {
    /// Communication failures, timeouts, 429 and 5xx
    fn is_transient(&self) -> bool {
        match self {
            LlmError::Communication(_) | LlmError::Timeout | LlmError::RateLimitExceeded => true,
            LlmError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout)
    }
}

impl LlmError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Communication(format!("Request failed: {}", e))
        }
    }
}

/// Run `future` to completion on a private current-thread runtime
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, LlmError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| LlmError::Other(format!("Failed to start runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

/// Truncate a response body for inclusion in an error message
pub(crate) fn excerpt(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.chars().count() <= LIMIT {
        body.to_string()
    } else {
        let head: String = body.chars().take(LIMIT).collect();
        format!("{}…", head)
    }
}

#[derive(Debug, Default)]
struct MockState {
    responses: Vec<(MockMatch, Result<String, LlmError>)>,
    scripted_failures: Vec<LlmError>,
    prompts: Vec<String>,
}

#[derive(Debug, Clone)]
enum MockMatch {
    Exact(String),
    Contains(String),
}

impl MockMatch {
    fn matches(&self, prompt: &str) -> bool {
        match self {
            MockMatch::Exact(p) => p == prompt,
            MockMatch::Contains(needle) => prompt.contains(needle.as_str()),
        }
    }
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls and
/// records every prompt it receives.
///
/// # Examples
///
/// ```
/// use scrivener_llm::MockProvider;
/// use scrivener_domain::traits::{LlmProvider, TransientError};
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Responses keyed by prompt content
/// let mut provider = MockProvider::default();
/// provider.add_response("prompt1", "response1");
/// provider.add_response_containing("refine", "refined");
/// assert_eq!(provider.generate("prompt1").unwrap(), "response1");
/// assert_eq!(provider.generate("please refine this").unwrap(), "refined");
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    model_name: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            model_name: "mock".to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a response for an exact prompt
    pub fn add_response(&mut self, prompt: impl Into<String>, response: impl Into<String>) {
        self.state()
            .responses
            .push((MockMatch::Exact(prompt.into()), Ok(response.into())));
    }

    /// Add a response for any prompt containing `needle`
    ///
    /// Rules are checked in insertion order; the first match wins.
    pub fn add_response_containing(&mut self, needle: impl Into<String>, response: impl Into<String>) {
        self.state()
            .responses
            .push((MockMatch::Contains(needle.into()), Ok(response.into())));
    }

    /// Configure to return an error for a specific prompt
    pub fn add_error(&mut self, prompt: impl Into<String>, error: LlmError) {
        self.state()
            .responses
            .push((MockMatch::Exact(prompt.into()), Err(error)));
    }

    /// Fail the next calls with the given errors, in order, before answering
    pub fn fail_next(&self, errors: impl IntoIterator<Item = LlmError>) {
        let mut state = self.state();
        let mut errors: Vec<LlmError> = errors.into_iter().collect();
        errors.reverse();
        state.scripted_failures.extend(errors);
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.state().prompts.len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.state().prompts.clone()
    }

    /// Reset the recorded prompts
    pub fn reset_call_count(&self) {
        self.state().prompts.clear();
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProvider for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        let mut state = self.state();
        state.prompts.push(prompt.to_string());

        if let Some(error) = state.scripted_failures.pop() {
            return Err(error);
        }

        if let Some((_, response)) = state.responses.iter().find(|(m, _)| m.matches(prompt)) {
            return response.clone();
        }

        Ok(self.default_response.clone())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_provider_default() {
        let provider = MockProvider::new("Test response");
        assert_eq!(provider.generate("any prompt").unwrap(), "Test response");
        assert_eq!(provider.model_name(), "mock");
    }

    #[test]
    fn test_mock_provider_specific_responses() {
        let mut provider = MockProvider::default();
        provider.add_response("hello", "world");
        provider.add_response("foo", "bar");

        assert_eq!(provider.generate("hello").unwrap(), "world");
        assert_eq!(provider.generate("foo").unwrap(), "bar");
        assert_eq!(provider.generate("unknown").unwrap(), "Default mock response");
    }

    #[test]
    fn test_mock_provider_first_matching_rule_wins() {
        let mut provider = MockProvider::default();
        provider.add_response_containing("existing answer", "refined");
        provider.add_response_containing("context", "initial");

        assert_eq!(provider.generate("context only").unwrap(), "initial");
        assert_eq!(provider.generate("context and existing answer").unwrap(), "refined");
    }

    #[test]
    fn test_mock_provider_call_count_and_prompts() {
        let provider = MockProvider::new("test");
        assert_eq!(provider.call_count(), 0);

        provider.generate("prompt1").unwrap();
        provider.generate("prompt2").unwrap();
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.prompts(), vec!["prompt1".to_string(), "prompt2".to_string()]);

        provider.reset_call_count();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_mock_provider_error() {
        let mut provider = MockProvider::default();
        provider.add_error("bad prompt", LlmError::Other("Mock error".to_string()));

        let result = provider.generate("bad prompt");
        assert!(matches!(result, Err(LlmError::Other(_))));
    }

    #[test]
    fn test_mock_provider_scripted_failures() {
        let provider = MockProvider::new("ok");
        provider.fail_next([LlmError::Timeout, LlmError::RateLimitExceeded]);

        assert_eq!(provider.generate("a"), Err(LlmError::Timeout));
        assert_eq!(provider.generate("b"), Err(LlmError::RateLimitExceeded));
        assert_eq!(provider.generate("c").unwrap(), "ok");
        assert_eq!(provider.call_count(), 3);
    }

    #[test]
    fn test_mock_provider_clone_shares_state() {
        let provider1 = MockProvider::new("test");
        let provider2 = provider1.clone();

        provider1.generate("test").unwrap();

        assert_eq!(provider1.call_count(), 1);
        assert_eq!(provider2.call_count(), 1);
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Timeout.is_transient());
        assert!(LlmError::RateLimitExceeded.is_transient());
        assert!(LlmError::Communication("reset".into()).is_transient());
        assert!(LlmError::Http { status: 503, body: String::new() }.is_transient());
        assert!(!LlmError::Http { status: 400, body: String::new() }.is_transient());
        assert!(!LlmError::Authentication("bad key".into()).is_transient());
        assert!(!LlmError::InvalidResponse("junk".into()).is_transient());
    }

    #[test]
    fn test_excerpt_truncates_long_bodies() {
        assert_eq!(excerpt("short"), "short");
        let long = "x".repeat(500);
        assert_eq!(excerpt(&long).chars().count(), 201);
    }
}
