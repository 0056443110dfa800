//! Completion and embedding backends selected by configuration.

use crate::config::{EmbeddingBackend, EmbeddingConfig, LlmBackend, LlmConfig};
use crate::error::{CliError, Result};
use scrivener_domain::traits::{EmbeddingModel, LlmProvider, TransientError};
use scrivener_llm::{ollama, openai, LlmError, OllamaEmbeddingModel, OllamaProvider, OpenAiEmbeddingModel, OpenAiProvider};
use scrivener_store::{EmbeddingError, HashingEmbeddingModel, DEFAULT_HASHING_DIMENSION};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Shared completion backend.
pub type DynLlm = dyn LlmProvider<Error = LlmError> + Send + Sync;

/// Default Ollama completion model
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Default Ollama embedding model
pub const DEFAULT_OLLAMA_EMBEDDING_MODEL: &str = "nomic-embed-text";

/// Vector size of [`DEFAULT_OLLAMA_EMBEDDING_MODEL`]
pub const DEFAULT_OLLAMA_EMBEDDING_DIMENSION: usize = 768;

/// Build the completion backend.
pub fn build_llm(config: &LlmConfig, api_key: Option<&str>) -> Result<Arc<DynLlm>> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    match config.provider {
        LlmBackend::OpenAi => {
            let provider = OpenAiProvider::new(
                config.base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL),
                require_key(api_key)?,
                config.model.as_deref().unwrap_or(openai::DEFAULT_CHAT_MODEL),
            )?
            .with_timeout(timeout)?;
            Ok(Arc::new(provider))
        }
        LlmBackend::Ollama => {
            let provider = OllamaProvider::new(
                config.base_url.as_deref().unwrap_or(ollama::DEFAULT_ENDPOINT),
                config.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL),
            )?
            .with_timeout(timeout)?;
            Ok(Arc::new(provider))
        }
    }
}

/// Build the embedding backend.
pub fn build_embedder(config: &EmbeddingConfig, api_key: Option<&str>) -> Result<Embedder> {
    match config.provider {
        EmbeddingBackend::Hashing => Ok(Embedder::Hashing(HashingEmbeddingModel::new(
            config.dimension.unwrap_or(DEFAULT_HASHING_DIMENSION),
        ))),
        EmbeddingBackend::OpenAi => Ok(Embedder::OpenAi(OpenAiEmbeddingModel::new(
            config.base_url.as_deref().unwrap_or(openai::DEFAULT_BASE_URL),
            require_key(api_key)?,
            config.model.as_deref().unwrap_or(openai::DEFAULT_EMBEDDING_MODEL),
            config.dimension.unwrap_or(openai::DEFAULT_EMBEDDING_DIMENSION),
        )?)),
        EmbeddingBackend::Ollama => Ok(Embedder::Ollama(OllamaEmbeddingModel::new(
            config.base_url.as_deref().unwrap_or(ollama::DEFAULT_ENDPOINT),
            config.model.as_deref().unwrap_or(DEFAULT_OLLAMA_EMBEDDING_MODEL),
            config.dimension.unwrap_or(DEFAULT_OLLAMA_EMBEDDING_DIMENSION),
        )?)),
    }
}

fn require_key(api_key: Option<&str>) -> Result<&str> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(CliError::Config(
            "OPENAI_API_KEY is not set; export it or pass --api-key".to_string(),
        )),
    }
}

/// Errors from any embedding backend.
#[derive(Debug, Error)]
pub enum EmbedderError {
    /// Local embedder rejected the input
    #[error(transparent)]
    Local(#[from] EmbeddingError),

    /// Remote embedding call failed
    #[error(transparent)]
    Remote(#[from] LlmError),
}

impl TransientError for EmbedderError {
    fn is_transient(&self) -> bool {
        match self {
            EmbedderError::Local(e) => e.is_transient(),
            EmbedderError::Remote(e) => e.is_transient(),
        }
    }

    fn is_timeout(&self) -> bool {
        matches!(self, EmbedderError::Remote(e) if e.is_timeout())
    }
}

/// One of the supported embedding backends.
#[derive(Debug)]
pub enum Embedder {
    /// Local feature hashing
    Hashing(HashingEmbeddingModel),
    /// OpenAI-compatible endpoint
    OpenAi(OpenAiEmbeddingModel),
    /// Ollama server
    Ollama(OllamaEmbeddingModel),
}

impl EmbeddingModel for Embedder {
    type Error = EmbedderError;

    fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, Self::Error> {
        match self {
            Embedder::Hashing(model) => Ok(model.embed(text)?),
            Embedder::OpenAi(model) => Ok(model.embed(text)?),
            Embedder::Ollama(model) => Ok(model.embed(text)?),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            Embedder::Hashing(model) => model.dimension(),
            Embedder::OpenAi(model) => model.dimension(),
            Embedder::Ollama(model) => model.dimension(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Embedder::Hashing(model) => model.model_name(),
            Embedder::OpenAi(model) => model.model_name(),
            Embedder::Ollama(model) => model.model_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_backends_require_key() {
        let llm = build_llm(&LlmConfig::default(), None);
        assert!(matches!(llm, Err(CliError::Config(_))));

        let embedder = build_embedder(&EmbeddingConfig::default(), Some("  "));
        assert!(matches!(embedder, Err(CliError::Config(_))));
    }

    #[test]
    fn test_openai_llm_uses_default_model() {
        let llm = build_llm(&LlmConfig::default(), Some("sk-test")).unwrap();
        assert_eq!(llm.model_name(), openai::DEFAULT_CHAT_MODEL);
    }

    #[test]
    fn test_ollama_llm_needs_no_key() {
        let config = LlmConfig {
            provider: LlmBackend::Ollama,
            model: Some("mistral".to_string()),
            ..LlmConfig::default()
        };
        let llm = build_llm(&config, None).unwrap();
        assert_eq!(llm.model_name(), "mistral");
    }

    #[test]
    fn test_hashing_embedder_is_local() {
        let config = EmbeddingConfig {
            provider: EmbeddingBackend::Hashing,
            dimension: Some(64),
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config, None).unwrap();
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.embed("John Doe").unwrap().len(), 64);
    }

    #[test]
    fn test_embedder_defaults_per_backend() {
        let remote = build_embedder(&EmbeddingConfig::default(), Some("sk-test")).unwrap();
        assert_eq!(remote.dimension(), openai::DEFAULT_EMBEDDING_DIMENSION);

        let config = EmbeddingConfig {
            provider: EmbeddingBackend::Ollama,
            ..EmbeddingConfig::default()
        };
        let local = build_embedder(&config, None).unwrap();
        assert_eq!(local.model_name(), DEFAULT_OLLAMA_EMBEDDING_MODEL);
        assert_eq!(local.dimension(), DEFAULT_OLLAMA_EMBEDDING_DIMENSION);
    }

    #[test]
    fn test_hashing_dimension_follows_store_default() {
        let config = EmbeddingConfig {
            provider: EmbeddingBackend::Hashing,
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config, None).unwrap();
        assert_eq!(embedder.dimension(), HashingEmbeddingModel::default().dimension());
        assert_eq!(embedder.dimension(), DEFAULT_HASHING_DIMENSION);
    }

    #[test]
    fn test_embedder_errors_classify_by_backend() {
        assert!(EmbedderError::from(LlmError::RateLimitExceeded).is_transient());
        assert!(EmbedderError::from(LlmError::Timeout).is_timeout());
        assert!(!EmbedderError::from(LlmError::Authentication("bad key".into())).is_transient());
        assert!(!EmbedderError::from(EmbeddingError::InvalidInput("empty".into())).is_transient());
    }
}
