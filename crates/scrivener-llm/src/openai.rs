//! OpenAI-compatible provider implementation
//!
//! Talks to `/chat/completions` and `/embeddings` on any OpenAI-compatible
//! base URL. The API key is injected by the caller (normally from the
//! `OPENAI_API_KEY` environment variable) and never appears in `Debug`
//! output or logs.

use crate::{block_on, excerpt, LlmError};
use scrivener_domain::traits::{EmbeddingModel, LlmProvider};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Dimension of [`DEFAULT_EMBEDDING_MODEL`]
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

/// Default timeout for API requests (60 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Connection details shared by the chat and embedding clients
#[derive(Clone)]
struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiClient {
    fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Authentication("API key is empty".to_string()));
        }
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Self::build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
        })
    }

    fn build_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
        reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))
    }

    async fn post<B, R>(&self, path: &str, body: &B, model: &str) -> Result<R, LlmError>
    where
        B: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(LlmError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::Authentication(excerpt(&text)),
                404 => LlmError::ModelNotAvailable(model.to_string()),
                429 => LlmError::RateLimitExceeded,
                code => LlmError::Http {
                    status: code,
                    body: excerpt(&text),
                },
            });
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))
    }
}

/// Chat-completion provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    inner: OpenAiClient,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl OpenAiProvider {
    /// Create a provider
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Authentication`] when `api_key` is blank.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            inner: OpenAiClient::new(base_url, api_key)?,
            model: model.into(),
            temperature: 0.0,
        })
    }

    /// Set the HTTP request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.inner.client = OpenAiClient::build_client(timeout)?;
        Ok(self)
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Request a completion for `prompt` as a single user message
    pub async fn generate_async(&self, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.temperature,
        };

        let response: ChatResponse = self.inner.post("/chat/completions", &request, &self.model).await?;
        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response has no message content".to_string()))
    }
}

impl LlmProvider for OpenAiProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        block_on(self.generate_async(prompt))?
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Embedding model served by `/embeddings`
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingModel {
    inner: OpenAiClient,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingModel {
    /// Create an embedding model; `dimension` must match what the model returns
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            inner: OpenAiClient::new(base_url, api_key)?,
            model: model.into(),
            dimension,
        })
    }

    async fn embed_async(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let response: EmbeddingResponse = self.inner.post("/embeddings", &request, &self.model).await?;
        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| LlmError::InvalidResponse("response has no embedding".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(LlmError::InvalidResponse(format!(
                "expected {} dimensions, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(embedding)
    }
}

impl EmbeddingModel for OpenAiEmbeddingModel {
    type Error = LlmError;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        block_on(self.embed_async(text))?
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAiProvider::new(DEFAULT_BASE_URL, "  ", DEFAULT_CHAT_MODEL);
        assert!(matches!(result, Err(LlmError::Authentication(_))));
    }

    #[test]
    fn test_debug_output_redacts_key() {
        let provider = OpenAiProvider::new(DEFAULT_BASE_URL, "sk-secret-value", DEFAULT_CHAT_MODEL).unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("sk-secret-value"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let model = OpenAiEmbeddingModel::new(
            "https://example.test/v1/",
            "key",
            DEFAULT_EMBEDDING_MODEL,
            DEFAULT_EMBEDDING_DIMENSION,
        )
        .unwrap();
        assert_eq!(model.inner.base_url, "https://example.test/v1");
        assert_eq!(model.dimension(), 1536);
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_unreachable_endpoint_is_communication_error() {
        let provider = OpenAiProvider::new("http://localhost:99999", "key", DEFAULT_CHAT_MODEL).unwrap();
        assert!(matches!(provider.generate("test"), Err(LlmError::Communication(_))));
    }
}
