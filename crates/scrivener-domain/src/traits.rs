//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Implementations live in `scrivener-llm` and `scrivener-store`.

/// Trait for text completion providers
///
/// Implemented by the infrastructure layer (scrivener-llm)
pub trait LlmProvider {
    /// Error type for completion calls
    type Error;

    /// Generate a completion for `prompt`
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Name of the model answering prompts, for reporting
    fn model_name(&self) -> &str;
}

/// Trait for turning text into embedding vectors
///
/// Implemented by the infrastructure layer (scrivener-store, scrivener-llm)
pub trait EmbeddingModel {
    /// Error type for embedding calls
    type Error;

    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error>;

    /// Dimension of produced vectors
    fn dimension(&self) -> usize;

    /// Stable model identifier, recorded in persisted snapshots
    fn model_name(&self) -> &str;
}

/// Classifies failures of external calls for retry decisions
pub trait TransientError {
    /// Whether retrying the same call may succeed
    fn is_transient(&self) -> bool;

    /// Whether the call ran out of time
    fn is_timeout(&self) -> bool {
        false
    }
}

impl<T: LlmProvider + ?Sized> LlmProvider for Box<T> {
    type Error = T::Error;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        (**self).generate(prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<T: EmbeddingModel + ?Sized> EmbeddingModel for Box<T> {
    type Error = T::Error;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        (**self).embed(text)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}
