//! Local embedding model for text vectorization
//!
//! Remote embedding services live in `scrivener-llm`. This module provides a
//! local, deterministic model that needs no network access or model files,
//! which makes it the default for offline runs and for tests.
//!
//! # Examples
//!
//! ```rust
//! use scrivener_store::embedding::HashingEmbeddingModel;
//! use scrivener_domain::traits::{EmbeddingModel, TransientError};
//!
//! let model = HashingEmbeddingModel::new(256);
//! let embedding = model.embed("The sky is blue").unwrap();
//! assert_eq!(embedding.len(), 256);
//!
//! // Same text always produces same embedding
//! assert_eq!(embedding, model.embed("The sky is blue").unwrap());
//! ```

use scrivener_domain::traits::{EmbeddingModel, TransientError};
use thiserror::Error;

/// Default embedding dimension for the hashing model
pub const DEFAULT_HASHING_DIMENSION: usize = 512;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl TransientError for EmbeddingError {
    fn is_transient(&self) -> bool {
        false
    }
}

/// Feature-hashing bag-of-words embedding model
///
/// Every lowercase alphanumeric token is hashed (FNV-1a) into one of
/// `dimension` buckets with a hash-derived sign, and the resulting vector is
/// normalised to unit length. Texts sharing words therefore land close
/// together under cosine similarity. The hash is fixed, so vectors stay stable
/// across builds and persisted snapshots remain comparable.
#[derive(Debug, Clone)]
pub struct HashingEmbeddingModel {
    dimension: usize,
    name: String,
}

impl HashingEmbeddingModel {
    /// Create a new hashing model
    ///
    /// # Parameters
    ///
    /// - `dimension`: The embedding dimension (clamped to at least 1)
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            name: format!("hashing-fnv1a-{}", dimension),
        }
    }

    fn fnv1a(token: &str) -> u64 {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;
        token.bytes().fold(OFFSET, |hash, byte| (hash ^ byte as u64).wrapping_mul(PRIME))
    }
}

impl Default for HashingEmbeddingModel {
    fn default() -> Self {
        Self::new(DEFAULT_HASHING_DIMENSION)
    }
}

/// Split text into lowercase alphanumeric tokens
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

impl EmbeddingModel for HashingEmbeddingModel {
    type Error = EmbeddingError;

    fn embed(&self, text: &str) -> Result<Vec<f32>, Self::Error> {
        let mut embedding = vec![0.0f32; self.dimension];
        let mut tokens = 0usize;

        for token in tokenize(text) {
            let hash = Self::fnv1a(&token);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(EmbeddingError::InvalidInput(
                "Text contains no tokens to embed".to_string(),
            ));
        }

        // Normalize to unit length for cosine similarity
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude == 0.0 {
            // Every token cancelled out; fall back to a fixed non-zero vector
            embedding[0] = 1.0;
            return Ok(embedding);
        }
        for value in &mut embedding {
            *value /= magnitude;
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

/// Calculate cosine similarity between two embedding vectors
///
/// Returns a value in `[-1, 1]`; zero-magnitude input yields `0.0`.
///
/// # Panics
///
/// Panics if vectors have different lengths
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have same length");

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_embedding_deterministic() {
        let model = HashingEmbeddingModel::new(384);
        let text = "The quick brown fox jumps over the lazy dog";
        assert_eq!(model.embed(text).unwrap(), model.embed(text).unwrap());
    }

    #[test]
    fn test_hashing_embedding_dimension() {
        let model = HashingEmbeddingModel::new(128);
        assert_eq!(model.embed("test").unwrap().len(), 128);
        assert_eq!(model.dimension(), 128);
        assert_eq!(model.model_name(), "hashing-fnv1a-128");
    }

    #[test]
    fn test_hashing_embedding_normalized() {
        let model = HashingEmbeddingModel::new(384);
        let embedding = model.embed("test text with several words").unwrap();
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001, "Embedding should be normalized");
    }

    #[test]
    fn test_case_and_punctuation_are_ignored() {
        let model = HashingEmbeddingModel::new(256);
        let a = model.embed("John Doe, age 54").unwrap();
        let b = model.embed("john doe age 54!").unwrap();
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_shared_words_score_higher() {
        let model = HashingEmbeddingModel::new(512);
        let query = model.embed("name age address of the deceased").unwrap();
        let related = model.embed("the deceased John Doe, age 54, address 12 Elm Street").unwrap();
        let unrelated = model.embed("quarterly revenue grew by ten percent").unwrap();
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn test_empty_text_rejected() {
        let model = HashingEmbeddingModel::new(64);
        let result = model.embed("  ,.;  ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("no tokens"));
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let vec = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&vec, &vec) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let similarity = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(similarity.abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
