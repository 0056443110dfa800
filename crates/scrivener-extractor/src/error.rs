//! Error types for the extraction pipeline

use scrivener_store::StoreError;
use thiserror::Error;

/// Errors that end an extraction run
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Missing input: no documents, or nothing retrieved for the query
    #[error("Not found: {0}")]
    NotFound(String),

    /// Persisted index cannot be used
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// Embedding or completion call failed
    #[error("Model call failed: {0}")]
    ModelCall(String),

    /// Model answer could not be mapped onto the schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Model call exceeded its time budget on every attempt
    #[error("Model call timed out after {0} attempts")]
    Timeout(u32),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or index storage error
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<StoreError> for ExtractorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(msg) => ExtractorError::NotFound(msg),
            StoreError::CorruptIndex(msg) => ExtractorError::CorruptIndex(msg),
            StoreError::Embedding(msg) => ExtractorError::ModelCall(msg),
            other => ExtractorError::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_keep_their_kind() {
        let err: ExtractorError = StoreError::NotFound("no documents".into()).into();
        assert!(matches!(err, ExtractorError::NotFound(_)));

        let err: ExtractorError = StoreError::CorruptIndex("bad version".into()).into();
        assert!(matches!(err, ExtractorError::CorruptIndex(_)));

        let err: ExtractorError = StoreError::Embedding("offline".into()).into();
        assert!(matches!(err, ExtractorError::ModelCall(_)));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ExtractorError = StoreError::Io(io).into();
        assert!(matches!(err, ExtractorError::Io(_)));
    }
}
