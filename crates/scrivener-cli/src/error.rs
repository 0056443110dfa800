//! Error types for the CLI application.

use scrivener_extractor::ExtractorError;
use scrivener_llm::LlmError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction pipeline error
    #[error(transparent)]
    Extraction(#[from] ExtractorError),

    /// Backend could not be constructed
    #[error("Backend error: {0}")]
    Backend(#[from] LlmError),

    /// Index storage error
    #[error("Store error: {0}")]
    Store(#[from] scrivener_store::StoreError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            CliError::Config(_) | CliError::Toml(_) => "config",
            CliError::Extraction(e) => match e {
                ExtractorError::NotFound(_) => "not_found",
                ExtractorError::CorruptIndex(_) => "corrupt_index",
                ExtractorError::ModelCall(_) => "model_call",
                ExtractorError::Parse(_) => "parse",
                ExtractorError::Timeout(_) => "timeout",
                ExtractorError::Config(_) => "config",
                ExtractorError::Io(_) => "io",
            },
            CliError::Backend(_) => "backend",
            CliError::Store(_) => "store",
            CliError::Io(_) => "io",
            CliError::Serialization(_) => "serialization",
            CliError::InvalidInput(_) => "invalid_input",
        }
    }
}
