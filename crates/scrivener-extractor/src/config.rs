//! Configuration for the extraction pipeline

use crate::error::ExtractorError;
use scrivener_domain::{FieldSpec, SchemaRegistry};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default query sent to the engine
pub const DEFAULT_INSTRUCTION: &str = "Extract fields according to schema";

/// Output contract strategy used to instruct the model and parse its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    /// Fenced JSON block with one line per field
    #[default]
    Json,
    /// XML output schema with a JSON-only reply
    Rail,
}

/// Configuration for the query engine and response parsing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Number of fragments retrieved per query
    pub similarity_top_k: usize,

    /// Maximum time for a single model call (seconds)
    pub call_timeout_secs: u64,

    /// Retries after the first attempt for transient model failures
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries (milliseconds)
    pub backoff_base_ms: u64,

    /// Output contract strategy
    pub contract: ContractKind,

    /// Natural-language query passed to retrieval and the prompts
    pub instruction: String,
}

impl ExtractorConfig {
    /// Get the per-call timeout as a Duration
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    /// Delay before retry number `attempt` (1-based), doubling each time
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.similarity_top_k == 0 {
            return Err("similarity_top_k must be greater than 0".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than 0".to_string());
        }
        if self.max_retries > 10 {
            return Err("max_retries cannot exceed 10".to_string());
        }
        if self.backoff_base_ms > 60_000 {
            return Err("backoff_base_ms cannot exceed 60000".to_string());
        }
        if self.instruction.trim().is_empty() {
            return Err("instruction must not be blank".to_string());
        }
        Ok(())
    }

    /// Fast preset: one fragment, short timeout, a single retry
    pub fn fast() -> Self {
        Self {
            similarity_top_k: 1,
            call_timeout_secs: 60,
            max_retries: 1,
            backoff_base_ms: 250,
            ..Self::default()
        }
    }

    /// Thorough preset: more fragments to refine over, patient retries
    pub fn thorough() -> Self {
        Self {
            similarity_top_k: 4,
            call_timeout_secs: 300,
            max_retries: 5,
            backoff_base_ms: 1_000,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            similarity_top_k: 2,
            call_timeout_secs: 120,
            max_retries: 3,
            backoff_base_ms: 500,
            contract: ContractKind::Json,
            instruction: DEFAULT_INSTRUCTION.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct SchemaFile {
    fields: Vec<SchemaFileEntry>,
}

#[derive(Deserialize)]
struct SchemaFileEntry {
    name: String,
    description: String,
}

/// Parse a field schema from TOML
///
/// ```toml
/// [[fields]]
/// name = "name"
/// description = "Name of the deceased"
/// ```
pub fn schema_from_toml(toml_str: &str) -> Result<SchemaRegistry, ExtractorError> {
    let file: SchemaFile = toml::from_str(toml_str)
        .map_err(|e| ExtractorError::Config(format!("Failed to parse schema: {}", e)))?;
    let fields = file
        .fields
        .into_iter()
        .map(|entry| FieldSpec::new(entry.name, entry.description))
        .collect();
    SchemaRegistry::new(fields).map_err(|e| ExtractorError::Config(e.to_string()))
}

/// Read a field schema from a TOML file
pub fn load_schema(path: &Path) -> Result<SchemaRegistry, ExtractorError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ExtractorError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    schema_from_toml(&contents)
}
