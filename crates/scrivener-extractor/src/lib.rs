//! Scrivener Extractor
//!
//! Turns a directory of OCR'd documents into one structured record per run.
//!
//! # Architecture
//!
//! ```text
//! Documents → Loader → Index (build | load) → QA prompt → refine* → Parser → ExtractionResult
//! ```
//!
//! The field schema drives an [`OutputContract`]: the same contract renders
//! the format instructions appended to both prompt templates and parses the
//! final answer, so a refined answer stays compatible with the first one.
//!
//! # Example Usage
//!
//! ```no_run
//! use scrivener_extractor::{ExtractorConfig, Pipeline};
//! use scrivener_domain::SchemaRegistry;
//! use scrivener_llm::MockProvider;
//! use scrivener_store::{HashingEmbeddingModel, IndexConfig};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     Arc::new(MockProvider::new(r#"{"name": "John Doe"}"#)),
//!     Arc::new(HashingEmbeddingModel::default()),
//!     SchemaRegistry::deceased_estate(),
//!     IndexConfig::default(),
//!     ExtractorConfig::default(),
//! )?;
//!
//! let report = pipeline.run(Path::new("data/ocr-sample")).await?;
//! for (field, value) in report.result.iter() {
//!     println!("{}: {}", field, value);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod contract;
mod engine;
mod error;
mod indexer;
mod parser;
mod pipeline;
mod prompt;
mod retry;
mod types;


pub use config::{load_schema, schema_from_toml, ContractKind, ExtractorConfig, DEFAULT_INSTRUCTION};
pub use contract::{contract_for, JsonContract, OutputContract, RailContract};
pub use engine::{QueryEngine, QueryOutcome};
pub use error::ExtractorError;
pub use indexer::build_index;
pub use parser::{is_not_found_phrase, parse_response};
pub use pipeline::Pipeline;
pub use prompt::{
    format, PromptTemplate, CONTEXT, DEFAULT_QA_TEMPLATE, DEFAULT_REFINE_TEMPLATE, EXISTING_ANSWER, QUERY,
};
pub use types::{ExtractionMetadata, ExtractionReport, PipelineStage};
