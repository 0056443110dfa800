//! Pipeline stages and the report of a completed run

use scrivener_domain::ExtractionResult;
use scrivener_store::IndexMode;
use std::fmt;

/// Stages of an extraction run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Reading documents
    Load,
    /// Building or restoring the index
    Index,
    /// Rendering templates with the output contract
    Format,
    /// Retrieval, answer synthesis and refinement
    Query,
    /// Mapping the answer onto the schema
    Parse,
    /// Finished
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Load => "load",
            PipelineStage::Index => "index",
            PipelineStage::Format => "format",
            PipelineStage::Query => "query",
            PipelineStage::Parse => "parse",
            PipelineStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// One value or sentinel per declared field
    pub result: ExtractionResult,

    /// Final raw model answer the result was parsed from
    pub raw_answer: String,

    /// Metadata about the run
    pub metadata: ExtractionMetadata,
}

/// Counts and timings for a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionMetadata {
    /// Documents read by the loader
    pub documents_loaded: usize,

    /// Fragments in the index
    pub fragments_indexed: usize,

    /// Whether the index was built or restored
    pub index_mode: IndexMode,

    /// Fragments fed to the model
    pub fragments_used: usize,

    /// Completion calls, retries included
    pub model_calls: usize,

    /// Completion model name
    pub model_name: String,

    /// Output contract name
    pub contract: String,

    /// Wall-clock time for the whole run
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display() {
        assert_eq!(PipelineStage::Index.to_string(), "index");
        assert_eq!(PipelineStage::Done.to_string(), "done");
    }
}
