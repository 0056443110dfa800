//! End-to-end extraction run

use crate::config::ExtractorConfig;
use crate::contract::contract_for;
use crate::engine::QueryEngine;
use crate::error::ExtractorError;
use crate::indexer::build_index;
use crate::prompt::{format, PromptTemplate, DEFAULT_QA_TEMPLATE, DEFAULT_REFINE_TEMPLATE};
use crate::types::{ExtractionMetadata, ExtractionReport, PipelineStage};
use scrivener_domain::traits::{EmbeddingModel, LlmProvider, TransientError};
use scrivener_domain::{DocumentRecord, SchemaRegistry};
use scrivener_llm::LlmError;
use scrivener_store::{DocumentIndex, DocumentLoader, IndexConfig, IndexMode, LoaderConfig};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Load → Index → Format → Query → Parse
///
/// Any error ends the run; no partial result is returned.
pub struct Pipeline<L, E>
where
    L: LlmProvider<Error = LlmError> + ?Sized,
    E: EmbeddingModel + ?Sized,
{
    llm: Arc<L>,
    embedder: Arc<E>,
    schema: SchemaRegistry,
    loader: LoaderConfig,
    index_config: IndexConfig,
    config: ExtractorConfig,
}

impl<L, E> Pipeline<L, E>
where
    L: LlmProvider<Error = LlmError> + Send + Sync + ?Sized + 'static,
    E: EmbeddingModel + Send + Sync + ?Sized + 'static,
    E::Error: TransientError + Display + Send + 'static,
{
    /// Create a pipeline
    ///
    /// # Errors
    ///
    /// [`ExtractorError::Config`] if either configuration fails validation.
    pub fn new(
        llm: Arc<L>,
        embedder: Arc<E>,
        schema: SchemaRegistry,
        index_config: IndexConfig,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;
        index_config.validate().map_err(ExtractorError::Config)?;
        Ok(Self {
            llm,
            embedder,
            schema,
            loader: LoaderConfig::default(),
            index_config,
            config,
        })
    }

    /// Set loader options
    pub fn with_loader_config(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// QA and refine templates sharing one contract over the schema
    pub fn templates(&self) -> (PromptTemplate, PromptTemplate) {
        let contract = contract_for(self.config.contract, self.schema.clone());
        (
            format(DEFAULT_QA_TEMPLATE, Arc::clone(&contract)),
            format(DEFAULT_REFINE_TEMPLATE, contract),
        )
    }

    /// Run every stage against the documents in `documents_dir`
    pub async fn run(&self, documents_dir: &Path) -> Result<ExtractionReport, ExtractorError> {
        let started = Instant::now();

        enter(PipelineStage::Load);
        let loader = DocumentLoader::new(self.loader.clone());
        let dir = documents_dir.to_path_buf();
        let documents = blocking(move || Ok(loader.load(&dir)?)).await?;
        let documents_loaded = documents.len();

        enter(PipelineStage::Index);
        let index = self.index(documents).await?;

        enter(PipelineStage::Format);
        let (qa_template, refine_template) = self.templates();
        debug!(
            "Formatted templates with {} contract over {} fields",
            qa_template.contract().name(),
            self.schema.len()
        );

        enter(PipelineStage::Query);
        let engine = QueryEngine::new(
            Arc::clone(&self.llm),
            Arc::clone(&self.embedder),
            self.config.clone(),
        );
        let outcome = engine
            .query(&self.config.instruction, &index, &qa_template, &refine_template)
            .await?;

        enter(PipelineStage::Parse);
        let result = qa_template.parse(&outcome.answer)?;
        info!(
            "Parsed {}/{} fields",
            result.found_count(),
            result.len()
        );

        enter(PipelineStage::Done);
        Ok(ExtractionReport {
            result,
            raw_answer: outcome.answer,
            metadata: ExtractionMetadata {
                documents_loaded,
                fragments_indexed: index.len(),
                index_mode: self.index_config.mode,
                fragments_used: outcome.fragments_used,
                model_calls: outcome.model_calls,
                model_name: self.llm.model_name().to_string(),
                contract: qa_template.contract().name().to_string(),
                processing_time_ms: started.elapsed().as_millis() as u64,
            },
        })
    }

    async fn index(
        &self,
        documents: Vec<DocumentRecord>,
    ) -> Result<DocumentIndex, ExtractorError> {
        let storage: PathBuf = self.index_config.storage_dir.clone();

        match self.index_config.mode {
            IndexMode::Build => {
                let index = build_index(
                    &documents,
                    Arc::clone(&self.embedder),
                    &self.index_config,
                    &self.config,
                )
                .await?;
                blocking(move || {
                    index.persist(&storage)?;
                    Ok(index)
                })
                .await
            }
            IndexMode::Load => {
                let embedder = Arc::clone(&self.embedder);
                let config = self.index_config.clone();
                blocking(move || Ok(DocumentIndex::load(&storage, embedder.as_ref(), &config)?)).await
            }
        }
    }
}

fn enter(stage: PipelineStage) {
    info!(stage = %stage, "Entering stage {}", stage);
}

/// Run filesystem, SQLite or embedding work off the async workers
async fn blocking<T, F>(f: F) -> Result<T, ExtractorError>
where
    F: FnOnce() -> Result<T, ExtractorError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ExtractorError::Io(format!("blocking task failed: {}", e)))?
}
