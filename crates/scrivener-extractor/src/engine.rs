//! Retrieve, answer, refine

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::prompt::{PromptTemplate, CONTEXT, EXISTING_ANSWER, QUERY};
use crate::retry::with_retries;
use scrivener_domain::traits::{EmbeddingModel, LlmProvider, TransientError};
use scrivener_llm::LlmError;
use scrivener_store::DocumentIndex;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, info};

/// Answer produced by [`QueryEngine::query`]
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    /// Final raw answer after the last refine step
    pub answer: String,
    /// Fragments used, best first
    pub fragments_used: usize,
    /// Completion calls made, retries included
    pub model_calls: usize,
}

/// Drives the model over retrieved fragments
///
/// The best fragment seeds an answer through the QA template; every other
/// fragment refines it in ranked order. Each step needs the previous answer,
/// so the loop is sequential.
pub struct QueryEngine<L, E>
where
    L: LlmProvider<Error = LlmError> + ?Sized,
    E: EmbeddingModel + ?Sized,
{
    llm: Arc<L>,
    embedder: Arc<E>,
    config: ExtractorConfig,
}

impl<L, E> QueryEngine<L, E>
where
    L: LlmProvider<Error = LlmError> + Send + Sync + ?Sized + 'static,
    E: EmbeddingModel + Send + Sync + ?Sized + 'static,
    E::Error: TransientError + Display + Send + 'static,
{
    /// Create an engine over shared collaborators
    pub fn new(llm: Arc<L>, embedder: Arc<E>, config: ExtractorConfig) -> Self {
        Self { llm, embedder, config }
    }

    /// Run `instruction` against `index`
    ///
    /// # Errors
    ///
    /// - [`ExtractorError::NotFound`] when retrieval returns no fragment
    /// - [`ExtractorError::ModelCall`] / [`ExtractorError::Timeout`] when a
    ///   model call fails after retries
    pub async fn query(
        &self,
        instruction: &str,
        index: &DocumentIndex,
        qa_template: &PromptTemplate,
        refine_template: &PromptTemplate,
    ) -> Result<QueryOutcome, ExtractorError> {
        let query_embedding = self.embed(instruction).await?;
        let fragments = index.retrieve(&query_embedding, self.config.similarity_top_k)?;

        let Some((best, rest)) = fragments.split_first() else {
            return Err(ExtractorError::NotFound(
                "retrieval returned no fragments for the instruction".to_string(),
            ));
        };
        info!(
            "Retrieved {} fragments (best score {:.3})",
            fragments.len(),
            best.score
        );

        let mut calls = 0;

        let prompt = qa_template.render(&[(CONTEXT, &best.fragment.text), (QUERY, instruction)]);
        let mut answer = self.call_llm(prompt, &mut calls).await?;

        for (step, scored) in rest.iter().enumerate() {
            debug!(
                "Refine step {}/{} with fragment {} of {}",
                step + 1,
                rest.len(),
                scored.fragment.ordinal,
                scored.fragment.source_path.display()
            );
            let prompt = refine_template.render(&[
                (QUERY, instruction),
                (EXISTING_ANSWER, &answer),
                (CONTEXT, &scored.fragment.text),
            ]);
            answer = self.call_llm(prompt, &mut calls).await?;
        }

        Ok(QueryOutcome {
            answer,
            fragments_used: fragments.len(),
            model_calls: calls,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExtractorError> {
        let embedder = Arc::clone(&self.embedder);
        let text = text.to_string();
        let mut calls = 0;
        with_retries(&self.config, "embedding", &mut calls, move || embedder.embed(&text)).await
    }

    /// Call the model with timeout and bounded retries on transient errors
    async fn call_llm(&self, prompt: String, calls: &mut usize) -> Result<String, ExtractorError> {
        debug!("Prompt length: {} chars", prompt.len());
        let llm = Arc::clone(&self.llm);
        let response = with_retries(&self.config, "model call", calls, move || llm.generate(&prompt)).await?;
        debug!("LLM response length: {} chars", response.len());
        Ok(response)
    }
}
