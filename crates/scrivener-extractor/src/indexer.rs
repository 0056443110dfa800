//! Index construction with retried embedding calls

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::retry::with_retries;
use scrivener_domain::traits::{EmbeddingModel, TransientError};
use scrivener_domain::DocumentRecord;
use scrivener_store::{DocumentIndex, IndexConfig};
use std::fmt::Display;
use std::sync::Arc;
use tracing::info;

/// Build a fresh index over `documents`
///
/// Each fragment is embedded under the same timeout and retry policy as
/// completion calls, so a rate-limited embedding service does not end the
/// run on its first refusal.
///
/// # Errors
///
/// - [`ExtractorError::NotFound`] if no document yields an indexable fragment
/// - [`ExtractorError::ModelCall`] / [`ExtractorError::Timeout`] when an
///   embedding call fails after retries
pub async fn build_index<E>(
    documents: &[DocumentRecord],
    embedder: Arc<E>,
    index_config: &IndexConfig,
    config: &ExtractorConfig,
) -> Result<DocumentIndex, ExtractorError>
where
    E: EmbeddingModel + Send + Sync + ?Sized + 'static,
    E::Error: TransientError + Display + Send + 'static,
{
    let fragments = DocumentIndex::split_documents(documents, index_config);
    let mut calls = 0;
    let mut entries = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        let task_embedder = Arc::clone(&embedder);
        let text = fragment.text.clone();
        let embedding = with_retries(config, "embedding", &mut calls, move || task_embedder.embed(&text)).await?;
        entries.push((fragment, embedding));
    }

    let model = embedder.model_name().to_string();
    let dimension = embedder.dimension();
    let index_config = index_config.clone();
    let index = tokio::task::spawn_blocking(move || {
        DocumentIndex::from_embedded(entries, &model, dimension, &index_config)
    })
    .await
    .map_err(|e| ExtractorError::Io(format!("blocking task failed: {}", e)))??;

    info!(
        "Built index with {} fragments from {} documents using {} ({} embedding calls)",
        index.len(),
        documents.len(),
        index.embedding_model(),
        calls
    );
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_store::HashingEmbeddingModel;

    #[tokio::test]
    async fn test_matches_synchronous_build() {
        let documents = vec![
            DocumentRecord::new("John Doe, age 54, residing at 12 Elm Street.", "will.txt"),
            DocumentRecord::new("Quarterly revenue grew by ten percent.", "report.txt"),
        ];
        let embedder = Arc::new(HashingEmbeddingModel::new(64));
        let index_config = IndexConfig::default();

        let built = build_index(&documents, Arc::clone(&embedder), &index_config, &ExtractorConfig::default())
            .await
            .unwrap();
        let reference = DocumentIndex::build(&documents, embedder.as_ref(), &index_config).unwrap();

        assert_eq!(built.len(), reference.len());
        assert_eq!(built.embedding_model(), reference.embedding_model());
        let texts = |index: &DocumentIndex| index.fragments().iter().map(|f| f.text.clone()).collect::<Vec<_>>();
        assert_eq!(texts(&built), texts(&reference));
    }

    #[tokio::test]
    async fn test_blank_corpus_is_not_found() {
        let documents = vec![DocumentRecord::new("  \n ", "blank.txt")];
        let result = build_index(
            &documents,
            Arc::new(HashingEmbeddingModel::new(64)),
            &IndexConfig::default(),
            &ExtractorConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(ExtractorError::NotFound(_))));
    }
}
