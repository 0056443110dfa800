//! Index command implementation.

use super::apply_source;
use crate::backend::build_embedder;
use crate::cli::IndexArgs;
use crate::config::ScrivenerConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use scrivener_extractor::build_index;
use scrivener_store::{DocumentLoader, LoaderConfig};
use std::sync::Arc;

/// Execute the index command: load documents, build, persist.
pub async fn execute_index(
    args: IndexArgs,
    mut config: ScrivenerConfig,
    api_key: Option<&str>,
    formatter: &Formatter,
) -> Result<()> {
    apply_source(&args.source, &mut config);
    config.validate()?;

    let embedder = Arc::new(build_embedder(&config.embedding, api_key)?);
    let loader = DocumentLoader::new(LoaderConfig {
        recursive: config.documents.recursive,
    });
    let documents_dir = config.documents.dir.clone();
    let documents = blocking(move || Ok(loader.load(&documents_dir)?)).await?;

    let index = build_index(&documents, embedder, &config.index, &config.extractor).await?;
    let fragments = index.len();
    let documents = documents.len();

    let storage = config.index.storage_dir.clone();
    let path = blocking(move || Ok(index.persist(&storage)?)).await?;

    println!(
        "{}",
        formatter.success(&format!(
            "Indexed {} fragment(s) from {} document(s) into {}",
            fragments,
            documents,
            path.display()
        ))
    );

    Ok(())
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CliError::Io(std::io::Error::other(e.to_string())))?
}
