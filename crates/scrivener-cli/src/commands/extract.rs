//! Extract command implementation.

use super::{apply_source, resolve_schema};
use crate::backend::{build_embedder, build_llm};
use crate::cli::ExtractArgs;
use crate::config::ScrivenerConfig;
use crate::error::{CliError, Result};
use crate::output::{write_json, Formatter};
use scrivener_extractor::Pipeline;
use scrivener_store::LoaderConfig;
use std::sync::Arc;
use tracing::info;

/// Execute the extract command.
pub async fn execute_extract(
    args: ExtractArgs,
    mut config: ScrivenerConfig,
    api_key: Option<&str>,
    formatter: &Formatter,
) -> Result<()> {
    apply_overrides(&args, &mut config);
    config.validate()?;

    if let Some(query) = &args.query {
        if query.trim().is_empty() {
            return Err(CliError::InvalidInput("Query must not be empty".to_string()));
        }
    }

    let schema = resolve_schema(args.schema.as_deref(), &config)?;
    let llm = build_llm(&config.llm, api_key)?;
    let embedder = Arc::new(build_embedder(&config.embedding, api_key)?);

    info!(
        "Extracting {} fields with {} ({:?} index)",
        schema.len(),
        llm.model_name(),
        config.index.mode
    );

    let pipeline = Pipeline::new(llm, embedder, schema, config.index.clone(), config.extractor.clone())?
        .with_loader_config(LoaderConfig {
            recursive: config.documents.recursive,
        });
    let report = pipeline.run(&config.documents.dir).await?;

    println!("{}", formatter.format_result(&report.result)?);

    if let Some(path) = &args.output {
        write_json(path, &report.result)?;
        eprintln!("{}", formatter.success(&format!("Wrote {}", path.display())));
    }
    eprintln!("{}", formatter.summary(&report.result, &report.metadata));

    Ok(())
}

fn apply_overrides(args: &ExtractArgs, config: &mut ScrivenerConfig) {
    apply_source(&args.source, config);
    if let Some(mode) = args.index_mode {
        config.index.mode = mode.into();
    }
    if let Some(query) = &args.query {
        config.extractor.instruction = query.clone();
    }
    if let Some(top_k) = args.top_k {
        config.extractor.similarity_top_k = top_k;
    }
    if let Some(contract) = args.contract {
        config.extractor.contract = contract.into();
    }
}
