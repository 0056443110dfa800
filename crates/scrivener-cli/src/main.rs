//! Scrivener CLI - Extract structured fields from OCR'd documents.

use anyhow::Context;
use clap::Parser;
use scrivener_cli::cli::{ConfigAction, ExtractArgs};
use scrivener_cli::commands;
use scrivener_cli::{Cli, CliError, Command, Formatter, ScrivenerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(err) = e.downcast_ref::<CliError>() {
            tracing::debug!(kind = err.kind(), "Command failed");
        }
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // A broken file must not block writing a fresh one
    let config = match &cli.command {
        Some(Command::Config(args)) if matches!(args.action, ConfigAction::Init { .. }) => {
            ScrivenerConfig::default()
        }
        _ => ScrivenerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?,
    };

    // Determine output format
    let format = cli.format.map(Into::into).unwrap_or(config.output.format);

    // Determine color setting
    let color_enabled = !cli.no_color && config.output.color;

    let formatter = Formatter::new(format, color_enabled);
    let api_key = cli.api_key.as_deref();

    match cli.command {
        None => commands::execute_extract(ExtractArgs::default(), config, api_key, &formatter).await?,
        Some(Command::Extract(args)) => commands::execute_extract(args, config, api_key, &formatter).await?,
        Some(Command::Index(args)) => commands::execute_index(args, config, api_key, &formatter).await?,
        Some(Command::Schema(args)) => commands::execute_schema(args, &config, &formatter).await?,
        Some(Command::Config(args)) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter).await?
        }
    }

    Ok(())
}

/// Log to stderr so stdout carries only the result.
fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn,scrivener=info",
        1 => "info,scrivener=debug",
        _ => "debug,scrivener=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
