//! CLI command definitions and argument parsing.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Scrivener - Extract structured fields from OCR'd documents.
#[derive(Debug, Parser)]
#[command(name = "scrivener")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub format: Option<CliFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliFormat {
    /// Table format (default)
    Table,
    /// JSON format
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the extraction pipeline (default)
    Extract(ExtractArgs),

    /// Build and persist the index without querying
    Index(IndexArgs),

    /// Show the field schema in use
    Schema(SchemaArgs),

    /// Manage the configuration file
    Config(ConfigArgs),
}

/// Index selection shared by commands that touch the index.
#[derive(Debug, Clone, Default, Args)]
pub struct SourceArgs {
    /// Directory of OCR documents
    #[arg(short, long)]
    pub documents: Option<PathBuf>,

    /// Directory holding the index snapshot
    #[arg(short, long)]
    pub storage: Option<PathBuf>,

    /// Descend into subdirectories of the documents directory
    #[arg(short, long)]
    pub recursive: bool,
}

/// Arguments for the extract command.
#[derive(Debug, Clone, Default, Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Build a fresh index or load the persisted one
    #[arg(short = 'm', long, value_enum)]
    pub index_mode: Option<IndexModeArg>,

    /// Query sent to retrieval and the prompts
    #[arg(short, long)]
    pub query: Option<String>,

    /// Number of fragments to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output contract strategy
    #[arg(long, value_enum)]
    pub contract: Option<ContractArg>,

    /// Field schema TOML file
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Also write the JSON record to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the index command.
#[derive(Debug, Clone, Default, Args)]
pub struct IndexArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

/// Arguments for the schema command.
#[derive(Debug, Clone, Default, Args)]
pub struct SchemaArgs {
    /// Field schema TOML file
    #[arg(long)]
    pub schema: Option<PathBuf>,
}

/// Arguments for configuration management.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the configuration file path
    Path,
}

/// Index mode argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum IndexModeArg {
    /// Build from documents and persist
    Build,
    /// Load the persisted snapshot
    Load,
}

/// Output contract argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ContractArg {
    /// Fenced JSON instructions
    Json,
    /// XML output schema, JSON reply
    Rail,
}

impl From<CliFormat> for crate::config::OutputFormat {
    fn from(format: CliFormat) -> Self {
        match format {
            CliFormat::Table => crate::config::OutputFormat::Table,
            CliFormat::Json => crate::config::OutputFormat::Json,
        }
    }
}

impl From<IndexModeArg> for scrivener_store::IndexMode {
    fn from(mode: IndexModeArg) -> Self {
        match mode {
            IndexModeArg::Build => scrivener_store::IndexMode::Build,
            IndexModeArg::Load => scrivener_store::IndexMode::Load,
        }
    }
}

impl From<ContractArg> for scrivener_extractor::ContractKind {
    fn from(contract: ContractArg) -> Self {
        match contract {
            ContractArg::Json => scrivener_extractor::ContractKind::Json,
            ContractArg::Rail => scrivener_extractor::ContractKind::Rail,
        }
    }
}
