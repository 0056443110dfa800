//! Scrivener CLI library.
//!
//! Configuration, backend selection, command execution and output
//! formatting for the `scrivener` binary.

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use backend::{build_embedder, build_llm, DynLlm, Embedder};
pub use cli::{Cli, Command};
pub use config::{OutputFormat, ScrivenerConfig};
pub use error::{CliError, Result};
pub use output::Formatter;
