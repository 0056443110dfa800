//! Schema command implementation.

use super::resolve_schema;
use crate::cli::SchemaArgs;
use crate::config::ScrivenerConfig;
use crate::error::Result;
use crate::output::Formatter;

/// Execute the schema command.
pub async fn execute_schema(args: SchemaArgs, config: &ScrivenerConfig, formatter: &Formatter) -> Result<()> {
    let schema = resolve_schema(args.schema.as_deref(), config)?;
    println!("{}", formatter.format_schema(&schema)?);
    Ok(())
}
