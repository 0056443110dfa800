//! Config command implementation.

use crate::cli::{ConfigAction, ConfigArgs};
use crate::config::ScrivenerConfig;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use std::path::Path;

/// Execute the config command.
pub async fn execute_config(
    args: ConfigArgs,
    config: &ScrivenerConfig,
    path: Option<&Path>,
    formatter: &Formatter,
) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => ScrivenerConfig::default_path()?,
    };
    let path = path.as_path();

    match args.action {
        ConfigAction::Show => show_config(config),
        ConfigAction::Init { force } => init_config(path, force, formatter),
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Print the effective configuration as TOML.
fn show_config(config: &ScrivenerConfig) -> Result<()> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
    print!("{}", contents);
    Ok(())
}

/// Write a default configuration file.
fn init_config(path: &Path, force: bool, formatter: &Formatter) -> Result<()> {
    if path.exists() && !force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }

    ScrivenerConfig::default().save(path)?;
    println!("{}", formatter.success(&format!("Wrote {}", path.display())));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let formatter = Formatter::new(OutputFormat::Table, false);

        init_config(&path, false, &formatter).unwrap();
        assert_eq!(ScrivenerConfig::load_from(&path).unwrap(), ScrivenerConfig::default());

        let again = init_config(&path, false, &formatter);
        assert!(matches!(again, Err(CliError::InvalidInput(_))));
        assert!(init_config(&path, true, &formatter).is_ok());
    }
}
