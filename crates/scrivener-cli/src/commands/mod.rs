//! Command implementations.

pub mod config;
pub mod extract;
pub mod index;
pub mod schema;

pub use self::config::execute_config;
pub use self::extract::execute_extract;
pub use self::index::execute_index;
pub use self::schema::execute_schema;

use crate::cli::SourceArgs;
use crate::config::ScrivenerConfig;
use crate::error::Result;
use scrivener_domain::SchemaRegistry;
use std::path::Path;
use tracing::debug;

/// Apply document and storage flags on top of the file configuration.
pub(crate) fn apply_source(args: &SourceArgs, config: &mut ScrivenerConfig) {
    if let Some(dir) = &args.documents {
        config.documents.dir = dir.clone();
    }
    if let Some(storage) = &args.storage {
        config.index.storage_dir = storage.clone();
    }
    if args.recursive {
        config.documents.recursive = true;
    }
}

/// Schema from the flag, then the config file, then the built-in one.
pub(crate) fn resolve_schema(flag: Option<&Path>, config: &ScrivenerConfig) -> Result<SchemaRegistry> {
    match flag.or(config.schema_path.as_deref()) {
        Some(path) => {
            debug!("Loading schema from {}", path.display());
            Ok(scrivener_extractor::load_schema(path)?)
        }
        None => Ok(SchemaRegistry::deceased_estate()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_apply_source_overrides() {
        let mut config = ScrivenerConfig::default();
        let args = SourceArgs {
            documents: Some(PathBuf::from("scans")),
            storage: None,
            recursive: true,
        };
        apply_source(&args, &mut config);

        assert_eq!(config.documents.dir, PathBuf::from("scans"));
        assert_eq!(config.index.storage_dir, PathBuf::from("./storage"));
        assert!(config.documents.recursive);
    }

    #[test]
    fn test_resolve_schema_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fields.toml");
        fs::write(
            &path,
            "[[fields]]\nname = \"name\"\ndescription = \"Name of the deceased\"\n",
        )
        .unwrap();

        let builtin = resolve_schema(None, &ScrivenerConfig::default()).unwrap();
        assert_eq!(builtin.len(), 11);

        let config = ScrivenerConfig {
            schema_path: Some(path.clone()),
            ..ScrivenerConfig::default()
        };
        assert_eq!(resolve_schema(None, &config).unwrap().names(), vec!["name"]);

        let missing = dir.path().join("missing.toml");
        let result = resolve_schema(Some(&missing), &config);
        assert!(matches!(result, Err(CliError::Extraction(_))));
    }
}
