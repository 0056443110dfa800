//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use scrivener_domain::{ExtractionResult, FieldValue, SchemaRegistry};
use scrivener_extractor::ExtractionMetadata;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format an extraction result.
    pub fn format_result(&self, result: &ExtractionResult) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&result_json(result))?),
            OutputFormat::Table => Ok(self.format_result_table(result)),
        }
    }

    fn format_result_table(&self, result: &ExtractionResult) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);

        for (name, value) in result.iter() {
            let shown = match value {
                FieldValue::Found(text) => text.clone(),
                FieldValue::NotFound => self.colorize(&value.to_string(), "yellow"),
            };
            builder.push_record([name.to_string(), shown]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        table.to_string()
    }

    /// Format the field schema.
    pub fn format_schema(&self, schema: &SchemaRegistry) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let fields: Vec<Value> = schema
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "name": f.name,
                            "description": f.description,
                        })
                    })
                    .collect();
                Ok(serde_json::to_string_pretty(&fields)?)
            }
            OutputFormat::Table => {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Description"]);
                for field in schema.iter() {
                    builder.push_record([field.name.as_str(), field.description.as_str()]);
                }

                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// One-line summary of a completed run.
    pub fn summary(&self, result: &ExtractionResult, metadata: &ExtractionMetadata) -> String {
        let message = format!(
            "Extracted {}/{} fields from {} document(s) in {} ms ({} model call(s), {})",
            result.found_count(),
            result.len(),
            metadata.documents_loaded,
            metadata.processing_time_ms,
            metadata.model_calls,
            metadata.model_name,
        );
        if result.is_complete() {
            self.success(&message)
        } else {
            self.warning(&message)
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}

/// JSON object of the result, keys in schema order.
pub fn result_json(result: &ExtractionResult) -> Value {
    let map: Map<String, Value> = result
        .iter()
        .map(|(name, value)| (name.to_string(), Value::String(value.to_string())))
        .collect();
    Value::Object(map)
}

/// Write the result as pretty JSON to `path`.
pub fn write_json(path: &Path, result: &ExtractionResult) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut contents = serde_json::to_string_pretty(&result_json(result))?;
    contents.push('\n');
    fs::write(path, contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_domain::FieldSpec;
    use scrivener_store::IndexMode;
    use tempfile::TempDir;

    fn create_test_result() -> ExtractionResult {
        let schema = SchemaRegistry::new(vec![
            FieldSpec::new("name", "Name of the deceased"),
            FieldSpec::new("age", "Age of the deceased"),
            FieldSpec::new("identity_card", "Identity card number"),
        ])
        .unwrap();
        let mut result = ExtractionResult::empty(&schema);
        result.set("name", FieldValue::Found("John Doe".to_string()));
        result.set("age", FieldValue::Found("54".to_string()));
        result
    }

    fn create_test_metadata() -> ExtractionMetadata {
        ExtractionMetadata {
            documents_loaded: 1,
            fragments_indexed: 1,
            index_mode: IndexMode::Build,
            fragments_used: 1,
            model_calls: 1,
            model_name: "mock".to_string(),
            contract: "json".to_string(),
            processing_time_ms: 12,
        }
    }

    #[test]
    fn test_json_keeps_schema_order() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_result(&create_test_result()).unwrap();

        let name = output.find("\"name\"").unwrap();
        let age = output.find("\"age\"").unwrap();
        let card = output.find("\"identity_card\"").unwrap();
        assert!(name < age && age < card);
        assert!(output.contains("\"identity_card\": \"not found\""));
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_result(&create_test_result()).unwrap();
        assert!(output.contains("Field"));
        assert!(output.contains("John Doe"));
        assert!(output.contains("not found"));
    }

    #[test]
    fn test_schema_table() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_schema(&SchemaRegistry::deceased_estate()).unwrap();
        assert!(output.contains("Description"));
        assert!(output.contains("marital_status"));
    }

    #[test]
    fn test_summary_warns_on_missing_fields() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let summary = formatter.summary(&create_test_result(), &create_test_metadata());
        assert!(summary.starts_with("⚠ Extracted 2/3 fields"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let msg = formatter.success("test");
        assert_eq!(msg, "✓ test");
    }

    #[test]
    fn test_write_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("record.json");
        write_json(&path, &create_test_result()).unwrap();

        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["name"], "John Doe");
        assert_eq!(value["identity_card"], "not found");
    }
}
