//! Reading OCR documents from a directory
//!
//! Plain text files load verbatim. JSON files holding a Document AI OCR result
//! (a top-level `text` string) load as that text, with any recognised form
//! fields appended as `name: value` lines and tables as `cell|cell` rows.

use crate::StoreError;
use scrivener_domain::DocumentRecord;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Options controlling which files are read
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,
}

/// Loads every readable document below a directory
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    config: LoaderConfig,
}

impl DocumentLoader {
    /// Create a loader with the given options
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Load all documents in `dir`, sorted by path
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if `dir` does not exist, is not a
    /// directory, or holds no readable documents.
    pub fn load(&self, dir: &Path) -> Result<Vec<DocumentRecord>, StoreError> {
        if !dir.is_dir() {
            return Err(StoreError::NotFound(format!(
                "document directory '{}' does not exist",
                dir.display()
            )));
        }

        let mut paths = Vec::new();
        self.collect_paths(dir, &mut paths)?;
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            match read_document(&path) {
                Ok(record) => {
                    debug!("Loaded {} ({} chars)", path.display(), record.raw_text.len());
                    documents.push(record);
                }
                Err(e) => warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }

        if documents.is_empty() {
            return Err(StoreError::NotFound(format!(
                "document directory '{}' contains no readable documents",
                dir.display()
            )));
        }

        info!("Loaded {} documents from {}", documents.len(), dir.display());
        Ok(documents)
    }

    fn collect_paths(&self, dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StoreError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if is_hidden(&path) {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                if self.config.recursive {
                    self.collect_paths(&path, out)?;
                }
            } else if path.is_file() {
                out.push(path);
            }
        }
        Ok(())
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn read_document(path: &Path) -> Result<DocumentRecord, std::io::Error> {
    let bytes = fs::read(path)?;
    let size_bytes = bytes.len();
    let content = String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let (raw_text, format) = if extension == "json" {
        match document_ai_text(&content) {
            Some(text) => (text, "document-ai"),
            None => (content, "text"),
        }
    } else {
        (content, "text")
    };

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    Ok(DocumentRecord::new(raw_text, path)
        .with_metadata("file_name", file_name)
        .with_metadata("extension", extension)
        .with_metadata("format", format)
        .with_metadata("size_bytes", size_bytes.to_string()))
}

/// Extract the text of a Document AI OCR result, if `content` is one
///
/// Form fields follow the text as `name: value` lines, then every table as
/// one `cell|cell|cell` line per header and body row.
fn document_ai_text(content: &str) -> Option<String> {
    let json: Value = serde_json::from_str(content).ok()?;
    let source = json.get("text")?.as_str()?;
    let mut text = source.trim().to_string();

    let mut field_lines = Vec::new();
    let mut tables = Vec::new();
    for page in json.get("pages").and_then(Value::as_array).into_iter().flatten() {
        for field in page.get("formFields").and_then(Value::as_array).into_iter().flatten() {
            let name = anchor_content(field.get("fieldName"));
            let value = anchor_content(field.get("fieldValue"));
            if let (Some(name), Some(value)) = (name, value) {
                field_lines.push(format!("{}: {}", name, value));
            }
        }

        for table in page.get("tables").and_then(Value::as_array).into_iter().flatten() {
            let rows: Vec<String> = ["headerRows", "bodyRows"]
                .iter()
                .flat_map(|key| table.get(*key).and_then(Value::as_array).into_iter().flatten())
                .map(|row| table_row(row, source))
                .collect();
            if !rows.is_empty() {
                tables.push(rows.join("\n"));
            }
        }
    }

    if !field_lines.is_empty() {
        text.push_str("\n\n");
        text.push_str(&field_lines.join("\n"));
    }
    for table in tables {
        text.push_str("\n\n");
        text.push_str(&table);
    }

    Some(text)
}

fn anchor_content(value: Option<&Value>) -> Option<String> {
    let content = value?.get("textAnchor")?.get("content")?.as_str()?.trim();
    if content.is_empty() {
        return None;
    }
    Some(content.replace('\n', " "))
}

/// Render one table row as `cell|cell|cell`
fn table_row(row: &Value, source: &str) -> String {
    row.get("cells")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .map(|cell| cell_text(cell, source))
        .collect::<Vec<_>>()
        .join("|")
}

/// Text of a cell, taken from its first text segment
fn cell_text(cell: &Value, source: &str) -> String {
    let Some(segment) = cell
        .get("layout")
        .and_then(|l| l.get("textAnchor"))
        .and_then(|a| a.get("textSegments"))
        .and_then(Value::as_array)
        .and_then(|segments| segments.first())
    else {
        return String::new();
    };

    let start = segment_index(segment.get("startIndex"));
    let end = segment_index(segment.get("endIndex"));
    source
        .chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect::<String>()
        .trim()
        .replace('\n', " ")
}

/// Segment offsets arrive as JSON strings (int64) or numbers; absent means 0
fn segment_index(value: Option<&Value>) -> usize {
    match value {
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as usize,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_directory() {
        let loader = DocumentLoader::default();
        let result = loader.load(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let result = DocumentLoader::default().load(dir.path());
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_loads_one_record_per_readable_file_in_path_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.txt"), "second").unwrap();
        fs::write(dir.path().join("a.txt"), "first").unwrap();
        fs::write(dir.path().join("c.bin"), [0xff, 0xfe, 0x00]).unwrap();
        fs::write(dir.path().join(".hidden"), "ignored").unwrap();

        let docs = DocumentLoader::default().load(dir.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].raw_text, "first");
        assert_eq!(docs[1].raw_text, "second");
        assert_eq!(docs[0].metadata("file_name"), Some("a.txt"));
        assert_eq!(docs[0].metadata("format"), Some("text"));
        assert_eq!(docs[0].metadata("size_bytes"), Some("5"));
    }

    #[test]
    fn test_recursion_is_opt_in() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("top.txt"), "top").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested").join("inner.txt"), "inner").unwrap();

        let flat = DocumentLoader::default().load(dir.path()).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = DocumentLoader::new(LoaderConfig { recursive: true })
            .load(dir.path())
            .unwrap();
        assert_eq!(deep.len(), 2);
    }

    #[test]
    fn test_document_ai_json_with_form_fields() {
        let dir = TempDir::new().unwrap();
        let ocr = r#"{
            "text": "LAST WILL AND TESTAMENT\nof John Doe",
            "pages": [{
                "formFields": [{
                    "fieldName": {"textAnchor": {"content": "Name\n"}},
                    "fieldValue": {"textAnchor": {"content": "John\nDoe"}}
                }]
            }]
        }"#;
        fs::write(dir.path().join("will.json"), ocr).unwrap();

        let docs = DocumentLoader::default().load(dir.path()).unwrap();
        assert_eq!(docs[0].metadata("format"), Some("document-ai"));
        assert!(docs[0].raw_text.starts_with("LAST WILL AND TESTAMENT"));
        assert!(docs[0].raw_text.ends_with("Name: John Doe"));
    }

    #[test]
    fn test_document_ai_json_with_table() {
        let dir = TempDir::new().unwrap();
        // Offsets: Date 0..4, Amount 5..11, 2019-03-01 12..22, 1,500.00 23..31
        let ocr = r#"{
            "text": "Date Amount\n2019-03-01 1,500.00\n",
            "pages": [{
                "tables": [{
                    "headerRows": [{"cells": [
                        {"layout": {"textAnchor": {"textSegments": [{"endIndex": "4"}]}}},
                        {"layout": {"textAnchor": {"textSegments": [{"startIndex": "5", "endIndex": "11"}]}}}
                    ]}],
                    "bodyRows": [{"cells": [
                        {"layout": {"textAnchor": {"textSegments": [{"startIndex": "12", "endIndex": "22"}]}}},
                        {"layout": {"textAnchor": {"textSegments": [{"startIndex": 23, "endIndex": 31}]}}},
                        {"layout": {"textAnchor": {}}}
                    ]}]
                }]
            }]
        }"#;
        fs::write(dir.path().join("statement.json"), ocr).unwrap();

        let docs = DocumentLoader::default().load(dir.path()).unwrap();
        assert_eq!(docs[0].metadata("format"), Some("document-ai"));
        assert!(docs[0]
            .raw_text
            .ends_with("\n\nDate|Amount\n2019-03-01|1,500.00|"));
    }

    #[test]
    fn test_other_json_loads_verbatim() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("data.json"), r#"{"page": 1}"#).unwrap();

        let docs = DocumentLoader::default().load(dir.path()).unwrap();
        assert_eq!(docs[0].raw_text, r#"{"page": 1}"#);
        assert_eq!(docs[0].metadata("format"), Some("text"));
    }
}
