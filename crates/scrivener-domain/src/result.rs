//! Structured extraction output

use crate::schema::SchemaRegistry;
use std::fmt;

/// Display form of a field the model could not find
pub const NOT_FOUND: &str = "not found";

/// Value extracted for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// The model supplied a value
    Found(String),

    /// The field is absent from the source documents or the answer
    NotFound,
}

impl FieldValue {
    /// Value text, if any
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Found(value) => Some(value),
            FieldValue::NotFound => None,
        }
    }

    /// Whether this is the sentinel
    pub fn is_not_found(&self) -> bool {
        matches!(self, FieldValue::NotFound)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Found(value) => write!(f, "{}", value),
            FieldValue::NotFound => write!(f, "{}", NOT_FOUND),
        }
    }
}

/// One value per declared field, in schema order
///
/// Every field of the schema the result was created from is always present
/// as a key; absent values hold [`FieldValue::NotFound`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    entries: Vec<(String, FieldValue)>,
}

impl ExtractionResult {
    /// Create a result where every field starts as not found
    pub fn empty(schema: &SchemaRegistry) -> Self {
        Self {
            entries: schema
                .iter()
                .map(|f| (f.name.clone(), FieldValue::NotFound))
                .collect(),
        }
    }

    /// Set the value for a declared field
    ///
    /// Returns `false` without modifying anything when `name` is not part of
    /// the schema.
    pub fn set(&mut self, name: &str, value: FieldValue) -> bool {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => {
                entry.1 = value;
                true
            }
            None => false,
        }
    }

    /// Look up a field value
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Iterate `(name, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True only for a result built from no fields
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of fields holding a value
    pub fn found_count(&self) -> usize {
        self.entries.iter().filter(|(_, v)| !v.is_not_found()).count()
    }

    /// Names of fields holding the sentinel
    pub fn missing_fields(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_not_found())
            .map(|(n, _)| n.as_str())
            .collect()
    }

    /// Whether every field holds a value
    pub fn is_complete(&self) -> bool {
        self.found_count() == self.entries.len()
    }
}
