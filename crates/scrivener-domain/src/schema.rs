//! Field schema describing the record to extract

use std::collections::HashSet;
use std::fmt;

/// A single named field with a human-readable description
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSpec {
    /// Unique identifier, used as the key in model output
    pub name: String,

    /// Description shown to the model
    pub description: String,
}

impl FieldSpec {
    /// Create a new field specification
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// Reasons a schema can be rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// No fields were declared
    Empty,

    /// A field name is blank
    BlankName(usize),

    /// A field name appears more than once
    DuplicateName(String),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Empty => write!(f, "schema must declare at least one field"),
            SchemaError::BlankName(idx) => write!(f, "field {} has a blank name", idx),
            SchemaError::DuplicateName(name) => write!(f, "duplicate field name '{}'", name),
        }
    }
}

impl std::error::Error for SchemaError {}

/// Ordered, validated sequence of fields
///
/// Invariants: at least one field, names non-blank and unique. The declared
/// order is preserved everywhere the schema is rendered or reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRegistry {
    fields: Vec<FieldSpec>,
}

impl SchemaRegistry {
    /// Build a registry, validating the field list
    ///
    /// # Examples
    ///
    /// ```
    /// use scrivener_domain::{FieldSpec, SchemaRegistry};
    ///
    /// let schema = SchemaRegistry::new(vec![
    ///     FieldSpec::new("name", "Name of the deceased"),
    ///     FieldSpec::new("age", "Age of the deceased"),
    /// ]).unwrap();
    /// assert_eq!(schema.len(), 2);
    /// ```
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::Empty);
        }

        let mut seen = HashSet::new();
        for (idx, field) in fields.iter().enumerate() {
            if field.name.trim().is_empty() {
                return Err(SchemaError::BlankName(idx));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName(field.name.clone()));
            }
        }

        Ok(Self { fields })
    }

    /// The built-in schema for a deceased person named in a will
    pub fn deceased_estate() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("name", "Name of the deceased"),
                FieldSpec::new("address", "Home address of the deceased"),
                FieldSpec::new("age", "Age of the deceased"),
                FieldSpec::new("marital_status", "Marital status of the deceased"),
                FieldSpec::new("occupation", "Occupation of the deceased"),
                FieldSpec::new("identity_card", "Identity card number of the deceased"),
                FieldSpec::new("date_of_death", "Date of death of the deceased"),
                FieldSpec::new("will_written_at", "Date of will written"),
                FieldSpec::new("domicile", "Domicile of the deceased"),
                FieldSpec::new(
                    "deceased_made_and_executed_will_in_the_name_of",
                    "Deceased made and executed will in the name of",
                ),
                FieldSpec::new(
                    "deceased_held_assets_in_the_alias_of",
                    "Deceased held assets in the alias of",
                ),
            ],
        }
    }

    /// Iterate fields in declared order
    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    /// Fields as a slice
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Field names in declared order
    pub fn names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Always false for a validated registry
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_schema_rejected() {
        assert_eq!(SchemaRegistry::new(vec![]), Err(SchemaError::Empty));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let result = SchemaRegistry::new(vec![
            FieldSpec::new("name", "a"),
            FieldSpec::new("name", "b"),
        ]);
        assert_eq!(result, Err(SchemaError::DuplicateName("name".to_string())));
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = SchemaRegistry::new(vec![
            FieldSpec::new("name", "a"),
            FieldSpec::new("  ", "b"),
        ]);
        assert_eq!(result, Err(SchemaError::BlankName(1)));
    }

    #[test]
    fn test_deceased_estate_is_valid() {
        let builtin = SchemaRegistry::deceased_estate();
        let revalidated = SchemaRegistry::new(builtin.fields().to_vec()).unwrap();
        assert_eq!(builtin, revalidated);
        assert_eq!(builtin.len(), 11);
        assert_eq!(builtin.names()[0], "name");
        assert!(builtin.get("identity_card").is_some());
    }

    proptest! {
        #[test]
        fn prop_order_is_preserved(names in proptest::collection::btree_set("[a-z_]{1,12}", 1..20)) {
            let names: Vec<String> = names.into_iter().collect();
            let fields = names.iter().map(|n| FieldSpec::new(n.clone(), "desc")).collect();
            let schema = SchemaRegistry::new(fields).unwrap();
            prop_assert_eq!(schema.names(), names.iter().map(String::as_str).collect::<Vec<_>>());
        }
    }
}
