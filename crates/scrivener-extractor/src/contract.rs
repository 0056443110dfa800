//! Output contracts
//!
//! A contract is two halves of one agreement with the model: the format
//! instructions appended to every prompt, and the parser that reads the
//! answer back against the same field set.

use crate::config::ContractKind;
use crate::error::ExtractorError;
use crate::parser::parse_response;
use scrivener_domain::{ExtractionResult, SchemaRegistry, NOT_FOUND};
use std::fmt::{self, Write};
use std::sync::Arc;

/// Format instructions plus the matching parser for a field schema
pub trait OutputContract: fmt::Debug + Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// The schema this contract describes
    fn schema(&self) -> &SchemaRegistry;

    /// Text appended to prompt templates; deterministic for a given schema
    fn format_instructions(&self) -> String;

    /// Read a model answer back into a result
    fn parse(&self, raw: &str) -> Result<ExtractionResult, ExtractorError>;
}

/// Build the contract selected by configuration
pub fn contract_for(kind: ContractKind, schema: SchemaRegistry) -> Arc<dyn OutputContract> {
    match kind {
        ContractKind::Json => Arc::new(JsonContract::new(schema)),
        ContractKind::Rail => Arc::new(RailContract::new(schema)),
    }
}

/// Asks for a fenced JSON object with one string per field
#[derive(Debug, Clone)]
pub struct JsonContract {
    schema: SchemaRegistry,
}

impl JsonContract {
    /// Create a contract for `schema`
    pub fn new(schema: SchemaRegistry) -> Self {
        Self { schema }
    }
}

impl OutputContract for JsonContract {
    fn name(&self) -> &'static str {
        "json"
    }

    fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    fn format_instructions(&self) -> String {
        let mut out = String::from(
            "The output should be a markdown code snippet formatted in the following schema, \
             including the leading and trailing \"```json\" and \"```\":\n\n```json\n{\n",
        );
        for field in self.schema.iter() {
            let _ = writeln!(out, "\t\"{}\": string  // {}", field.name, field.description);
        }
        let _ = write!(
            out,
            "}}\n```\n\nIf the context does not mention a field, use \"{}\" as its value.",
            NOT_FOUND
        );
        out
    }

    fn parse(&self, raw: &str) -> Result<ExtractionResult, ExtractorError> {
        parse_response(raw, &self.schema, false)
    }
}

/// Describes the fields as an XML output schema and asks for JSON only
///
/// Every field is declared `format="one-line"`, so parsed values have their
/// whitespace collapsed.
#[derive(Debug, Clone)]
pub struct RailContract {
    schema: SchemaRegistry,
}

impl RailContract {
    /// Create a contract for `schema`
    pub fn new(schema: SchemaRegistry) -> Self {
        Self { schema }
    }
}

impl OutputContract for RailContract {
    fn name(&self) -> &'static str {
        "rail"
    }

    fn schema(&self) -> &SchemaRegistry {
        &self.schema
    }

    fn format_instructions(&self) -> String {
        let mut out = String::from(
            "Given below is XML that describes the information to extract from the context \
             and the tags to extract it into.\n\n<output>\n    <object>\n",
        );
        for field in self.schema.iter() {
            let _ = writeln!(
                out,
                "        <string name=\"{}\" description=\"{}\" format=\"one-line\"/>",
                xml_escape(&field.name),
                xml_escape(&field.description)
            );
        }
        let _ = write!(
            out,
            "    </object>\n</output>\n\n\
             ONLY return a valid JSON object (no other text is necessary). The key of each \
             field in the JSON is the `name` attribute of the corresponding XML element and \
             the value is a single line of text. If the context does not mention a field, \
             use \"{}\" as its value.",
            NOT_FOUND
        );
        out
    }

    fn parse(&self, raw: &str) -> Result<ExtractionResult, ExtractorError> {
        parse_response(raw, &self.schema, true)
    }
}

fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_domain::{FieldSpec, FieldValue};

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            FieldSpec::new("name", "Name of the deceased"),
            FieldSpec::new("age", "Age of the deceased"),
        ])
        .unwrap()
    }

    #[test]
    fn test_json_instructions_list_fields_in_order() {
        let text = JsonContract::new(schema()).format_instructions();
        let name_at = text.find("\"name\": string  // Name of the deceased").unwrap();
        let age_at = text.find("\"age\": string  // Age of the deceased").unwrap();
        assert!(name_at < age_at);
        assert!(text.contains("```json"));
    }

    #[test]
    fn test_instructions_are_deterministic() {
        let a = contract_for(ContractKind::Rail, schema()).format_instructions();
        let b = contract_for(ContractKind::Rail, schema()).format_instructions();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rail_instructions_escape_attributes() {
        let schema = SchemaRegistry::new(vec![FieldSpec::new("alias", "Name \"a.k.a.\" <alias>")]).unwrap();
        let text = RailContract::new(schema).format_instructions();
        assert!(text.contains(
            "<string name=\"alias\" description=\"Name &quot;a.k.a.&quot; &lt;alias&gt;\" format=\"one-line\"/>"
        ));
    }

    #[test]
    fn test_rail_parse_normalizes_to_one_line() {
        let contract = RailContract::new(schema());
        let result = contract.parse("{\"name\": \"John\\n   Doe\", \"age\": 54}").unwrap();
        assert_eq!(result.get("name"), Some(&FieldValue::Found("John Doe".to_string())));
        assert_eq!(result.get("age"), Some(&FieldValue::Found("54".to_string())));
    }

    #[test]
    fn test_contract_for_selects_strategy() {
        assert_eq!(contract_for(ContractKind::Json, schema()).name(), "json");
        assert_eq!(contract_for(ContractKind::Rail, schema()).name(), "rail");
    }
}
