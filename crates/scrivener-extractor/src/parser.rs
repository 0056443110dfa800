//! Parse model answers into extraction results
//!
//! Models wrap their answer in prose, markdown fences or half-valid JSON.
//! The parser looks for, in order: an object inside a fenced code block, the
//! first balanced `{...}` object anywhere in the text, and finally
//! `name: value` lines.

use crate::error::ExtractorError;
use scrivener_domain::{ExtractionResult, FieldValue, SchemaRegistry};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Answers that mean the model found nothing, compared case-insensitively
const NOT_FOUND_PHRASES: &[&str] = &[
    "not found",
    "n/a",
    "none",
    "null",
    "unknown",
    "not mentioned",
    "not available",
];

/// Map a raw model answer onto `schema`
///
/// Fields absent from the answer hold the sentinel. With `one_line` set,
/// internal whitespace in every value collapses to single spaces.
///
/// # Errors
///
/// [`ExtractorError::Parse`] when the answer holds no recognisable structure
/// or none of the declared fields.
pub fn parse_response(
    raw: &str,
    schema: &SchemaRegistry,
    one_line: bool,
) -> Result<ExtractionResult, ExtractorError> {
    let lookup = FieldLookup::new(schema);
    let mut result = ExtractionResult::empty(schema);

    let object = fenced_blocks(raw)
        .into_iter()
        .find_map(first_json_object)
        .or_else(|| first_json_object(raw));

    let found_object = object.is_some();
    if let Some(map) = object {
        let map = unwrap_nested(map, &lookup);
        if fill_from_object(&mut result, &map, &lookup, one_line) > 0 {
            return Ok(result);
        }
        debug!("Answer object holds no declared field, trying field lines");
    }

    if fill_from_lines(&mut result, raw, &lookup, one_line) > 0 {
        return Ok(result);
    }

    if found_object {
        Err(ExtractorError::Parse(
            "answer object contains none of the declared fields".to_string(),
        ))
    } else {
        Err(ExtractorError::Parse(format!(
            "no JSON object or field lines found in answer ({} chars)",
            raw.len()
        )))
    }
}

/// Whether `value` is empty or one of the "nothing found" phrases
pub fn is_not_found_phrase(value: &str) -> bool {
    let normalized = value.trim().trim_end_matches('.').trim().to_lowercase();
    normalized.is_empty() || NOT_FOUND_PHRASES.contains(&normalized.as_str())
}

/// Declared field names keyed by their normalized spelling
struct FieldLookup<'a> {
    by_key: HashMap<String, &'a str>,
}

impl<'a> FieldLookup<'a> {
    fn new(schema: &'a SchemaRegistry) -> Self {
        let by_key = schema
            .iter()
            .map(|field| (normalize_key(&field.name), field.name.as_str()))
            .collect();
        Self { by_key }
    }

    fn resolve(&self, key: &str) -> Option<&'a str> {
        self.by_key.get(&normalize_key(key)).copied()
    }
}

/// `"Date of Death"`, `date-of-death` and `**date_of_death**` all match
fn normalize_key(key: &str) -> String {
    key.trim()
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '*')
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Bodies of fenced blocks tagged `json` or untagged
fn fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after = &rest[open + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(after.len());
        let tag = after[..body_start].trim();
        let body = &after[body_start..];
        let wanted = tag.is_empty() || tag.eq_ignore_ascii_case("json");

        match body.find("```") {
            Some(close) => {
                if wanted {
                    blocks.push(&body[..close]);
                }
                rest = &body[close + 3..];
            }
            None => {
                // Unterminated fence, typically a truncated answer
                if wanted {
                    blocks.push(body);
                }
                break;
            }
        }
    }

    blocks
}

/// First `{...}` span in `text` that parses as a JSON object
fn first_json_object(text: &str) -> Option<Map<String, Value>> {
    text.match_indices('{').find_map(|(start, _)| {
        let end = balanced_end(&text[start..])?;
        match serde_json::from_str(&text[start..start + end]) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

/// Byte length of the brace-balanced prefix of `s`, which starts with `{`
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Descend into `{"result": {...}}` style wrappers
fn unwrap_nested(map: Map<String, Value>, lookup: &FieldLookup<'_>) -> Map<String, Value> {
    let declared_at_top = map.keys().any(|k| lookup.resolve(k).is_some());
    if declared_at_top || map.len() != 1 {
        return map;
    }
    match map.into_iter().next() {
        Some((_, Value::Object(inner))) => inner,
        Some((key, value)) => {
            let mut map = Map::new();
            map.insert(key, value);
            map
        }
        None => Map::new(),
    }
}

fn fill_from_object(
    result: &mut ExtractionResult,
    map: &Map<String, Value>,
    lookup: &FieldLookup<'_>,
    one_line: bool,
) -> usize {
    let mut filled = HashSet::new();
    for (key, value) in map {
        if let Some(name) = lookup.resolve(key) {
            if filled.insert(name) {
                result.set(name, json_value(value, one_line));
            }
        }
    }
    filled.len()
}

fn fill_from_lines(
    result: &mut ExtractionResult,
    text: &str,
    lookup: &FieldLookup<'_>,
    one_line: bool,
) -> usize {
    let mut filled = HashSet::new();
    for line in text.lines() {
        let line = line
            .trim()
            .trim_start_matches(|c: char| c == '-' || c == '*' || c == '•')
            .trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if let Some(name) = lookup.resolve(key) {
            if filled.insert(name) {
                let value = value
                    .trim()
                    .trim_end_matches(',')
                    .trim()
                    .trim_matches('"');
                result.set(name, text_value(value, one_line));
            }
        }
    }
    filled.len()
}

fn json_value(value: &Value, one_line: bool) -> FieldValue {
    match value {
        Value::Null => FieldValue::NotFound,
        Value::String(s) => text_value(s, one_line),
        Value::Bool(b) => FieldValue::Found(b.to_string()),
        Value::Number(n) => FieldValue::Found(n.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match json_value(item, true) {
                    FieldValue::Found(s) => Some(s),
                    FieldValue::NotFound => None,
                })
                .collect();
            if parts.is_empty() {
                FieldValue::NotFound
            } else {
                FieldValue::Found(parts.join(", "))
            }
        }
        Value::Object(_) => FieldValue::Found(value.to_string()),
    }
}

fn text_value(value: &str, one_line: bool) -> FieldValue {
    let cleaned = if one_line {
        value.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        value.trim().to_string()
    };
    if is_not_found_phrase(&cleaned) {
        FieldValue::NotFound
    } else {
        FieldValue::Found(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrivener_domain::FieldSpec;

    fn schema() -> SchemaRegistry {
        SchemaRegistry::new(vec![
            FieldSpec::new("name", "Name of the deceased"),
            FieldSpec::new("age", "Age of the deceased"),
            FieldSpec::new("address", "Home address of the deceased"),
        ])
        .unwrap()
    }

    fn found(s: &str) -> FieldValue {
        FieldValue::Found(s.to_string())
    }

    #[test]
    fn test_parse_fenced_json() {
        let raw = "Here is the answer:\n```json\n{\n  \"name\": \"John Doe\",\n  \"age\": \"54\",\n  \"address\": \"12 Elm Street\"\n}\n```\nLet me know!";
        let result = parse_response(raw, &schema(), false).unwrap();

        assert!(result.is_complete());
        assert_eq!(result.get("name"), Some(&found("John Doe")));
        assert_eq!(result.get("age"), Some(&found("54")));
        assert_eq!(result.get("address"), Some(&found("12 Elm Street")));
    }

    #[test]
    fn test_parse_bare_object_with_prose() {
        let raw = r#"The record is {"name": "John Doe", "age": 54, "address": "12 Elm Street"} as requested."#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("age"), Some(&found("54")));
        assert_eq!(result.found_count(), 3);
    }

    #[test]
    fn test_missing_field_becomes_sentinel() {
        let raw = r#"{"name": "John Doe", "age": "54"}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.missing_fields(), vec!["address"]);
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_not_found_phrases_become_sentinel() {
        let raw = r#"{"name": "N/A", "age": null, "address": "Not mentioned."}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.found_count(), 0);
    }

    #[test]
    fn test_braces_inside_strings_do_not_end_object() {
        let raw = r#"{"name": "John {Jack} Doe", "age": "54", "address": "x"}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("John {Jack} Doe")));
    }

    #[test]
    fn test_skips_objects_that_do_not_parse() {
        let raw = r#"Use {placeholders} like this. {"name": "Jane Roe"}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("Jane Roe")));
    }

    #[test]
    fn test_key_spelling_is_normalized() {
        let raw = r#"{"Name": "John Doe", "ADDRESS": "12 Elm Street"}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("John Doe")));
        assert_eq!(result.get("address"), Some(&found("12 Elm Street")));
    }

    #[test]
    fn test_nested_wrapper_object() {
        let raw = r#"{"result": {"name": "John Doe", "age": "54"}}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("John Doe")));
    }

    #[test]
    fn test_field_lines_fallback() {
        let raw = "- Name: John Doe\n- Age: 54\n- Address: Unknown";
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("John Doe")));
        assert_eq!(result.get("age"), Some(&found("54")));
        assert_eq!(result.get("address"), Some(&FieldValue::NotFound));
    }

    #[test]
    fn test_invalid_json_falls_back_to_lines() {
        // Trailing comma makes the object invalid JSON
        let raw = "```json\n{\n  \"name\": \"John Doe\",\n  \"age\": \"54\",\n}\n```";
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("John Doe")));
        assert_eq!(result.get("age"), Some(&found("54")));
    }

    #[test]
    fn test_one_line_collapses_whitespace() {
        let raw = "{\"address\": \"12 Elm Street\\n  Springfield\"}";
        let result = parse_response(raw, &schema(), true).unwrap();
        assert_eq!(result.get("address"), Some(&found("12 Elm Street Springfield")));
    }

    #[test]
    fn test_array_values_are_joined() {
        let raw = r#"{"name": ["John Doe", "J. Doe"]}"#;
        let result = parse_response(raw, &schema(), false).unwrap();
        assert_eq!(result.get("name"), Some(&found("John Doe, J. Doe")));
    }

    #[test]
    fn test_no_structure_is_parse_error() {
        let result = parse_response("I could not find anything useful.", &schema(), false);
        assert!(matches!(result, Err(ExtractorError::Parse(_))));
    }

    #[test]
    fn test_unrelated_object_is_parse_error() {
        let result = parse_response(r#"{"colour": "blue"}"#, &schema(), false);
        assert!(matches!(result, Err(ExtractorError::Parse(_))));
    }

    #[test]
    fn test_fenced_blocks_ignore_other_languages() {
        let text = "```python\nx = {}\n```\n```json\n{\"a\": 1}\n```";
        assert_eq!(fenced_blocks(text), vec!["{\"a\": 1}\n"]);
    }

    #[test]
    fn test_is_not_found_phrase() {
        assert!(is_not_found_phrase(""));
        assert!(is_not_found_phrase("  Not Found. "));
        assert!(is_not_found_phrase("NONE"));
        assert!(!is_not_found_phrase("Nonesuch Road"));
    }
}
