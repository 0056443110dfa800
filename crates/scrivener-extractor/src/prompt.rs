//! Prompt templates for answer synthesis and refinement

use crate::contract::OutputContract;
use crate::error::ExtractorError;
use scrivener_domain::ExtractionResult;
use std::fmt;
use std::sync::Arc;

/// Placeholder for the retrieved fragment text
pub const CONTEXT: &str = "context_str";

/// Placeholder for the instruction
pub const QUERY: &str = "query_str";

/// Placeholder for the answer being refined
pub const EXISTING_ANSWER: &str = "existing_answer";

/// Initial answer from a single fragment
pub const DEFAULT_QA_TEMPLATE: &str = "Context information is below.\n\
---------------------\n\
{context_str}\n\
---------------------\n\
Using only the context information and no prior knowledge, answer the query.\n\
Query: {query_str}\n\
Answer: ";

/// Improve an existing answer with one more fragment
pub const DEFAULT_REFINE_TEMPLATE: &str = "The original query is as follows: {query_str}\n\
We have provided an existing answer: {existing_answer}\n\
We have the opportunity to refine the existing answer (only if needed) with some more context below.\n\
------------\n\
{context_str}\n\
------------\n\
Given the new context, refine the original answer to better answer the query. \
Keep every value the new context does not contradict. \
If the context isn't useful, return the original answer.\n\
Refined Answer: ";

/// A template with an output contract appended
///
/// Rendering replaces only the known placeholders, in one pass over the
/// template, so braces in the format instructions, the fragment text or a
/// previous JSON answer come through verbatim.
#[derive(Clone)]
pub struct PromptTemplate {
    template_text: String,
    contract: Arc<dyn OutputContract>,
}

impl fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("template_text", &self.template_text)
            .field("contract", &self.contract.name())
            .finish()
    }
}

/// Append `contract`'s format instructions to `template`
pub fn format(template: &str, contract: Arc<dyn OutputContract>) -> PromptTemplate {
    let template_text = format!("{}\n\n{}\n", template.trim_end(), contract.format_instructions());
    PromptTemplate {
        template_text,
        contract,
    }
}

impl PromptTemplate {
    /// Full template text, placeholders included
    pub fn template_text(&self) -> &str {
        &self.template_text
    }

    /// Contract shared with the sibling template
    pub fn contract(&self) -> &Arc<dyn OutputContract> {
        &self.contract
    }

    /// Substitute `vars` into the template
    ///
    /// Placeholders without a binding are left as they are.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let text = self.template_text.as_str();
        let mut out = String::with_capacity(text.len() + vars.iter().map(|(_, v)| v.len()).sum::<usize>());
        let mut rest = text;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let candidate = &rest[open + 1..];
            let binding = vars.iter().find(|(name, _)| {
                candidate.starts_with(name) && candidate[name.len()..].starts_with('}')
            });
            match binding {
                Some((name, value)) => {
                    out.push_str(value);
                    rest = &candidate[name.len() + 1..];
                }
                None => {
                    out.push('{');
                    rest = candidate;
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Parse a model answer with this template's contract
    pub fn parse(&self, raw: &str) -> Result<ExtractionResult, ExtractorError> {
        self.contract.parse(raw)
    }
}
