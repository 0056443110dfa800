//! Scrivener Domain Layer
//!
//! Core value types and trait interfaces shared by every other Scrivener crate.
//! Like the rest of the domain layer it carries no infrastructure dependencies:
//! loading, indexing, prompting and model access all live in other crates and
//! meet here through the traits in [`traits`].
//!
//! ## Key Concepts
//!
//! - **DocumentRecord**: raw OCR text of one source file plus its metadata
//! - **Fragment**: a retrievable chunk of a document
//! - **FieldSpec / SchemaRegistry**: the ordered set of fields to extract
//! - **ExtractionResult**: one value, or the "not found" sentinel, per field

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod result;
pub mod schema;
pub mod traits;

// Re-exports for convenience
pub use document::{DocumentId, DocumentRecord, Fragment, FragmentId};
pub use result::{ExtractionResult, FieldValue, NOT_FOUND};
pub use schema::{FieldSpec, SchemaError, SchemaRegistry};
