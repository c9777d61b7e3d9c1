//! # Narrator Rules
//!
//! The schema of the narrator's rule configuration (`narrator-rules.json`).
//! This crate is the single source of truth for what a valid document looks
//! like and contains no migration logic.
//!
//! ## Core Types
//!
//! - **Document**: `rules`, optional `mcpRules`, and opaque top-level sections
//! - **Rule**: a default template plus an ordered list of captures
//! - **Capture**: one value read from a tool invocation's input
//!
//! Loading and re-emitting a document is lossless: key order, unknown fields,
//! and non-ASCII template text come back exactly as they were read.

mod capture;
mod document;
mod error;
mod layout;
mod rule;
pub mod template;

pub use capture::*;
pub use document::*;
pub use error::*;
pub use rule::*;

/// Parse a rule document from JSON text.
pub fn load(raw: &str) -> Result<Document, SchemaError> {
    Document::load(raw)
}

/// Render a rule document as pretty JSON.
pub fn serialize(document: &Document) -> String {
    document.to_json_string()
}

/// Look up a rule by name in `rules`, then `mcpRules`.
pub fn get_rule<'a>(document: &'a Document, name: &str) -> Result<&'a Rule, SchemaError> {
    document.get_rule(name)
}
