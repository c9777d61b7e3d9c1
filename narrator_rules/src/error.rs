//! Errors raised while loading or mutating a rule document.

use thiserror::Error;

use crate::Section;

/// Failures of the schema model.
///
/// Every variant names the rule, capture, or section at fault so callers can
/// abort with a message that points at the offending part of the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The document does not have the shape of a rule configuration.
    #[error("malformed rule document at {location}: {reason}")]
    Malformed { location: String, reason: String },

    /// No rule with this name in `rules` or `mcpRules`.
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    /// The rule already has a capture reading this input key.
    #[error("rule '{rule}' already captures '{input_key}'")]
    DuplicateCapture { rule: String, input_key: String },

    /// The target section already holds a rule under this name.
    #[error("rule '{name}' already exists in {section}")]
    SectionConflict { name: String, section: Section },

    /// The section is required and cannot be removed.
    #[error("section '{0}' is required and cannot be removed")]
    RequiredSection(String),
}

impl SchemaError {
    pub(crate) fn malformed(location: impl Into<String>, reason: impl Into<String>) -> Self {
        SchemaError::Malformed {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
