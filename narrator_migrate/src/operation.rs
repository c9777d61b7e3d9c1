//! Migration operations - single named transformations of a rule document.

use serde::{Deserialize, Serialize};
use tracing::debug;

use narrator_rules::{Capture, Document, Section};

use crate::{MigrationError, RuleMatcher};

/// One transformation of a document.
///
/// Each operation either applies completely or fails without touching the
/// document. In plan files the variant is selected by `op`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Migration {
    /// Append a capture to a rule.
    AddCapture { rule: String, capture: Capture },

    /// Remove the capture reading `input_key` from a rule.
    RemoveCapture { rule: String, input_key: String },

    /// Overwrite a rule's whole capture list.
    ReplaceCaptures { rule: String, captures: Vec<Capture> },

    /// Strip captures down to `inputKey`, `parseFileType`, `computed`.
    /// Applies to every rule when `rule` is omitted.
    StripCaptureFields {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rule: Option<String>,
    },

    /// Move matching rules from the other section into `target`.
    RelocateRules { matcher: RuleMatcher, target: Section },

    /// Delete matching rules from `rules`.
    RemoveRules { matcher: RuleMatcher },

    /// Remove a top-level section if present.
    DropSection { section: String },

    /// Overwrite a rule's default template.
    SetDefaultTemplate { rule: String, template: String },
}

/// What an operation did to the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The document changed.
    Applied,
    /// The operation had nothing to do.
    Unchanged,
    /// These rules moved into `target`.
    Relocated { names: Vec<String>, target: Section },
    /// These rules were deleted.
    Removed { names: Vec<String> },
    /// The matcher selected no rule.
    NoMatch,
}

impl StepOutcome {
    /// Check if the step modified the document.
    pub fn changed(&self) -> bool {
        matches!(
            self,
            StepOutcome::Applied | StepOutcome::Relocated { .. } | StepOutcome::Removed { .. }
        )
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Applied => write!(f, "applied"),
            StepOutcome::Unchanged => write!(f, "unchanged"),
            StepOutcome::Relocated { names, target } => {
                write!(f, "relocated {} rule(s) to {target}: {}", names.len(), names.join(", "))
            }
            StepOutcome::Removed { names } => {
                write!(f, "removed {} rule(s): {}", names.len(), names.join(", "))
            }
            StepOutcome::NoMatch => write!(f, "no matching rules"),
        }
    }
}

impl Migration {
    /// Name of the rule whose template this operation sets, if any.
    pub fn template_target(&self) -> Option<&str> {
        match self {
            Migration::SetDefaultTemplate { rule, .. } => Some(rule.as_str()),
            _ => None,
        }
    }

    /// Apply the operation to `doc` in place.
    pub fn apply(&self, doc: &mut Document) -> Result<StepOutcome, MigrationError> {
        let outcome = match self {
            Migration::AddCapture { rule, capture } => {
                doc.add_capture(rule, capture.clone())?;
                StepOutcome::Applied
            }
            Migration::RemoveCapture { rule, input_key } => {
                match doc.remove_capture(rule, input_key)? {
                    Some(_) => StepOutcome::Applied,
                    None => StepOutcome::Unchanged,
                }
            }
            Migration::ReplaceCaptures { rule, captures } => {
                if doc.get_rule(rule)?.captures() == captures.as_slice() {
                    StepOutcome::Unchanged
                } else {
                    doc.replace_captures(rule, captures.clone())?;
                    StepOutcome::Applied
                }
            }
            Migration::StripCaptureFields { rule } => {
                let stripped = match rule {
                    Some(rule) => doc.strip_capture_fields(rule)?,
                    None => doc.strip_all_capture_fields(),
                };
                debug!(captures = stripped, "stripped capture fields");
                if stripped > 0 {
                    StepOutcome::Applied
                } else {
                    StepOutcome::Unchanged
                }
            }
            Migration::RelocateRules { matcher, target } => {
                let source = doc.section(target.other());
                let names = source
                    .map(|set| matcher.select(set.names()))
                    .unwrap_or_default();
                if names.is_empty() {
                    StepOutcome::NoMatch
                } else {
                    doc.relocate(&names, *target)?;
                    StepOutcome::Relocated {
                        names,
                        target: *target,
                    }
                }
            }
            Migration::RemoveRules { matcher } => {
                let names = matcher.select(doc.rules().names());
                if names.is_empty() {
                    StepOutcome::NoMatch
                } else {
                    for name in &names {
                        doc.remove_rule(name)?;
                    }
                    StepOutcome::Removed { names }
                }
            }
            Migration::DropSection { section } => match doc.remove_section(section)? {
                Some(_) => StepOutcome::Applied,
                None => StepOutcome::Unchanged,
            },
            Migration::SetDefaultTemplate { rule, template } => {
                doc.set_default_template(rule, template.clone())?;
                StepOutcome::Applied
            }
        };
        Ok(outcome)
    }
}

impl std::fmt::Display for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Migration::AddCapture { rule, capture } => {
                write!(f, "add_capture({rule}, {})", capture.input_key())
            }
            Migration::RemoveCapture { rule, input_key } => {
                write!(f, "remove_capture({rule}, {input_key})")
            }
            Migration::ReplaceCaptures { rule, captures } => {
                let keys: Vec<_> = captures.iter().map(Capture::input_key).collect();
                write!(f, "replace_captures({rule}, [{}])", keys.join(", "))
            }
            Migration::StripCaptureFields { rule: Some(rule) } => {
                write!(f, "strip_capture_fields({rule})")
            }
            Migration::StripCaptureFields { rule: None } => write!(f, "strip_capture_fields(*)"),
            Migration::RelocateRules { matcher, target } => {
                write!(f, "relocate_rules({matcher} -> {target})")
            }
            Migration::RemoveRules { matcher } => write!(f, "remove_rules({matcher})"),
            Migration::DropSection { section } => write!(f, "drop_section({section})"),
            Migration::SetDefaultTemplate { rule, .. } => write!(f, "set_default_template({rule})"),
        }
    }
}
