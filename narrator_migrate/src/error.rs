//! Error types for migration runs.

use std::path::PathBuf;
use thiserror::Error;

use narrator_rules::SchemaError;

/// Failures of a migration operation, plan, or run.
///
/// None of these are retryable: a failure means the plan does not match the
/// document it was run against.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The document rejected an operation.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A template set during the run references placeholders nothing fills.
    #[error("template of rule '{rule}' has unsatisfied placeholders: {}", .placeholders.join(", "))]
    UnsatisfiedPlaceholders {
        rule: String,
        placeholders: Vec<String>,
    },

    /// A step of a plan failed; the run was abandoned.
    #[error("plan '{plan}' step {index} ({label}) failed")]
    Step {
        plan: String,
        index: usize,
        label: String,
        #[source]
        source: Box<MigrationError>,
    },

    /// A plan file could not be parsed.
    #[error("invalid migration plan: {0}")]
    Plan(#[from] toml::de::Error),

    /// No built-in plan has this name.
    #[error("unknown built-in plan '{0}'")]
    UnknownPlan(String),
}

impl MigrationError {
    /// The innermost error, looking through step wrappers.
    pub fn root_cause(&self) -> &MigrationError {
        match self {
            MigrationError::Step { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Failures reading or writing a document on disk.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Schema {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },
}
