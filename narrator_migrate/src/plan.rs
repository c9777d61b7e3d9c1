//! Migration plans - named, ordered lists of operations.
//!
//! Plans are written in TOML, one `[[step]]` table per operation:
//!
//! ```toml
//! name = "relocate-mcp-rules"
//!
//! [[step]]
//! op = "relocate_rules"
//! matcher = { any_prefix = ["mcp__serena__", "mcp__ide__"] }
//! target = "mcpRules"
//! ```

use serde::{Deserialize, Serialize};

use crate::{Migration, MigrationError};

/// Plans shipped with the tool, replaying the historical rule migrations.
const BUILTIN_PLANS: &[(&str, &str)] = &[
    (
        "filetype-templates",
        include_str!("../plans/filetype-templates.toml"),
    ),
    (
        "filename-captures",
        include_str!("../plans/filename-captures.toml"),
    ),
    (
        "strip-capture-metadata",
        include_str!("../plans/strip-capture-metadata.toml"),
    ),
    (
        "relocate-mcp-rules",
        include_str!("../plans/relocate-mcp-rules.toml"),
    ),
];

/// A named sequence of migrations applied as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, rename = "step")]
    pub steps: Vec<Migration>,
}

impl MigrationPlan {
    /// Create an empty plan.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            steps: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Append a step.
    pub fn with_step(mut self, step: Migration) -> Self {
        self.steps.push(step);
        self
    }

    /// Parse a plan from TOML text.
    pub fn from_toml_str(raw: &str) -> Result<Self, MigrationError> {
        Ok(toml::from_str(raw)?)
    }

    /// Look up a built-in plan by name.
    pub fn builtin(name: &str) -> Result<Self, MigrationError> {
        let (_, raw) = BUILTIN_PLANS
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .ok_or_else(|| MigrationError::UnknownPlan(name.to_string()))?;
        Self::from_toml_str(raw)
    }

    /// Names of all built-in plans.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN_PLANS.iter().map(|(name, _)| *name)
    }
}
