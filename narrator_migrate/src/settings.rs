//! Settings for migration runs.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding [`MigrateSettings::template_policy`].
pub const TEMPLATE_POLICY_ENV: &str = "NARRATOR_MIGRATE_TEMPLATE_POLICY";

/// How templates set during a run are checked against their rule's captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplatePolicy {
    /// Unsatisfied placeholders fail the run.
    #[default]
    Strict,
    /// Unsatisfied placeholders are logged and the run continues.
    Permissive,
}

impl TemplatePolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "permissive" | "lenient" | "off" => Some(Self::Permissive),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read settings {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid NARRATOR_MIGRATE_TEMPLATE_POLICY value '{0}' (expected strict or permissive)")]
    Policy(String),
}

/// Configuration of the migration engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrateSettings {
    /// Checking applied to templates set during a run.
    pub template_policy: TemplatePolicy,

    /// Input fields the narrator substitutes into templates on its own,
    /// without a capture.
    pub literal_fields: Vec<String>,
}

impl Default for MigrateSettings {
    fn default() -> Self {
        Self {
            template_policy: TemplatePolicy::Strict,
            literal_fields: [
                "command",
                "pattern",
                "path",
                "dirname",
                "domain",
                "query",
                "description",
                "count",
                "operation",
                "tool",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl MigrateSettings {
    /// Load settings from an optional TOML file, then apply environment overrides.
    ///
    /// Without a file the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.with_env_overrides()
    }

    /// Parse settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `NARRATOR_MIGRATE_TEMPLATE_POLICY` if it is set.
    pub fn with_env_overrides(self) -> Result<Self, SettingsError> {
        match env::var(TEMPLATE_POLICY_ENV) {
            Ok(value) => self.with_policy_override(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_policy_override(mut self, value: &str) -> Result<Self, SettingsError> {
        self.template_policy =
            TemplatePolicy::parse(value).ok_or_else(|| SettingsError::Policy(value.to_string()))?;
        Ok(self)
    }
}
