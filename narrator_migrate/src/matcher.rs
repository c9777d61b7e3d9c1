//! Rule name predicates for operations that act on many rules at once.

use serde::{Deserialize, Serialize};

/// Selects rules by tool name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleMatcher {
    /// Names starting with this prefix (e.g. `mcp__serena__`).
    Prefix(String),
    /// Names starting with any of these prefixes.
    AnyPrefix(Vec<String>),
    /// Exactly these names.
    Exact(Vec<String>),
}

impl RuleMatcher {
    pub fn prefix(prefix: impl Into<String>) -> Self {
        RuleMatcher::Prefix(prefix.into())
    }

    pub fn any_prefix<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuleMatcher::AnyPrefix(prefixes.into_iter().map(Into::into).collect())
    }

    pub fn exact<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RuleMatcher::Exact(names.into_iter().map(Into::into).collect())
    }

    /// Check if a rule name is selected.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            RuleMatcher::Prefix(prefix) => name.starts_with(prefix.as_str()),
            RuleMatcher::AnyPrefix(prefixes) => {
                prefixes.iter().any(|p| name.starts_with(p.as_str()))
            }
            RuleMatcher::Exact(names) => names.iter().any(|n| n == name),
        }
    }

    /// Names from `candidates` selected by this matcher, order kept.
    pub fn select<'a>(&self, candidates: impl Iterator<Item = &'a str>) -> Vec<String> {
        candidates
            .filter(|name| self.matches(name))
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Display for RuleMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleMatcher::Prefix(prefix) => write!(f, "{prefix}*"),
            RuleMatcher::AnyPrefix(prefixes) => {
                let patterns: Vec<_> = prefixes.iter().map(|p| format!("{p}*")).collect();
                write!(f, "{}", patterns.join("|"))
            }
            RuleMatcher::Exact(names) => write!(f, "{}", names.join("|")),
        }
    }
}
