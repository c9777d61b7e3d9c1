//! Rule definitions - how one tool invocation is narrated.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::layout::KeyOrder;
use crate::template::{placeholders, DERIVED_FIELDS};
use crate::{Capture, SchemaError};

const DEFAULT: &str = "default";
const CAPTURES: &str = "captures";

/// A rendering template plus the captures that feed it.
///
/// Only `default` and `captures` are interpreted. Every other field
/// (`prefixes`, `extensions`, `patterns`, `permissionMessage`, ...) is kept
/// verbatim and never touched by migrations.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    default: Option<String>,
    /// `None` when the document had no `captures` key at all.
    captures: Option<Vec<Capture>>,
    extra: Map<String, Value>,
    order: KeyOrder,
}

impl Rule {
    /// Create a rule with the given default template and no captures.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            default: Some(template.into()),
            ..Self::default()
        }
    }

    /// Add a capture to a rule under construction.
    ///
    /// Uniqueness of input keys is checked when the rule enters a document.
    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.captures.get_or_insert_with(Vec::new).push(capture);
        self
    }

    /// The default template, if the rule has one.
    pub fn default_template(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Captures in extraction order.
    pub fn captures(&self) -> &[Capture] {
        self.captures.as_deref().unwrap_or(&[])
    }

    /// Find the capture reading `input_key`.
    pub fn capture(&self, input_key: &str) -> Option<&Capture> {
        self.captures().iter().find(|c| c.input_key() == input_key)
    }

    /// Check if the rule captures `input_key`.
    pub fn has_capture(&self, input_key: &str) -> bool {
        self.capture(input_key).is_some()
    }

    /// Check if any capture is a path from which a file type is derived.
    pub fn has_path_source(&self) -> bool {
        self.captures().iter().any(Capture::parse_file_type)
    }

    /// Value of a field outside the rule schema.
    pub fn extra_field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Placeholders in `default` that nothing would fill at narration time.
    ///
    /// A placeholder is satisfied by a capture's input key, by one of
    /// `literal_fields`, or by a derived field when the rule has a path source.
    pub fn unsatisfied_placeholders(&self, literal_fields: &[String]) -> Vec<String> {
        let Some(template) = self.default_template() else {
            return Vec::new();
        };
        placeholders(template)
            .into_iter()
            .filter(|name| {
                let derived = DERIVED_FIELDS.contains(name) && self.has_path_source();
                !(derived || self.has_capture(name) || literal_fields.iter().any(|f| f == name))
            })
            .map(str::to_string)
            .collect()
    }

    pub(crate) fn set_default_template(&mut self, template: String) {
        self.default = Some(template);
    }

    pub(crate) fn push_capture(&mut self, capture: Capture) {
        self.captures.get_or_insert_with(Vec::new).push(capture);
    }

    pub(crate) fn take_capture(&mut self, input_key: &str) -> Option<Capture> {
        let captures = self.captures.as_mut()?;
        let index = captures.iter().position(|c| c.input_key() == input_key)?;
        Some(captures.remove(index))
    }

    pub(crate) fn set_captures(&mut self, captures: Vec<Capture>) {
        self.captures = Some(captures);
    }

    /// Strip every capture down to the schema fields; returns how many changed.
    pub(crate) fn strip_captures(&mut self) -> usize {
        self.captures
            .iter_mut()
            .flatten()
            .map(Capture::strip)
            .filter(|changed| *changed)
            .count()
    }

    /// Check the rule's own invariants.
    pub(crate) fn validate(&self, location: &str) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for (i, capture) in self.captures().iter().enumerate() {
            if capture.input_key().is_empty() {
                return Err(SchemaError::malformed(
                    format!("{location}.captures[{i}]"),
                    "inputKey must be a non-empty string",
                ));
            }
            if !seen.insert(capture.input_key()) {
                return Err(SchemaError::malformed(
                    format!("{location}.captures[{i}]"),
                    format!("duplicate inputKey '{}'", capture.input_key()),
                ));
            }
        }
        Ok(())
    }

    /// Build a rule from a JSON object.
    pub fn from_object(object: Map<String, Value>, location: &str) -> Result<Self, SchemaError> {
        let order = KeyOrder::of(&object);
        let mut default = None;
        let mut captures = None;
        let mut extra = Map::new();

        for (key, value) in object {
            match key.as_str() {
                DEFAULT => match value {
                    Value::String(s) => default = Some(s),
                    _ => {
                        return Err(SchemaError::malformed(
                            location,
                            "default must be a string",
                        ))
                    }
                },
                CAPTURES => captures = Some(parse_captures(value, location)?),
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let rule = Self {
            default,
            captures,
            extra,
            order,
        };
        rule.validate(location)?;
        Ok(rule)
    }

    /// Convert back to a JSON object in load order.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut entries = Map::new();
        if let Some(template) = &self.default {
            entries.insert(DEFAULT.to_string(), Value::String(template.clone()));
        }
        if let Some(captures) = &self.captures {
            let list = captures
                .iter()
                .map(|c| Value::Object(c.to_object()))
                .collect();
            entries.insert(CAPTURES.to_string(), Value::Array(list));
        }
        for (key, value) in &self.extra {
            entries.insert(key.clone(), value.clone());
        }
        self.order.arrange(entries)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        self.default == other.default
            && self.captures == other.captures
            && self.extra == other.extra
    }
}

impl Serialize for Rule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

fn parse_captures(value: Value, location: &str) -> Result<Vec<Capture>, SchemaError> {
    let Value::Array(items) = value else {
        return Err(SchemaError::malformed(location, "captures must be an array"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let at = format!("{location}.captures[{i}]");
            match item {
                Value::Object(object) => Capture::from_object(object, &at),
                _ => Err(SchemaError::malformed(at, "capture must be an object")),
            }
        })
        .collect()
}

/// Rules of one section, keyed by tool name, in document order.
///
/// Appending keeps earlier entries in place and removal preserves the
/// relative order of the remainder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RuleSet {
    entries: Vec<(String, Rule)>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        let i = self.position(name)?;
        Some(&self.entries[i].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Rule> {
        let i = self.position(name)?;
        Some(&mut self.entries[i].1)
    }

    /// Tool names in document order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.entries.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Rule)> {
        self.entries
            .iter_mut()
            .map(|(name, rule)| (name.as_str(), rule))
    }

    /// Insert a rule, replacing in place if the name exists, appending otherwise.
    pub(crate) fn insert(&mut self, name: String, rule: Rule) -> Option<Rule> {
        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, rule)),
            None => {
                self.entries.push((name, rule));
                None
            }
        }
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<Rule> {
        let i = self.position(name)?;
        Some(self.entries.remove(i).1)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub(crate) fn from_object(object: Map<String, Value>, location: &str) -> Result<Self, SchemaError> {
        let mut entries = Vec::with_capacity(object.len());
        for (name, value) in object {
            if name.is_empty() {
                return Err(SchemaError::malformed(location, "rule name must not be empty"));
            }
            let at = format!("{location}.{name}");
            let Value::Object(rule) = value else {
                return Err(SchemaError::malformed(at, "rule must be an object"));
            };
            let rule = Rule::from_object(rule, &at)?;
            entries.push((name, rule));
        }
        Ok(Self { entries })
    }

    pub(crate) fn to_object(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(name, rule)| (name.clone(), Value::Object(rule.to_object())))
            .collect()
    }
}
