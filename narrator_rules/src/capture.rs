//! Capture definitions - values extracted from an invocation payload.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::layout::KeyOrder;
use crate::SchemaError;

const INPUT_KEY: &str = "inputKey";
const PARSE_FILE_TYPE: &str = "parseFileType";
const COMPUTED: &str = "computed";

/// One value to extract from a tool invocation's input for use in templates.
///
/// `parseFileType` and `computed` keep the distinction between "absent" and
/// "false" so that a loaded capture is re-emitted exactly as it was read.
/// Fields outside the schema are carried along until stripped.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Capture {
    input_key: String,
    parse_file_type: Option<bool>,
    computed: Option<bool>,
    extra: Map<String, Value>,
    order: KeyOrder,
}

impl Capture {
    /// Create a capture reading `input_key` from the payload.
    pub fn new(input_key: impl Into<String>) -> Self {
        Self {
            input_key: input_key.into(),
            parse_file_type: None,
            computed: None,
            extra: Map::new(),
            order: KeyOrder::default(),
        }
    }

    /// Derive `{filetype}` from the path found at this capture's key.
    pub fn with_parse_file_type(mut self, parse: bool) -> Self {
        self.parse_file_type = Some(parse);
        self
    }

    /// Mark the value as derived rather than read from input.
    pub fn with_computed(mut self, computed: bool) -> Self {
        self.computed = Some(computed);
        self
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    /// Whether a file type is derived from this capture's value.
    pub fn parse_file_type(&self) -> bool {
        self.parse_file_type.unwrap_or(false)
    }

    /// Whether the value is computed rather than read directly from input.
    pub fn is_computed(&self) -> bool {
        self.computed.unwrap_or(false)
    }

    /// Names of fields outside the capture schema, in load order.
    pub fn extra_fields(&self) -> impl Iterator<Item = &str> {
        self.extra.keys().map(String::as_str)
    }

    /// Drop every field outside the capture schema.
    ///
    /// Returns `true` if anything was removed.
    pub fn strip(&mut self) -> bool {
        if self.extra.is_empty() {
            return false;
        }
        self.extra.clear();
        true
    }

    /// Build a capture from a JSON object.
    ///
    /// `location` is used in error messages, e.g. `rules.Read.captures[0]`.
    pub fn from_object(object: Map<String, Value>, location: &str) -> Result<Self, SchemaError> {
        let order = KeyOrder::of(&object);
        let mut input_key = None;
        let mut parse_file_type = None;
        let mut computed = None;
        let mut extra = Map::new();

        for (key, value) in object {
            match key.as_str() {
                INPUT_KEY => match value {
                    Value::String(s) if !s.is_empty() => input_key = Some(s),
                    _ => {
                        return Err(SchemaError::malformed(
                            location,
                            "inputKey must be a non-empty string",
                        ))
                    }
                },
                PARSE_FILE_TYPE => {
                    parse_file_type = Some(expect_bool(&value, location, PARSE_FILE_TYPE)?)
                }
                COMPUTED => computed = Some(expect_bool(&value, location, COMPUTED)?),
                _ => {
                    extra.insert(key, value);
                }
            }
        }

        let input_key =
            input_key.ok_or_else(|| SchemaError::malformed(location, "capture has no inputKey"))?;

        Ok(Self {
            input_key,
            parse_file_type,
            computed,
            extra,
            order,
        })
    }

    /// Convert back to a JSON object in load order.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut entries = Map::new();
        entries.insert(INPUT_KEY.to_string(), Value::String(self.input_key.clone()));
        if let Some(parse) = self.parse_file_type {
            entries.insert(PARSE_FILE_TYPE.to_string(), Value::Bool(parse));
        }
        if let Some(computed) = self.computed {
            entries.insert(COMPUTED.to_string(), Value::Bool(computed));
        }
        for (key, value) in &self.extra {
            entries.insert(key.clone(), value.clone());
        }
        self.order.arrange(entries)
    }
}

// Key order is presentation only and does not take part in equality.
impl PartialEq for Capture {
    fn eq(&self, other: &Self) -> bool {
        self.input_key == other.input_key
            && self.parse_file_type == other.parse_file_type
            && self.computed == other.computed
            && self.extra == other.extra
    }
}

impl TryFrom<Map<String, Value>> for Capture {
    type Error = SchemaError;

    /// Captures built outside a document (e.g. from a plan file) are emitted
    /// in canonical field order rather than the order they were written in.
    fn try_from(object: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut capture = Capture::from_object(object, "capture")?;
        capture.order = KeyOrder::default();
        Ok(capture)
    }
}

impl Serialize for Capture {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_object().serialize(serializer)
    }
}

fn expect_bool(value: &Value, location: &str, field: &str) -> Result<bool, SchemaError> {
    value
        .as_bool()
        .ok_or_else(|| SchemaError::malformed(location, format!("{field} must be a boolean")))
}
