//! The rule document - root of the narrator's persisted configuration.

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::layout::KeyOrder;
use crate::{Capture, Rule, RuleSet, SchemaError};

/// A named grouping of rules inside the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Section {
    #[serde(rename = "rules")]
    Rules,
    #[serde(rename = "mcpRules")]
    McpRules,
}

impl Section {
    /// The document key of this section.
    pub fn key(&self) -> &'static str {
        match self {
            Section::Rules => "rules",
            Section::McpRules => "mcpRules",
        }
    }

    /// The other rule section.
    pub fn other(&self) -> Section {
        match self {
            Section::Rules => Section::McpRules,
            Section::McpRules => Section::Rules,
        }
    }

    fn from_key(key: &str) -> Option<Section> {
        match key {
            "rules" => Some(Section::Rules),
            "mcpRules" => Some(Section::McpRules),
            _ => None,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Keys of the root object and of each rule section, repeats included.
///
/// `Value` keeps only the last of repeated keys, so uniqueness is checked on
/// the raw text before it is parsed into values.
#[derive(Default)]
struct WrittenKeys {
    root: Vec<String>,
    sections: Vec<(Section, Vec<String>)>,
}

impl WrittenKeys {
    fn check(&self) -> Result<(), SchemaError> {
        if let Some(key) = first_repeat(&self.root) {
            return Err(SchemaError::malformed(
                "document",
                format!("duplicate top-level key '{key}'"),
            ));
        }
        for (section, names) in &self.sections {
            if let Some(name) = first_repeat(names) {
                return Err(SchemaError::malformed(
                    format!("{section}.{name}"),
                    "duplicate rule name",
                ));
            }
        }
        Ok(())
    }
}

fn first_repeat(keys: &[String]) -> Option<&str> {
    let mut seen = HashSet::new();
    keys.iter()
        .map(String::as_str)
        .find(|key| !seen.insert(*key))
}

impl<'de> Deserialize<'de> for WrittenKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RootKeys;
        impl<'de> Visitor<'de> for RootKeys {
            type Value = WrittenKeys;
            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a rule document object")
            }
            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<WrittenKeys, A::Error> {
                let mut keys = WrittenKeys::default();
                while let Some(key) = map.next_key::<String>()? {
                    match Section::from_key(&key) {
                        Some(section) => {
                            let SectionKeys(names) = map.next_value()?;
                            keys.sections.push((section, names));
                        }
                        None => {
                            map.next_value::<IgnoredAny>()?;
                        }
                    }
                    keys.root.push(key);
                }
                Ok(keys)
            }
        }
        deserializer.deserialize_map(RootKeys)
    }
}

/// Rule names of one section in written order.
struct SectionKeys(Vec<String>);

impl<'de> Deserialize<'de> for SectionKeys {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct Names;
        impl<'de> Visitor<'de> for Names {
            type Value = SectionKeys;
            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object of rules")
            }
            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<SectionKeys, A::Error> {
                let mut names = Vec::new();
                while let Some(name) = map.next_key::<String>()? {
                    map.next_value::<IgnoredAny>()?;
                    names.push(name);
                }
                Ok(SectionKeys(names))
            }
        }
        deserializer.deserialize_map(Names)
    }
}

/// The complete rule configuration.
///
/// `rules` is required, `mcpRules` is optional, and every other top-level
/// section (`messages`, `fileTypeNames`, deprecated `extensionTemplates`, ...)
/// is held as an opaque value. A tool name lives in at most one section.
///
/// All mutators check their preconditions before touching anything, so a
/// failed call leaves the document exactly as it was.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    rules: RuleSet,
    mcp_rules: Option<RuleSet>,
    sections: Map<String, Value>,
    order: KeyOrder,
    trailing_newline: bool,
}

impl Document {
    /// Create an empty document with an empty `rules` section.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from JSON text.
    ///
    /// Repeated keys at the top level or within `rules`/`mcpRules` are
    /// rejected rather than collapsed to the last occurrence.
    pub fn load(raw: &str) -> Result<Self, SchemaError> {
        let keys: WrittenKeys = serde_json::from_str(raw)
            .map_err(|e| SchemaError::malformed("document", e.to_string()))?;
        keys.check()?;
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| SchemaError::malformed("document", e.to_string()))?;
        let mut document = Self::from_value(value)?;
        document.trailing_newline = raw.ends_with('\n');
        Ok(document)
    }

    /// Build a document from an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let Value::Object(root) = value else {
            return Err(SchemaError::malformed("document", "root must be an object"));
        };
        let order = KeyOrder::of(&root);
        let mut rules = None;
        let mut mcp_rules = None;
        let mut sections = Map::new();

        for (key, value) in root {
            match Section::from_key(&key) {
                Some(section) => {
                    let Value::Object(object) = value else {
                        return Err(SchemaError::malformed(key, "section must be an object"));
                    };
                    let set = RuleSet::from_object(object, section.key())?;
                    match section {
                        Section::Rules => rules = Some(set),
                        Section::McpRules => mcp_rules = Some(set),
                    }
                }
                None => {
                    sections.insert(key, value);
                }
            }
        }

        let rules =
            rules.ok_or_else(|| SchemaError::malformed("document", "missing 'rules' section"))?;
        let document = Self {
            rules,
            mcp_rules,
            sections,
            order,
            trailing_newline: false,
        };
        document.validate()?;
        Ok(document)
    }

    /// Convert to a JSON value, keys in load order.
    pub fn to_value(&self) -> Value {
        let mut entries = Map::new();
        entries.insert(
            Section::Rules.key().to_string(),
            Value::Object(self.rules.to_object()),
        );
        if let Some(mcp_rules) = &self.mcp_rules {
            entries.insert(
                Section::McpRules.key().to_string(),
                Value::Object(mcp_rules.to_object()),
            );
        }
        for (key, value) in &self.sections {
            entries.insert(key.clone(), value.clone());
        }
        Value::Object(self.order.arrange(entries))
    }

    /// Render the document as pretty JSON with two-space indentation.
    ///
    /// Non-ASCII text is written as is. A trailing newline is emitted when
    /// the loaded text had one. Lines always end in `\n`, so a document
    /// loaded with CRLF line endings comes back with LF endings.
    ///
    /// Numbers in opaque fields are written exactly as they were loaded.
    pub fn to_json_string(&self) -> String {
        // Serializing a `Value` cannot fail: every map key is a string.
        let mut out = serde_json::to_string_pretty(&self.to_value()).unwrap_or_default();
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Look up a rule by exact name in `rules`, then `mcpRules`.
    pub fn get_rule(&self, name: &str) -> Result<&Rule, SchemaError> {
        self.rules
            .get(name)
            .or_else(|| self.mcp_rules.as_ref().and_then(|set| set.get(name)))
            .ok_or_else(|| SchemaError::UnknownRule(name.to_string()))
    }

    /// Mutable lookup with the same resolution order as [`Document::get_rule`].
    pub fn rule_mut(&mut self, name: &str) -> Result<&mut Rule, SchemaError> {
        let section = self
            .locate(name)
            .ok_or_else(|| SchemaError::UnknownRule(name.to_string()))?;
        self.section_entry(section)
            .and_then(|set| set.get_mut(name))
            .ok_or_else(|| SchemaError::UnknownRule(name.to_string()))
    }

    /// Which section holds `name`, if any.
    pub fn locate(&self, name: &str) -> Option<Section> {
        if self.rules.contains(name) {
            Some(Section::Rules)
        } else if self.mcp_rules.as_ref().is_some_and(|set| set.contains(name)) {
            Some(Section::McpRules)
        } else {
            None
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn mcp_rules(&self) -> Option<&RuleSet> {
        self.mcp_rules.as_ref()
    }

    /// A rule section; `None` when `mcpRules` is absent.
    pub fn section(&self, section: Section) -> Option<&RuleSet> {
        match section {
            Section::Rules => Some(&self.rules),
            Section::McpRules => self.mcp_rules.as_ref(),
        }
    }

    /// Every rule in both sections, `rules` first.
    pub fn all_rules(&self) -> impl Iterator<Item = (Section, &str, &Rule)> {
        let rules = self.rules.iter().map(|(n, r)| (Section::Rules, n, r));
        let mcp = self
            .mcp_rules
            .iter()
            .flat_map(|set| set.iter().map(|(n, r)| (Section::McpRules, n, r)));
        rules.chain(mcp)
    }

    /// Check if a top-level section exists.
    pub fn has_section(&self, name: &str) -> bool {
        match Section::from_key(name) {
            Some(Section::Rules) => true,
            Some(Section::McpRules) => self.mcp_rules.is_some(),
            None => self.sections.contains_key(name),
        }
    }

    /// An opaque top-level section.
    pub fn opaque_section(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    /// Re-check every document invariant.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for (section, name, rule) in self.all_rules() {
            let location = format!("{section}.{name}");
            if name.is_empty() {
                return Err(SchemaError::malformed(section.key(), "rule name must not be empty"));
            }
            if !seen.insert(name) {
                return Err(SchemaError::malformed(
                    location,
                    "rule appears in both rules and mcpRules",
                ));
            }
            rule.validate(&location)?;
        }
        Ok(())
    }

    /// Insert a new rule into `section`.
    pub fn insert_rule(
        &mut self,
        section: Section,
        name: impl Into<String>,
        rule: Rule,
    ) -> Result<(), SchemaError> {
        let name = name.into();
        if name.is_empty() {
            return Err(SchemaError::malformed(section.key(), "rule name must not be empty"));
        }
        if self.locate(&name).is_some() {
            return Err(SchemaError::SectionConflict { name, section });
        }
        rule.validate(&format!("{section}.{name}"))?;
        self.section_entry_or_create(section).insert(name, rule);
        Ok(())
    }

    /// Remove a rule from whichever section holds it.
    pub fn remove_rule(&mut self, name: &str) -> Result<(Section, Rule), SchemaError> {
        let section = self
            .locate(name)
            .ok_or_else(|| SchemaError::UnknownRule(name.to_string()))?;
        self.section_entry(section)
            .and_then(|set| set.remove(name))
            .map(|rule| (section, rule))
            .ok_or_else(|| SchemaError::UnknownRule(name.to_string()))
    }

    /// Append a capture to a rule.
    pub fn add_capture(&mut self, rule_name: &str, capture: Capture) -> Result<(), SchemaError> {
        let rule = self.rule_mut(rule_name)?;
        check_capture(rule_name, &capture)?;
        if rule.has_capture(capture.input_key()) {
            return Err(SchemaError::DuplicateCapture {
                rule: rule_name.to_string(),
                input_key: capture.input_key().to_string(),
            });
        }
        rule.push_capture(capture);
        Ok(())
    }

    /// Remove the capture reading `input_key`; `Ok(None)` if there is none.
    pub fn remove_capture(
        &mut self,
        rule_name: &str,
        input_key: &str,
    ) -> Result<Option<Capture>, SchemaError> {
        Ok(self.rule_mut(rule_name)?.take_capture(input_key))
    }

    /// Overwrite a rule's whole capture list.
    pub fn replace_captures(
        &mut self,
        rule_name: &str,
        captures: Vec<Capture>,
    ) -> Result<(), SchemaError> {
        let rule = self.rule_mut(rule_name)?;
        let mut seen = HashSet::new();
        for capture in &captures {
            check_capture(rule_name, capture)?;
            if !seen.insert(capture.input_key()) {
                return Err(SchemaError::DuplicateCapture {
                    rule: rule_name.to_string(),
                    input_key: capture.input_key().to_string(),
                });
            }
        }
        rule.set_captures(captures);
        Ok(())
    }

    /// Overwrite a rule's default template.
    pub fn set_default_template(
        &mut self,
        rule_name: &str,
        template: impl Into<String>,
    ) -> Result<(), SchemaError> {
        self.rule_mut(rule_name)?
            .set_default_template(template.into());
        Ok(())
    }

    /// Strip captures of one rule down to the schema fields.
    ///
    /// Returns the number of captures that lost fields.
    pub fn strip_capture_fields(&mut self, rule_name: &str) -> Result<usize, SchemaError> {
        Ok(self.rule_mut(rule_name)?.strip_captures())
    }

    /// Strip captures of every rule in both sections.
    pub fn strip_all_capture_fields(&mut self) -> usize {
        let mut changed = 0;
        for (_, rule) in self.rules.iter_mut() {
            changed += rule.strip_captures();
        }
        if let Some(mcp_rules) = self.mcp_rules.as_mut() {
            for (_, rule) in mcp_rules.iter_mut() {
                changed += rule.strip_captures();
            }
        }
        changed
    }

    /// Move the named rules from the other section into `target`.
    ///
    /// Every name must currently live in the other section and be free in
    /// `target`; nothing moves unless all of them can.
    pub fn relocate(&mut self, names: &[String], target: Section) -> Result<(), SchemaError> {
        let source = target.other();
        let mut seen = HashSet::new();
        let names: Vec<&String> = names.iter().filter(|n| seen.insert(n.as_str())).collect();
        for &name in &names {
            match self.locate(name) {
                Some(section) if section == source => {}
                Some(section) => {
                    return Err(SchemaError::SectionConflict {
                        name: name.clone(),
                        section,
                    })
                }
                None => return Err(SchemaError::UnknownRule(name.clone())),
            }
        }

        for name in names {
            let rule = self
                .section_entry(source)
                .and_then(|set| set.remove(name))
                .ok_or_else(|| SchemaError::UnknownRule(name.clone()))?;
            self.section_entry_or_create(target).insert(name.clone(), rule);
        }
        Ok(())
    }

    /// Remove a top-level section, returning its old value.
    ///
    /// `rules` is required and cannot be removed. Removing `mcpRules` returns
    /// its rules as a JSON object.
    pub fn remove_section(&mut self, name: &str) -> Result<Option<Value>, SchemaError> {
        match Section::from_key(name) {
            Some(Section::Rules) => Err(SchemaError::RequiredSection(name.to_string())),
            Some(Section::McpRules) => Ok(self
                .mcp_rules
                .take()
                .map(|set| Value::Object(set.to_object()))),
            None => Ok(self.sections.remove(name)),
        }
    }

    fn section_entry(&mut self, section: Section) -> Option<&mut RuleSet> {
        match section {
            Section::Rules => Some(&mut self.rules),
            Section::McpRules => self.mcp_rules.as_mut(),
        }
    }

    fn section_entry_or_create(&mut self, section: Section) -> &mut RuleSet {
        match section {
            Section::Rules => &mut self.rules,
            Section::McpRules => self.mcp_rules.get_or_insert_with(RuleSet::new),
        }
    }
}

fn check_capture(rule_name: &str, capture: &Capture) -> Result<(), SchemaError> {
    if capture.input_key().is_empty() {
        return Err(SchemaError::malformed(
            format!("rules.{rule_name}.captures"),
            "inputKey must be a non-empty string",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
  "rules": {
    "Read": {
      "default": "{filetype}「{filename}」を読み込みます",
      "captures": [
        {
          "inputKey": "file_path",
          "parseFileType": true
        }
      ]
    },
    "Bash": {
      "default": "コマンド「{command}」を実行します",
      "prefixes": [
        {
          "prefix": "git",
          "message": "Gitを操作します"
        }
      ]
    },
    "mcp__serena__read_file": {
      "default": "{filetype}「{file_path}」を読み込みます",
      "captures": [
        {
          "inputKey": "file_path",
          "parseFileType": true,
          "placeholder": "{file_path}"
        }
      ]
    }
  },
  "messages": {
    "genericToolExecution": "{tool}を実行します"
  },
  "extensionTemplates": {
    ".go": "Goファイル"
  },
  "mcpRules": {
    "mcp__ide__getDiagnostics": {
      "default": "診断情報を取得します"
    }
  }
}"#;

    #[test]
    fn test_round_trip_is_byte_exact() {
        let doc = Document::load(SAMPLE).unwrap();
        assert_eq!(doc.to_json_string(), SAMPLE);

        let with_newline = format!("{SAMPLE}\n");
        let doc = Document::load(&with_newline).unwrap();
        assert_eq!(doc.to_json_string(), with_newline);
    }

    #[test]
    fn test_get_rule_searches_both_sections() {
        let doc = Document::load(SAMPLE).unwrap();

        assert!(doc.get_rule("Read").is_ok());
        assert!(doc.get_rule("mcp__ide__getDiagnostics").is_ok());
        assert_eq!(doc.locate("Read"), Some(Section::Rules));
        assert_eq!(doc.locate("mcp__ide__getDiagnostics"), Some(Section::McpRules));
        assert_eq!(
            doc.get_rule("Write"),
            Err(SchemaError::UnknownRule("Write".into()))
        );
    }

    #[test]
    fn test_missing_rules_is_malformed() {
        let result = Document::load(r#"{"mcpRules": {}}"#);
        assert!(matches!(result, Err(SchemaError::Malformed { .. })));

        let result = Document::load("[]");
        assert!(matches!(result, Err(SchemaError::Malformed { .. })));

        let result = Document::load("{\"rules\": ");
        assert!(matches!(result, Err(SchemaError::Malformed { .. })));
    }

    #[test]
    fn test_name_in_both_sections_is_malformed() {
        let raw = r#"{
            "rules": {"mcp__ide__executeCode": {"default": "a"}},
            "mcpRules": {"mcp__ide__executeCode": {"default": "b"}}
        }"#;
        match Document::load(raw) {
            Err(SchemaError::Malformed { location, .. }) => {
                assert_eq!(location, "mcpRules.mcp__ide__executeCode");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_rule_name_is_malformed() {
        let raw = r#"{"rules": {"Read": {"default": "a"}, "Read": {"default": "b"}}}"#;
        match Document::load(raw) {
            Err(SchemaError::Malformed { location, .. }) => assert_eq!(location, "rules.Read"),
            other => panic!("expected malformed, got {other:?}"),
        }

        let raw = r#"{"rules": {}, "mcpRules": {"mcp__ide__x": {}, "mcp__ide__x": {}}}"#;
        match Document::load(raw) {
            Err(SchemaError::Malformed { location, .. }) => {
                assert_eq!(location, "mcpRules.mcp__ide__x")
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_repeated_top_level_key_is_malformed() {
        let raw = r#"{"rules": {"Read": {}}, "rules": {"Write": {}}}"#;
        assert!(matches!(
            Document::load(raw),
            Err(SchemaError::Malformed { .. })
        ));
    }

    #[test]
    fn test_numbers_keep_their_written_form() {
        let raw = "{\n  \"rules\": {},\n  \"weight\": 1.50\n}\n";
        assert_eq!(Document::load(raw).unwrap().to_json_string(), raw);
    }

    #[test]
    fn test_crlf_is_written_as_lf() {
        let doc = Document::load("{\r\n  \"rules\": {}\r\n}\r\n").unwrap();
        assert_eq!(doc.to_json_string(), "{\n  \"rules\": {}\n}\n");
    }

    #[test]
    fn test_empty_rule_name_is_malformed() {
        let result = Document::load(r#"{"rules": {"": {"default": "a"}}}"#);
        assert!(matches!(result, Err(SchemaError::Malformed { .. })));
    }

    #[test]
    fn test_add_capture_rejects_duplicates_without_change() {
        let mut doc = Document::load(SAMPLE).unwrap();
        let before = doc.clone();

        let result = doc.add_capture("Read", Capture::new("file_path"));
        assert_eq!(
            result,
            Err(SchemaError::DuplicateCapture {
                rule: "Read".into(),
                input_key: "file_path".into(),
            })
        );
        assert_eq!(doc, before);

        doc.add_capture("Read", Capture::new("filename").with_computed(true))
            .unwrap();
        let keys: Vec<_> = doc
            .get_rule("Read")
            .unwrap()
            .captures()
            .iter()
            .map(|c| c.input_key())
            .collect();
        assert_eq!(keys, vec!["file_path", "filename"]);
    }

    #[test]
    fn test_replace_captures_checks_uniqueness() {
        let mut doc = Document::load(SAMPLE).unwrap();
        let before = doc.clone();

        let result = doc.replace_captures(
            "Read",
            vec![Capture::new("file_path"), Capture::new("file_path")],
        );
        assert!(matches!(result, Err(SchemaError::DuplicateCapture { .. })));
        assert_eq!(doc, before);

        doc.replace_captures(
            "Bash",
            vec![Capture::new("command"), Capture::new("description")],
        )
        .unwrap();
        assert_eq!(doc.get_rule("Bash").unwrap().captures().len(), 2);
    }

    #[test]
    fn test_remove_capture() {
        let mut doc = Document::load(SAMPLE).unwrap();
        let removed = doc.remove_capture("Read", "file_path").unwrap();
        assert!(removed.is_some());
        assert!(doc.remove_capture("Read", "file_path").unwrap().is_none());
        assert!(doc.remove_capture("Nope", "file_path").is_err());
    }

    #[test]
    fn test_strip_all_capture_fields() {
        let mut doc = Document::load(SAMPLE).unwrap();
        assert_eq!(doc.strip_all_capture_fields(), 1);
        assert_eq!(doc.strip_all_capture_fields(), 0);

        let capture = doc
            .get_rule("mcp__serena__read_file")
            .unwrap()
            .capture("file_path")
            .unwrap();
        assert_eq!(capture.extra_fields().count(), 0);
        assert!(capture.parse_file_type());
    }

    #[test]
    fn test_relocate_moves_rules_unchanged() {
        let mut doc = Document::load(SAMPLE).unwrap();
        let rule = doc.get_rule("mcp__serena__read_file").unwrap().clone();

        doc.relocate(&["mcp__serena__read_file".into()], Section::McpRules)
            .unwrap();

        assert!(!doc.rules().contains("mcp__serena__read_file"));
        let moved = doc
            .mcp_rules()
            .and_then(|set| set.get("mcp__serena__read_file"))
            .unwrap();
        assert_eq!(moved, &rule);
        assert_eq!(
            doc.mcp_rules().unwrap().names().collect::<Vec<_>>(),
            vec!["mcp__ide__getDiagnostics", "mcp__serena__read_file"]
        );
    }

    #[test]
    fn test_relocate_is_all_or_nothing() {
        let mut doc = Document::load(SAMPLE).unwrap();
        let before = doc.clone();

        // The second name is already in the target section.
        let names = vec![
            "mcp__serena__read_file".to_string(),
            "mcp__ide__getDiagnostics".to_string(),
        ];
        let result = doc.relocate(&names, Section::McpRules);
        assert_eq!(
            result,
            Err(SchemaError::SectionConflict {
                name: "mcp__ide__getDiagnostics".into(),
                section: Section::McpRules,
            })
        );
        assert_eq!(doc, before);
    }

    #[test]
    fn test_relocate_creates_missing_section() {
        let mut doc = Document::new();
        doc.insert_rule(Section::Rules, "mcp__ide__executeCode", Rule::new("実行します"))
            .unwrap();
        assert!(!doc.has_section("mcpRules"));

        doc.relocate(&["mcp__ide__executeCode".into()], Section::McpRules)
            .unwrap();
        assert!(doc.has_section("mcpRules"));
        assert!(doc.rules().is_empty());
    }

    #[test]
    fn test_remove_section() {
        let mut doc = Document::load(SAMPLE).unwrap();

        assert!(doc.has_section("extensionTemplates"));
        assert!(doc.remove_section("extensionTemplates").unwrap().is_some());
        assert!(!doc.has_section("extensionTemplates"));
        assert!(doc.remove_section("extensionTemplates").unwrap().is_none());

        assert_eq!(
            doc.remove_section("rules"),
            Err(SchemaError::RequiredSection("rules".into()))
        );
        assert!(doc.remove_section("mcpRules").unwrap().is_some());
        assert!(doc.mcp_rules().is_none());
    }

    #[test]
    fn test_insert_rule_conflicts_across_sections() {
        let mut doc = Document::load(SAMPLE).unwrap();
        let result = doc.insert_rule(Section::McpRules, "Read", Rule::new("x"));
        assert_eq!(
            result,
            Err(SchemaError::SectionConflict {
                name: "Read".into(),
                section: Section::McpRules,
            })
        );
    }

    #[test]
    fn test_new_rules_are_appended() {
        let mut doc = Document::load(SAMPLE).unwrap();
        doc.insert_rule(Section::Rules, "NotebookEdit", Rule::new("編集します"))
            .unwrap();
        let names: Vec<_> = doc.rules().names().collect();
        assert_eq!(
            names,
            vec!["Read", "Bash", "mcp__serena__read_file", "NotebookEdit"]
        );
    }

    #[test]
    fn test_section_serde_names() {
        assert_eq!(serde_json::to_string(&Section::McpRules).unwrap(), "\"mcpRules\"");
        let section: Section = serde_json::from_str("\"rules\"").unwrap();
        assert_eq!(section, Section::Rules);
    }
}
