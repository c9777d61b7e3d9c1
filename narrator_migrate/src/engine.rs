//! The migration engine - folds plans over a document as one unit.
//!
//! A run works on a private copy of the input:
//! 1. **Fold**: apply every step of every plan in order
//! 2. **Abort**: on the first failure, return the error and drop the copy
//! 3. **Check templates**: validate templates set during the run
//! 4. **Validate**: re-check the document invariants
//!
//! The input document is never modified, so a failed run has nothing to undo
//! and nothing half-migrated can reach storage.

use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use narrator_rules::Document;

use crate::{MigrateSettings, MigrationError, MigrationPlan, StepOutcome, TemplatePolicy};

/// Result of one applied step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub plan: String,
    /// 1-based position within the plan.
    pub index: usize,
    pub label: String,
    pub outcome: StepOutcome,
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct MigrationReport {
    /// The migrated document.
    pub document: Document,
    pub steps: Vec<StepRecord>,
    /// Rules whose templates have unsatisfied placeholders, tolerated under
    /// the permissive policy.
    pub template_warnings: Vec<(String, Vec<String>)>,
}

impl MigrationReport {
    /// Check if any step modified the document.
    pub fn changed(&self) -> bool {
        self.steps.iter().any(|step| step.outcome.changed())
    }

    /// Names of every rule relocated during the run, in order.
    pub fn relocated(&self) -> Vec<&str> {
        self.steps
            .iter()
            .flat_map(|step| match &step.outcome {
                StepOutcome::Relocated { names, .. } => names.as_slice(),
                _ => &[],
            })
            .map(String::as_str)
            .collect()
    }
}

/// Runs migration plans against documents.
pub struct Migrator {
    settings: MigrateSettings,
}

impl Migrator {
    /// Create a migrator with the given settings.
    pub fn new(settings: MigrateSettings) -> Self {
        Self { settings }
    }

    /// Create a migrator with default settings.
    pub fn with_defaults() -> Self {
        Self::new(MigrateSettings::default())
    }

    pub fn settings(&self) -> &MigrateSettings {
        &self.settings
    }

    /// Apply `plans` in order to a copy of `document`.
    pub fn run(
        &self,
        plans: &[MigrationPlan],
        document: &Document,
    ) -> Result<MigrationReport, MigrationError> {
        let mut working = document.clone();
        let mut steps = Vec::new();
        let mut templated = BTreeSet::new();

        for plan in plans {
            info!(plan = %plan.name, steps = plan.steps.len(), "applying migration plan");

            for (i, step) in plan.steps.iter().enumerate() {
                let index = i + 1;
                let label = step.to_string();

                let outcome = step
                    .apply(&mut working)
                    .map_err(|source| MigrationError::Step {
                        plan: plan.name.clone(),
                        index,
                        label: label.clone(),
                        source: Box::new(source),
                    })?;
                debug!(plan = %plan.name, index, step = %label, %outcome, "step done");

                if let Some(rule) = step.template_target() {
                    templated.insert(rule.to_string());
                }
                steps.push(StepRecord {
                    plan: plan.name.clone(),
                    index,
                    label,
                    outcome,
                });
            }
        }

        let template_warnings = self.check_templates(&working, &templated)?;
        working.validate()?;

        let report = MigrationReport {
            document: working,
            steps,
            template_warnings,
        };
        info!(
            steps = report.steps.len(),
            changed = report.changed(),
            "migration run complete"
        );
        Ok(report)
    }

    /// Check templates of the given rules against their final captures.
    ///
    /// Rules removed later in the run have nothing left to check.
    fn check_templates(
        &self,
        document: &Document,
        rules: &BTreeSet<String>,
    ) -> Result<Vec<(String, Vec<String>)>, MigrationError> {
        let mut warnings = Vec::new();

        for name in rules {
            let Ok(rule) = document.get_rule(name) else {
                debug!(rule = %name, "templated rule removed during run");
                continue;
            };
            let missing = rule.unsatisfied_placeholders(&self.settings.literal_fields);
            if missing.is_empty() {
                continue;
            }
            match self.settings.template_policy {
                TemplatePolicy::Strict => {
                    return Err(MigrationError::UnsatisfiedPlaceholders {
                        rule: name.clone(),
                        placeholders: missing,
                    });
                }
                TemplatePolicy::Permissive => {
                    warn!(rule = %name, placeholders = ?missing, "template has unsatisfied placeholders");
                    warnings.push((name.clone(), missing));
                }
            }
        }

        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Migration, RuleMatcher};
    use narrator_rules::{Capture, SchemaError, Section};

    const DOC: &str = r#"{
  "rules": {
    "Read": {
      "default": "ファイルを読み込みます",
      "captures": [
        {
          "inputKey": "file_path"
        }
      ]
    },
    "Write": {
      "default": "ファイルを作成します"
    },
    "mcp__serena__read_file": {
      "default": "{file_path}を読み込みます",
      "captures": [
        {
          "inputKey": "file_path",
          "placeholder": "{file_path}"
        }
      ]
    }
  },
  "extensionTemplates": {
    ".py": "Pythonファイル"
  }
}"#;

    fn doc() -> Document {
        Document::load(DOC).unwrap()
    }

    fn add_filename() -> Migration {
        Migration::AddCapture {
            rule: "Read".into(),
            capture: Capture::new("filename").with_computed(true),
        }
    }

    #[test]
    fn test_add_capture_scenario() {
        let plan = MigrationPlan::new("filename").with_step(add_filename());
        let report = Migrator::with_defaults().run(&[plan], &doc()).unwrap();

        let read = report.document.get_rule("Read").unwrap();
        assert_eq!(read.captures().len(), 2);
        assert_eq!(read.captures()[1].input_key(), "filename");
        assert!(report.changed());
    }

    #[test]
    fn test_failed_step_leaves_input_untouched() {
        let input = doc();
        let before = input.to_json_string();

        let plan = MigrationPlan::new("broken")
            .with_step(Migration::DropSection {
                section: "extensionTemplates".into(),
            })
            .with_step(add_filename())
            .with_step(Migration::AddCapture {
                rule: "Read".into(),
                capture: Capture::new("file_path"),
            });

        let err = Migrator::with_defaults().run(&[plan], &input).unwrap_err();
        match &err {
            MigrationError::Step { index, .. } => assert_eq!(*index, 3),
            other => panic!("expected step failure, got {other:?}"),
        }
        assert!(matches!(
            err.root_cause(),
            MigrationError::Schema(SchemaError::DuplicateCapture { .. })
        ));
        assert_eq!(input.to_json_string(), before);
    }

    #[test]
    fn test_failure_in_later_plan_aborts_whole_run() {
        let first = MigrationPlan::new("first").with_step(add_filename());
        let second = MigrationPlan::new("second").with_step(Migration::SetDefaultTemplate {
            rule: "Glob".into(),
            template: "検索します".into(),
        });

        let err = Migrator::with_defaults()
            .run(&[first, second], &doc())
            .unwrap_err();
        assert!(matches!(err, MigrationError::Step { ref plan, .. } if plan == "second"));
    }

    #[test]
    fn test_relocation_is_reported() {
        let plan = MigrationPlan::new("mcp").with_step(Migration::RelocateRules {
            matcher: RuleMatcher::prefix("mcp__serena__"),
            target: Section::McpRules,
        });
        let report = Migrator::with_defaults().run(&[plan], &doc()).unwrap();

        assert_eq!(report.relocated(), vec!["mcp__serena__read_file"]);
        assert_eq!(
            report.document.locate("mcp__serena__read_file"),
            Some(Section::McpRules)
        );
    }

    #[test]
    fn test_no_match_is_distinct_from_relocation() {
        let plan = MigrationPlan::new("ide").with_step(Migration::RelocateRules {
            matcher: RuleMatcher::prefix("mcp__ide__"),
            target: Section::McpRules,
        });
        let report = Migrator::with_defaults().run(&[plan], &doc()).unwrap();

        assert_eq!(report.steps[0].outcome, StepOutcome::NoMatch);
        assert!(report.relocated().is_empty());
        assert!(!report.changed());
    }

    #[test]
    fn test_strict_policy_rejects_unsatisfied_template() {
        let plan = MigrationPlan::new("templates").with_step(Migration::SetDefaultTemplate {
            rule: "Write".into(),
            template: "{filetype}「{filename}」を作成します".into(),
        });

        let err = Migrator::with_defaults().run(&[plan], &doc()).unwrap_err();
        match err {
            MigrationError::UnsatisfiedPlaceholders { rule, placeholders } => {
                assert_eq!(rule, "Write");
                assert_eq!(placeholders, vec!["filetype", "filename"]);
            }
            other => panic!("expected unsatisfied placeholders, got {other:?}"),
        }
    }

    #[test]
    fn test_template_may_precede_its_captures() {
        let plan = MigrationPlan::new("templates")
            .with_step(Migration::SetDefaultTemplate {
                rule: "Write".into(),
                template: "{filetype}「{filename}」を作成します".into(),
            })
            .with_step(Migration::AddCapture {
                rule: "Write".into(),
                capture: Capture::new("file_path").with_parse_file_type(true),
            });

        let report = Migrator::with_defaults().run(&[plan], &doc()).unwrap();
        assert!(report.template_warnings.is_empty());
    }

    #[test]
    fn test_templated_rule_removed_later() {
        let plan = MigrationPlan::new("cleanup")
            .with_step(Migration::SetDefaultTemplate {
                rule: "mcp__serena__read_file".into(),
                template: "{mode}で読み込みます".into(),
            })
            .with_step(Migration::RemoveRules {
                matcher: RuleMatcher::prefix("mcp__serena__"),
            });

        let report = Migrator::with_defaults().run(&[plan], &doc()).unwrap();
        assert!(report.document.locate("mcp__serena__read_file").is_none());
        assert!(report.template_warnings.is_empty());
    }

    #[test]
    fn test_templated_rule_dropped_with_section() {
        let plan = MigrationPlan::new("cleanup")
            .with_step(Migration::RelocateRules {
                matcher: RuleMatcher::prefix("mcp__serena__"),
                target: Section::McpRules,
            })
            .with_step(Migration::SetDefaultTemplate {
                rule: "mcp__serena__read_file".into(),
                template: "{mode}で読み込みます".into(),
            })
            .with_step(Migration::DropSection {
                section: "mcpRules".into(),
            });

        let report = Migrator::with_defaults().run(&[plan], &doc()).unwrap();
        assert!(report.document.mcp_rules().is_none());
        assert!(report.changed());
    }

    #[test]
    fn test_permissive_policy_warns() {
        let settings = MigrateSettings {
            template_policy: TemplatePolicy::Permissive,
            ..MigrateSettings::default()
        };
        let plan = MigrationPlan::new("templates").with_step(Migration::SetDefaultTemplate {
            rule: "Read".into(),
            template: "{mode}で読み込みます".into(),
        });

        let report = Migrator::new(settings).run(&[plan], &doc()).unwrap();
        assert_eq!(
            report.template_warnings,
            vec![("Read".to_string(), vec!["mode".to_string()])]
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let plans = vec![
            MigrationPlan::new("a")
                .with_step(Migration::StripCaptureFields { rule: None })
                .with_step(Migration::DropSection {
                    section: "extensionTemplates".into(),
                }),
            MigrationPlan::new("b")
                .with_step(Migration::StripCaptureFields { rule: None })
                .with_step(Migration::DropSection {
                    section: "extensionTemplates".into(),
                }),
        ];
        let migrator = Migrator::with_defaults();

        let once = migrator.run(&plans[..1], &doc()).unwrap();
        let twice = migrator.run(&plans, &doc()).unwrap();
        assert_eq!(
            once.document.to_json_string(),
            twice.document.to_json_string()
        );
        assert!(!twice.steps[2].outcome.changed());
        assert!(!twice.steps[3].outcome.changed());
    }
}
