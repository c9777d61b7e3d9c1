//! narrator-migrate CLI: apply migration plans to a rule document.
//!
//! Logging: set `RUST_LOG=narrator_migrate=debug` to see every step on stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use narrator_migrate::{
    read_document, write_document, MigrateSettings, MigrationPlan, Migrator, TemplatePolicy,
};

#[derive(Parser, Debug)]
#[command(
    name = "narrator-migrate",
    about = "Schema migrations for narrator rule documents",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply migration plans to a document and store the result.
    Apply {
        /// Rule document to migrate.
        document: PathBuf,
        /// Plan file to apply (repeatable, applied in order).
        #[arg(long = "plan", value_name = "FILE")]
        plans: Vec<PathBuf>,
        /// Built-in plan to apply after plan files (repeatable).
        #[arg(long = "builtin", value_name = "NAME")]
        builtins: Vec<String>,
        /// Write the result here instead of over the input.
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
        /// Print the migrated document instead of storing it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Settings file (TOML).
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
        /// Log unsatisfied template placeholders instead of failing.
        #[arg(long, default_value_t = false)]
        permissive: bool,
    },
    /// Validate a document and report templates nothing fills.
    Check {
        document: PathBuf,
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },
    /// List built-in plans.
    Plans,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("narrator_migrate=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Command::Apply {
            document,
            plans,
            builtins,
            output,
            dry_run,
            settings,
            permissive,
        } => {
            let mut settings = load_settings(settings.as_deref())?;
            if permissive {
                settings.template_policy = TemplatePolicy::Permissive;
            }
            let plans = collect_plans(&plans, &builtins)?;
            apply(&document, &plans, output.as_deref(), dry_run, settings)
        }
        Command::Check { document, settings } => {
            check(&document, load_settings(settings.as_deref())?)
        }
        Command::Plans => list_plans(),
    }
}

fn load_settings(path: Option<&Path>) -> Result<MigrateSettings> {
    MigrateSettings::load(path).context("failed to load settings")
}

/// Plan files first, then built-ins, each in the order given.
fn collect_plans(files: &[PathBuf], builtins: &[String]) -> Result<Vec<MigrationPlan>> {
    let mut plans = Vec::with_capacity(files.len() + builtins.len());
    for path in files {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read plan {}", path.display()))?;
        let plan = MigrationPlan::from_toml_str(&raw)
            .with_context(|| format!("failed to parse plan {}", path.display()))?;
        plans.push(plan);
    }
    for name in builtins {
        plans.push(MigrationPlan::builtin(name)?);
    }
    if plans.is_empty() {
        anyhow::bail!("no plans given; use --plan FILE or --builtin NAME");
    }
    Ok(plans)
}

fn apply(
    document: &Path,
    plans: &[MigrationPlan],
    output: Option<&Path>,
    dry_run: bool,
    settings: MigrateSettings,
) -> Result<()> {
    let doc = read_document(document)?;
    let report = Migrator::new(settings)
        .run(plans, &doc)
        .with_context(|| format!("migration of {} aborted", document.display()))?;

    for step in &report.steps {
        eprintln!("{} #{} {}: {}", step.plan, step.index, step.label, step.outcome);
    }

    if dry_run {
        print!("{}", report.document.to_json_string());
        return Ok(());
    }
    if !report.changed() && output.is_none() {
        info!(path = %document.display(), "document already up to date");
        return Ok(());
    }

    let target = output.unwrap_or(document);
    write_document(target, &report.document)?;
    info!(path = %target.display(), "stored migrated document");
    Ok(())
}

fn check(document: &Path, settings: MigrateSettings) -> Result<()> {
    let doc = read_document(document)?;

    let mut problems = 0;
    for (section, name, rule) in doc.all_rules() {
        let missing = rule.unsatisfied_placeholders(&settings.literal_fields);
        if !missing.is_empty() {
            problems += 1;
            println!("{section}.{name}: unsatisfied {}", missing.join(", "));
        }
    }
    info!(
        path = %document.display(),
        rules = doc.all_rules().count(),
        problems,
        "document is well formed"
    );
    Ok(())
}

fn list_plans() -> Result<()> {
    for name in MigrationPlan::builtin_names() {
        let plan = MigrationPlan::builtin(name)?;
        println!(
            "{name:<24} {}",
            plan.description.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}
