//! # Narrator Migrate
//!
//! Schema migrations for narrator rule documents. Operations are composed
//! into plans, and the [`Migrator`] folds plans over a document as a single
//! all-or-nothing run.
//!
//! ## Core Components
//!
//! - **operation**: the individual document transformations
//! - **matcher**: selects rules by name for bulk operations
//! - **plan**: named step lists, parsed from TOML or built in
//! - **engine**: runs plans and checks the result
//! - **store**: atomic reads and writes of documents on disk
//!
//! ```
//! use narrator_migrate::{Migration, MigrationPlan, Migrator, RuleMatcher};
//! use narrator_rules::{Document, Section};
//!
//! let doc = Document::load(r#"{"rules": {"mcp__ide__getDiagnostics": {"default": "診断を取得します"}}}"#)?;
//! let plan = MigrationPlan::new("ide").with_step(Migration::RelocateRules {
//!     matcher: RuleMatcher::prefix("mcp__ide__"),
//!     target: Section::McpRules,
//! });
//!
//! let report = Migrator::with_defaults().run(&[plan], &doc)?;
//! assert_eq!(report.document.locate("mcp__ide__getDiagnostics"), Some(Section::McpRules));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod error;
pub mod matcher;
pub mod operation;
pub mod plan;
pub mod settings;
pub mod store;

pub use engine::*;
pub use error::*;
pub use matcher::*;
pub use operation::*;
pub use plan::*;
pub use settings::*;
pub use store::{read_document, write_document};
