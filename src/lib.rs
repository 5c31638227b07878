//! # hivemap — mapping-driven Hive SQL generation
//!
//! > **Stop writing transform SQL. Map your data.**
//!
//! hivemap compiles a declarative field mapping (source JSON paths to target
//! relational columns) into a `CREATE TABLE ... AS SELECT` statement for
//! Hive, handling array/map flattening, type coercion, and tombstone-aware
//! value resolution.
//!
//! ## Quick Example
//!
//! ```
//! use hivemap::prelude::*;
//!
//! let rules = vec![MappingRule {
//!     target_table: "claimant".into(),
//!     target_field_name: "phone".into(),
//!     json_path: "$.contacts[*].phone".into(),
//!     source_type: MappingType::String,
//!     target_type: MappingType::String,
//!     function: String::new(),
//! }];
//!
//! let sql = hivemap::generate(
//!     "claimant",
//!     "staged_claimant",
//!     &rules,
//!     GeneratorOptions { removed_enabled: false },
//! )
//! .unwrap();
//!
//! assert_eq!(sql[0], "DROP TABLE IF EXISTS claimant");
//! assert!(sql[1].contains("LATERAL VIEW OUTER EXPLODE(`contacts`)"));
//! ```
//!
//! Generation is a pure function of its inputs: no I/O, no shared state, and
//! the rule list is never mutated. Executing the emitted statements (and
//! loading the rules in the first place) is the caller's business.

pub mod ast;
pub mod coerce;
pub mod error;
pub mod generator;
pub mod mapping;
pub mod path;
pub mod transpiler;

pub use generator::{GeneratorOptions, TransformTableGenerator};

pub mod prelude {
    pub use crate::error::{HivemapError, HivemapResult};
    pub use crate::generator::{GeneratorOptions, TransformTableGenerator};
    pub use crate::mapping::{MappingRule, MappingType};
    pub use crate::transpiler::ToSql;
}

/// Generate the transform statement pair for one target table.
///
/// Returns exactly two statements: a `DROP TABLE IF EXISTS` and the
/// `CREATE TABLE ... AS SELECT` built from the rules that name
/// `target_table`.
pub fn generate(
    target_table: &str,
    source_table: &str,
    rules: &[mapping::MappingRule],
    options: GeneratorOptions,
) -> error::HivemapResult<Vec<String>> {
    TransformTableGenerator::new(options).generate(target_table, source_table, rules)
}
