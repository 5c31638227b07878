//! The mapping model: rule records as an external loader supplies them.
//!
//! One rule binds one source JSON path to one target column. The loader that
//! produces rules (catalog, file, UI) lives outside this crate; only the read
//! contract is defined here.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::HivemapError;

/// The closed set of primitive kinds a mapping may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    String,
    Int,
    Boolean,
    Timestamp,
    Date,
}

impl MappingType {
    /// The Hive type name used in generated `CAST` expressions.
    pub fn hive_name(&self) -> &'static str {
        match self {
            MappingType::String => "STRING",
            MappingType::Int => "INT",
            MappingType::Boolean => "BOOLEAN",
            MappingType::Timestamp => "TIMESTAMP",
            MappingType::Date => "DATE",
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hive_name())
    }
}

impl FromStr for MappingType {
    type Err = HivemapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "string" => Ok(MappingType::String),
            "int" | "integer" => Ok(MappingType::Int),
            "boolean" | "bool" => Ok(MappingType::Boolean),
            "timestamp" => Ok(MappingType::Timestamp),
            "date" => Ok(MappingType::Date),
            other => Err(HivemapError::InvalidType(other.to_string())),
        }
    }
}

/// One source-path-to-target-column binding. Immutable once loaded.
///
/// Multiple rules may share a target column (multi-source fallback) or a raw
/// source path (several sub-extractions from one JSON blob).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Table the column belongs to.
    pub target_table: String,
    /// Output column name (normalized before it is emitted).
    pub target_field_name: String,
    /// Source path, e.g. `$.contacts[*].phone`.
    pub json_path: String,
    pub source_type: MappingType,
    pub target_type: MappingType,
    /// Hive function wrapped around the column expression; empty = none.
    #[serde(default)]
    pub function: String,
}

impl MappingRule {
    pub fn has_function(&self) -> bool {
        !self.function.is_empty()
    }
}

/// Group rules by the target column they feed, preserving encounter order.
///
/// Every rule lands in exactly one group; the group order drives the column
/// order of the generated statement.
pub fn group_by_target_column<'a>(
    rules: impl IntoIterator<Item = &'a MappingRule>,
) -> IndexMap<&'a str, Vec<&'a MappingRule>> {
    let mut groups: IndexMap<&str, Vec<&MappingRule>> = IndexMap::new();
    for rule in rules {
        groups
            .entry(rule.target_field_name.as_str())
            .or_default()
            .push(rule);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(field: &str, path: &str) -> MappingRule {
        MappingRule {
            target_table: "t".into(),
            target_field_name: field.into(),
            json_path: path.into(),
            source_type: MappingType::String,
            target_type: MappingType::String,
            function: String::new(),
        }
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("string".parse::<MappingType>().unwrap(), MappingType::String);
        assert_eq!("Boolean".parse::<MappingType>().unwrap(), MappingType::Boolean);
        assert_eq!("DATE".parse::<MappingType>().unwrap(), MappingType::Date);
        assert!("decimal".parse::<MappingType>().is_err());
    }

    #[test]
    fn test_hive_names() {
        assert_eq!(MappingType::Timestamp.hive_name(), "TIMESTAMP");
        assert_eq!(MappingType::Int.to_string(), "INT");
    }

    #[test]
    fn test_group_by_target_preserves_encounter_order() {
        let rules = vec![
            rule("b", "$.x"),
            rule("a", "$.y"),
            rule("b", "$.z"),
        ];
        let groups = group_by_target_column(&rules);
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(groups["b"].len(), 2);
        assert_eq!(groups["a"].len(), 1);
    }

    #[test]
    fn test_rule_deserializes_from_loader_json() {
        let rule: MappingRule = serde_json::from_str(
            r#"{
                "target_table": "claimant",
                "target_field_name": "dob",
                "json_path": "$.dateOfBirth",
                "source_type": "string",
                "target_type": "date"
            }"#,
        )
        .unwrap();
        assert_eq!(rule.target_type, MappingType::Date);
        assert!(!rule.has_function());
    }
}
