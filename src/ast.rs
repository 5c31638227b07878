//! Typed SQL nodes.
//!
//! The generator builds statements as an AST and renders text once at the
//! end, instead of splicing strings as it goes. Every transformation step
//! (coercion, function decoration, tombstone coalescing) produces a node, so
//! each is testable on its own.

use serde::{Deserialize, Serialize};

use crate::mapping::MappingType;

/// A SQL expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlExpr {
    /// Dotted column reference; each segment is backtick-quoted on render,
    /// with literal subscripts (`[0]`) kept outside the quotes.
    Column(String),
    /// Single-quoted string literal.
    Literal(String),
    /// Generic cast: `CAST(expr AS TYPE)`.
    Cast { expr: Box<SqlExpr>, ty: MappingType },
    /// First non-null value wins: `COALESCE(a, b, ...)`.
    Coalesce(Vec<SqlExpr>),
    /// Function decoration: `name(args)`.
    Call { name: String, args: Vec<SqlExpr> },
    /// JSON sub-key extraction: `GET_JSON_OBJECT(base, "$.path")`.
    JsonExtract { base: Box<SqlExpr>, path: String },
    /// Two-branch string-to-timestamp parse: UTC marker vs. hour offset,
    /// selected at SQL evaluation time.
    ParseTimestamp(Box<SqlExpr>),
    /// Case-insensitive token mapping to boolean, null-preserving.
    ParseBoolean(Box<SqlExpr>),
    /// 8-digit `yyyyMMdd` encoding to a date value.
    ParseDate(Box<SqlExpr>),
}

impl SqlExpr {
    /// Column reference from a dotted path.
    pub fn column(path: impl Into<String>) -> Self {
        SqlExpr::Column(path.into())
    }

    /// Coalesce a candidate list; a single candidate needs no wrapper.
    pub fn coalesce(mut exprs: Vec<SqlExpr>) -> Self {
        if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            SqlExpr::Coalesce(exprs)
        }
    }

    /// Wrap this expression in a function call.
    pub fn call(self, name: impl Into<String>) -> Self {
        SqlExpr::Call {
            name: name.into(),
            args: vec![self],
        }
    }

    /// Cast this expression to a target type.
    pub fn cast(self, ty: MappingType) -> Self {
        SqlExpr::Cast {
            expr: Box::new(self),
            ty,
        }
    }
}

/// One flattening requirement: a collection column exploded under an alias.
/// Deduplicated by alias before rendering, so an alias referenced by any
/// column appears exactly once in the statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplodeBinding {
    /// Alias the exploded elements are addressed through.
    pub alias: String,
    /// Dotted path of the collection column being exploded.
    pub base_path: String,
    /// Map bindings project `<alias>_key, <alias>_value`; array bindings
    /// project `<alias>`.
    pub is_map: bool,
}

/// One output column: `expr AS alias`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectColumn {
    pub expr: SqlExpr,
    /// Normalized target column identifier.
    pub alias: String,
}

/// The assembled `CREATE TABLE ... AS SELECT` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformStatement {
    /// Target table name, normalized on render.
    pub target_table: String,
    pub source_table: String,
    pub columns: Vec<SelectColumn>,
    pub views: Vec<ExplodeBinding>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coalesce_single_candidate_unwrapped() {
        let expr = SqlExpr::coalesce(vec![SqlExpr::column("a")]);
        assert_eq!(expr, SqlExpr::Column("a".into()));
    }

    #[test]
    fn test_coalesce_wraps_multiple() {
        let expr = SqlExpr::coalesce(vec![SqlExpr::column("a"), SqlExpr::column("b")]);
        assert!(matches!(expr, SqlExpr::Coalesce(ref v) if v.len() == 2));
    }

    #[test]
    fn test_call_builder() {
        let expr = SqlExpr::column("tags").call("size");
        assert_eq!(
            expr,
            SqlExpr::Call {
                name: "size".into(),
                args: vec![SqlExpr::Column("tags".into())],
            }
        );
    }
}
