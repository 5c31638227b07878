//! Type coercion: declared source type to declared target type.
//!
//! Each supported pair maps to a dedicated AST node; everything else falls
//! through to a generic cast. The fallback is deliberate and logged: an
//! unsupported pair is deferred to SQL execution time, never rejected here.

use tracing::warn;

use crate::ast::SqlExpr;
use crate::mapping::MappingType;

/// Wrap `expr` so it evaluates to the target type.
///
/// Identical types pass through untouched. A user function also passes
/// through: the function is trusted to manage its own output type (for
/// example `size(array<string>)` already yields an integer).
pub fn coerce(
    source: MappingType,
    target: MappingType,
    has_function: bool,
    expr: SqlExpr,
) -> SqlExpr {
    if source == target {
        return expr;
    }
    if has_function {
        return expr;
    }
    match (source, target) {
        (MappingType::String, MappingType::Timestamp) => SqlExpr::ParseTimestamp(Box::new(expr)),
        (MappingType::String, MappingType::Boolean) => SqlExpr::ParseBoolean(Box::new(expr)),
        (MappingType::Int | MappingType::String, MappingType::Date) => {
            SqlExpr::ParseDate(Box::new(expr))
        }
        (source, target) => {
            warn!(
                %source,
                %target,
                "no conversion rule for this type pair; emitting a generic cast that may fail at execution time"
            );
            expr.cast(target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transpiler::ToSql;

    #[test]
    fn test_identity_law() {
        let expr = coerce(
            MappingType::String,
            MappingType::String,
            false,
            SqlExpr::column("name"),
        );
        assert_eq!(expr, SqlExpr::column("name"));
    }

    #[test]
    fn test_function_bypasses_conversion() {
        let expr = coerce(
            MappingType::String,
            MappingType::Int,
            true,
            SqlExpr::column("tags"),
        );
        assert_eq!(expr, SqlExpr::column("tags"));
    }

    #[test]
    fn test_string_to_timestamp() {
        let expr = coerce(
            MappingType::String,
            MappingType::Timestamp,
            false,
            SqlExpr::column("ts"),
        );
        assert!(matches!(expr, SqlExpr::ParseTimestamp(_)));
    }

    #[test]
    fn test_string_to_boolean() {
        let expr = coerce(
            MappingType::String,
            MappingType::Boolean,
            false,
            SqlExpr::column("flag"),
        );
        assert!(matches!(expr, SqlExpr::ParseBoolean(_)));
    }

    #[test]
    fn test_int_and_string_to_date() {
        for source in [MappingType::Int, MappingType::String] {
            let expr = coerce(source, MappingType::Date, false, SqlExpr::column("dob"));
            assert!(matches!(expr, SqlExpr::ParseDate(_)));
        }
    }

    #[test]
    fn test_fallback_generic_cast() {
        let expr = coerce(
            MappingType::Boolean,
            MappingType::Int,
            false,
            SqlExpr::column("flag"),
        );
        assert_eq!(expr.to_sql(), "CAST(`flag` AS INT)");
    }
}
