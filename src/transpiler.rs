//! Hive SQL rendering for the typed AST.
//!
//! The dialect tokens here (`GET_JSON_OBJECT`, `LATERAL VIEW OUTER EXPLODE`,
//! backtick quoting, `CAST(x AS T)`) are fixed: downstream execution expects
//! them verbatim.

use crate::ast::{ExplodeBinding, SelectColumn, SqlExpr, TransformStatement};
use crate::path::normalize_object_name;

/// Trait for converting AST nodes to SQL text.
pub trait ToSql {
    /// Render this node as a Hive SQL fragment.
    fn to_sql(&self) -> String;
}

/// Backtick-quote a single identifier. A literal subscript suffix
/// (`items[0]`) stays outside the quotes, which is the form Hive accepts for
/// subscripted access.
pub fn quote_identifier(name: &str) -> String {
    match name.find('[') {
        Some(at) => format!("`{}`{}", &name[..at], &name[at..]),
        None => format!("`{}`", name),
    }
}

/// Backtick-quote a dotted column path, one identifier per segment:
/// `_removed.claimant.nino` becomes `` `_removed`.`claimant`.`nino` ``.
pub fn quote_path(path: &str) -> String {
    path.split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

impl ToSql for SqlExpr {
    fn to_sql(&self) -> String {
        match self {
            SqlExpr::Column(path) => quote_path(path),
            SqlExpr::Literal(text) => format!("'{}'", text.replace('\'', "''")),
            SqlExpr::Cast { expr, ty } => {
                format!("CAST({} AS {})", expr.to_sql(), ty.hive_name())
            }
            SqlExpr::Coalesce(exprs) => {
                let parts: Vec<String> = exprs.iter().map(ToSql::to_sql).collect();
                format!("COALESCE({})", parts.join(", "))
            }
            SqlExpr::Call { name, args } => {
                let parts: Vec<String> = args.iter().map(ToSql::to_sql).collect();
                format!("{}({})", name, parts.join(", "))
            }
            SqlExpr::JsonExtract { base, path } => {
                format!("GET_JSON_OBJECT({}, \"$.{}\")", base.to_sql(), path)
            }
            SqlExpr::ParseTimestamp(expr) => {
                let x = expr.to_sql();
                format!(
                    "CASE WHEN SUBSTRING({x}, LENGTH({x}), 1) = 'Z' \
                     THEN CAST(CONCAT(SUBSTR({x}, 1, 10), ' ', SUBSTR({x}, 12, 12)) AS TIMESTAMP) \
                     ELSE CAST(CONCAT(FROM_UNIXTIME(UNIX_TIMESTAMP(CAST(CONCAT(SUBSTR({x}, 1, 10), ' ', SUBSTR({x}, 12, 8)) AS TIMESTAMP)) - \
                     (CAST(SUBSTR({x}, 25, 2) AS BIGINT) * 3600),'yyyy-MM-dd HH:mm:ss'),'.', SUBSTR({x}, 21, 3)) AS TIMESTAMP) END"
                )
            }
            SqlExpr::ParseBoolean(expr) => {
                let x = expr.to_sql();
                format!(
                    "CASE WHEN UPPER({x}) IN ('FALSE', 'NO', 'N', '0') THEN false \
                     WHEN {x} IS NULL THEN NULL ELSE true END"
                )
            }
            SqlExpr::ParseDate(expr) => {
                let x = expr.to_sql();
                format!(
                    "CAST(TO_DATE(FROM_UNIXTIME(UNIX_TIMESTAMP(CAST({x} AS STRING), 'yyyyMMdd'))) AS DATE)"
                )
            }
        }
    }
}

impl ToSql for ExplodeBinding {
    fn to_sql(&self) -> String {
        if self.is_map {
            format!(
                "LATERAL VIEW OUTER EXPLODE({}) view_{} AS {}_key, {}_value",
                quote_path(&self.base_path),
                self.alias,
                self.alias,
                self.alias
            )
        } else {
            format!(
                "LATERAL VIEW OUTER EXPLODE({}) view_{} AS {}",
                quote_path(&self.base_path),
                self.alias,
                self.alias
            )
        }
    }
}

impl ToSql for SelectColumn {
    fn to_sql(&self) -> String {
        format!("{} AS {}", self.expr.to_sql(), quote_identifier(&self.alias))
    }
}

impl ToSql for TransformStatement {
    fn to_sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(ToSql::to_sql).collect();
        let mut sql = format!(
            "CREATE TABLE {} AS SELECT\n  {}\nFROM {}",
            normalize_object_name(&self.target_table),
            columns.join(",\n  "),
            self.source_table
        );
        for view in &self.views {
            sql.push('\n');
            sql.push_str(&view.to_sql());
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingType;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_path() {
        assert_eq!(quote_path("name"), "`name`");
        assert_eq!(quote_path("_removed.name"), "`_removed`.`name`");
        assert_eq!(quote_path("exploded_contacts.phone"), "`exploded_contacts`.`phone`");
    }

    #[test]
    fn test_quote_subscripted_segment() {
        assert_eq!(quote_path("addresses[0].postcode"), "`addresses`[0].`postcode`");
    }

    #[test]
    fn test_literal_escapes_quotes() {
        assert_eq!(SqlExpr::Literal("it's".into()).to_sql(), "'it''s'");
    }

    #[test]
    fn test_cast_render() {
        let expr = SqlExpr::column("age").cast(MappingType::Int);
        assert_eq!(expr.to_sql(), "CAST(`age` AS INT)");
    }

    #[test]
    fn test_coalesce_render() {
        let expr = SqlExpr::Coalesce(vec![
            SqlExpr::column("_removed.name"),
            SqlExpr::column("name"),
        ]);
        assert_eq!(expr.to_sql(), "COALESCE(`_removed`.`name`, `name`)");
    }

    #[test]
    fn test_call_render() {
        let expr = SqlExpr::column("tags").call("size");
        assert_eq!(expr.to_sql(), "size(`tags`)");
    }

    #[test]
    fn test_json_extract_render() {
        let expr = SqlExpr::JsonExtract {
            base: Box::new(SqlExpr::column("obj")),
            path: "a.b".into(),
        };
        assert_eq!(expr.to_sql(), "GET_JSON_OBJECT(`obj`, \"$.a.b\")");
    }

    #[test]
    fn test_parse_boolean_render() {
        let expr = SqlExpr::ParseBoolean(Box::new(SqlExpr::column("flag")));
        assert_eq!(
            expr.to_sql(),
            "CASE WHEN UPPER(`flag`) IN ('FALSE', 'NO', 'N', '0') THEN false \
             WHEN `flag` IS NULL THEN NULL ELSE true END"
        );
    }

    #[test]
    fn test_parse_date_render() {
        let expr = SqlExpr::ParseDate(Box::new(SqlExpr::column("dob")));
        assert_eq!(
            expr.to_sql(),
            "CAST(TO_DATE(FROM_UNIXTIME(UNIX_TIMESTAMP(CAST(`dob` AS STRING), 'yyyyMMdd'))) AS DATE)"
        );
    }

    #[test]
    fn test_parse_timestamp_has_both_branches() {
        let sql = SqlExpr::ParseTimestamp(Box::new(SqlExpr::column("ts"))).to_sql();
        assert!(sql.contains("= 'Z' THEN CAST(CONCAT(SUBSTR(`ts`, 1, 10)"));
        assert!(sql.contains("CAST(SUBSTR(`ts`, 25, 2) AS BIGINT) * 3600"));
        assert!(sql.contains("SUBSTR(`ts`, 21, 3)) AS TIMESTAMP) END"));
    }

    #[test]
    fn test_array_lateral_view_render() {
        let view = ExplodeBinding {
            alias: "exploded_items".into(),
            base_path: "items".into(),
            is_map: false,
        };
        assert_eq!(
            view.to_sql(),
            "LATERAL VIEW OUTER EXPLODE(`items`) view_exploded_items AS exploded_items"
        );
    }

    #[test]
    fn test_map_lateral_view_render() {
        let view = ExplodeBinding {
            alias: "exploded_attributes".into(),
            base_path: "_removed.attributes".into(),
            is_map: true,
        };
        assert_eq!(
            view.to_sql(),
            "LATERAL VIEW OUTER EXPLODE(`_removed`.`attributes`) view_exploded_attributes \
             AS exploded_attributes_key, exploded_attributes_value"
        );
    }

    #[test]
    fn test_statement_render_normalizes_target() {
        let stmt = TransformStatement {
            target_table: "Claimant Details".into(),
            source_table: "src".into(),
            columns: vec![SelectColumn {
                expr: SqlExpr::column("name"),
                alias: "name".into(),
            }],
            views: vec![],
        };
        assert_eq!(
            stmt.to_sql(),
            "CREATE TABLE claimant_details AS SELECT\n  `name` AS `name`\nFROM src"
        );
    }
}
