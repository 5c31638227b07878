//! Transform table generation.
//!
//! Compiles the mapping rules for one target table into a pair of
//! statements: `DROP TABLE IF EXISTS` and `CREATE TABLE ... AS SELECT`.
//! All grouping and deduplication state is built fresh per call; the
//! generator holds nothing but its options and never mutates its input.

use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{ExplodeBinding, SelectColumn, SqlExpr, TransformStatement};
use crate::coerce::coerce;
use crate::error::{HivemapError, HivemapResult};
use crate::mapping::{MappingRule, group_by_target_column};
use crate::path::{
    self, MapAccess, PathSplit, compare_paths_desc, normalize_object_name, segment_count,
    strip_root, sub_path,
};
use crate::transpiler::ToSql;

/// Prefix of the tombstone shadow namespace. A `_removed.` field holds the
/// prior or deleted version of a value and takes precedence over live data.
const REMOVED: &str = "_removed.";

/// Generator configuration, threaded explicitly rather than held as shared
/// mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Consult the `_removed.` shadow namespace and prefer it over the live
    /// value wherever present.
    pub removed_enabled: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            removed_enabled: true,
        }
    }
}

/// How one rule reads from the source table: the select path, plus the
/// explode binding it requires, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSource {
    /// Dotted path the select expression addresses.
    pub select_path: String,
    /// Set only when flattening is required for this rule.
    pub explode_alias: Option<String>,
    /// The collection path backing `explode_alias`.
    pub base_path: Option<String>,
    pub split: PathSplit,
}

/// Resolve a rule into its column source.
///
/// Paths without a marker select their own column. Marked paths select
/// through the explode alias; map paths route through the `_key` / `_value`
/// projections the lateral view emits. A rule whose function consumes the
/// whole collection (marker, empty remainder, function present) bypasses the
/// alias and reads the un-exploded column, producing no binding.
pub fn resolve(rule: &MappingRule) -> HivemapResult<ColumnSource> {
    let split = path::analyze(&rule.json_path)?;

    if !split.index_operator_found {
        return Ok(ColumnSource {
            select_path: split.left_path.clone(),
            explode_alias: None,
            base_path: None,
            split,
        });
    }

    if split.right_path.is_empty() && rule.has_function() {
        // e.g. size($.items[*]): the function must see the whole collection
        return Ok(ColumnSource {
            select_path: split.left_path.clone(),
            explode_alias: None,
            base_path: None,
            split,
        });
    }

    let alias = format!("exploded_{}", normalize_object_name(&split.left_path));

    Ok(ColumnSource {
        select_path: alias_select_path(&alias, &split),
        explode_alias: Some(alias),
        base_path: Some(split.left_path.clone()),
        split,
    })
}

/// The path a rule selects through a given explode alias: the alias itself,
/// the alias plus the remainder, or the map key/value projection.
fn alias_select_path(alias: &str, split: &PathSplit) -> String {
    match split.map_access {
        None if split.right_path.is_empty() => alias.to_string(),
        None => format!("{}.{}", alias, split.right_path),
        Some(MapAccess::Key) => format!("{}_key", alias),
        Some(MapAccess::Value) if split.right_path.is_empty() => format!("{}_value", alias),
        Some(MapAccess::Value) => format!("{}_value.{}", alias, split.right_path),
    }
}

/// Select path of the tombstone-shadow counterpart of a column source.
/// Rebuilt from the split rather than textual substitution, so only the
/// alias changes even when a remainder segment repeats the alias text.
fn removed_select_path(source: &ColumnSource) -> String {
    match &source.explode_alias {
        None => format!("{}{}", REMOVED, source.select_path),
        Some(alias) => alias_select_path(&format!("{}Removed", alias), &source.split),
    }
}

fn removed_binding(binding: &ExplodeBinding) -> ExplodeBinding {
    ExplodeBinding {
        alias: format!("{}Removed", binding.alias),
        base_path: format!("{}{}", REMOVED, binding.base_path),
        is_map: binding.is_map,
    }
}

/// Accumulates explode bindings across all columns of one statement,
/// deduplicating by alias. Insertion order is preserved; a later insertion
/// with a known alias is a no-op unless it disagrees on the array/map
/// classification, which is an error rather than a silent first-wins.
#[derive(Debug, Default)]
struct ExplodeCollector {
    bindings: IndexMap<String, ExplodeBinding>,
}

impl ExplodeCollector {
    fn insert(&mut self, binding: ExplodeBinding) -> HivemapResult<()> {
        match self.bindings.entry(binding.alias.clone()) {
            Entry::Occupied(existing) => {
                if existing.get().is_map != binding.is_map {
                    return Err(HivemapError::malformed(
                        &binding.base_path,
                        "collection is flattened both as an array and as a map",
                    ));
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(binding);
            }
        }
        Ok(())
    }

    fn into_views(self) -> Vec<ExplodeBinding> {
        self.bindings.into_values().collect()
    }
}

/// Compiles mapping rules into transform table DDL.
#[derive(Debug, Clone, Default)]
pub struct TransformTableGenerator {
    options: GeneratorOptions,
}

impl TransformTableGenerator {
    pub fn new(options: GeneratorOptions) -> Self {
        TransformTableGenerator { options }
    }

    /// Generate the statement pair for one target table.
    ///
    /// Rules for other tables are ignored; zero matching rules is an error.
    pub fn generate(
        &self,
        target_table: &str,
        source_table: &str,
        rules: &[MappingRule],
    ) -> HivemapResult<Vec<String>> {
        let target_rules: Vec<&MappingRule> = rules
            .iter()
            .filter(|rule| rule.target_table == target_table)
            .collect();
        if target_rules.is_empty() {
            return Err(HivemapError::NoRulesForTable(target_table.to_string()));
        }

        debug!(
            target_table,
            source_table,
            removed_enabled = self.options.removed_enabled,
            rules = target_rules.len(),
            "generating transform statement"
        );

        let statement = self.transform_statement(target_table, source_table, &target_rules)?;
        Ok(vec![
            format!("DROP TABLE IF EXISTS {}", target_table),
            statement.to_sql(),
        ])
    }

    fn transform_statement(
        &self,
        target_table: &str,
        source_table: &str,
        rules: &[&MappingRule],
    ) -> HivemapResult<TransformStatement> {
        let mut collector = ExplodeCollector::default();
        let mut columns = Vec::new();

        for (field, group) in group_by_target_column(rules.iter().copied()) {
            let expr = self.build_column(&group, &mut collector)?;
            columns.push(SelectColumn {
                expr,
                alias: normalize_object_name(field),
            });
        }

        Ok(TransformStatement {
            target_table: target_table.to_string(),
            source_table: source_table.to_string(),
            columns,
            views: collector.into_views(),
        })
    }

    /// Build the expression for one target-column group. Each same-source
    /// subgroup resolves to one candidate; more than one subgroup means the
    /// column is fed from unrelated sources and the first available wins.
    ///
    /// Every rule's path is analyzed here, whichever branch it takes:
    /// marker-bearing rules select through their explode alias and can never
    /// serve as `GET_JSON_OBJECT` bases, so only marker-free rules enter the
    /// shared-base extraction.
    fn build_column(
        &self,
        group: &[&MappingRule],
        collector: &mut ExplodeCollector,
    ) -> HivemapResult<SqlExpr> {
        let mut candidates = Vec::new();

        for (_root, subgroup) in path::group_by_source_path(group.iter().copied()) {
            // sort a private copy; the super path has to come last
            let mut subgroup = subgroup;
            subgroup.sort_by(|a, b| compare_paths_desc(&a.json_path, &b.json_path));

            let mut plain = Vec::with_capacity(subgroup.len());
            for rule in subgroup {
                if path::analyze(&rule.json_path)?.index_operator_found {
                    candidates.push(self.single_source_expr(rule, collector)?);
                } else {
                    plain.push(rule);
                }
            }

            match plain.as_slice() {
                [] => {}
                [rule] => candidates.push(self.single_source_expr(rule, collector)?),
                [extractions @ .., super_rule] => {
                    candidates.push(self.multi_source_expr(super_rule, extractions)?)
                }
            }
        }

        Ok(SqlExpr::coalesce(candidates))
    }

    /// One rule, one source path: resolve, coerce, decorate, and, with
    /// tombstones enabled, prefer the `_removed.` shadow value.
    fn single_source_expr(
        &self,
        rule: &MappingRule,
        collector: &mut ExplodeCollector,
    ) -> HivemapResult<SqlExpr> {
        let source = resolve(rule)?;

        let live = self.decorated(rule, SqlExpr::column(source.select_path.clone()));
        let expr = if self.options.removed_enabled {
            let removed = self.decorated(rule, SqlExpr::column(removed_select_path(&source)));
            SqlExpr::Coalesce(vec![removed, live])
        } else {
            live
        };

        if let (Some(alias), Some(base)) = (&source.explode_alias, &source.base_path) {
            let binding = ExplodeBinding {
                alias: alias.clone(),
                base_path: base.clone(),
                is_map: source.split.is_map_path(),
            };
            if self.options.removed_enabled {
                let shadow = removed_binding(&binding);
                collector.insert(binding)?;
                collector.insert(shadow)?;
            } else {
                collector.insert(binding)?;
            }
        }

        Ok(expr)
    }

    /// Several rules share one source blob: all but the sorted-last "super"
    /// rule become `GET_JSON_OBJECT` sub-extractions against a base resolved
    /// once, followed by the raw-path fallbacks, coalesced together.
    fn multi_source_expr(
        &self,
        super_rule: &MappingRule,
        extractions: &[&MappingRule],
    ) -> HivemapResult<SqlExpr> {
        let super_path = strip_root(&super_rule.json_path).to_string();
        let live_base = SqlExpr::column(super_path.clone());
        let base = if self.options.removed_enabled {
            SqlExpr::Coalesce(vec![
                SqlExpr::column(format!("{}{}", REMOVED, super_path)),
                live_base,
            ])
        } else {
            live_base
        };

        let skip = segment_count(&super_rule.json_path);
        let mut candidates: Vec<SqlExpr> = extractions
            .iter()
            .map(|rule| SqlExpr::JsonExtract {
                base: Box::new(base.clone()),
                path: sub_path(&rule.json_path, skip),
            })
            .collect();

        // whole-object fallbacks, in tombstone-first order
        if self.options.removed_enabled {
            candidates.push(SqlExpr::column(format!("{}{}", REMOVED, super_path)));
        }
        candidates.push(SqlExpr::column(super_path));

        Ok(self.decorated(super_rule, SqlExpr::Coalesce(candidates)))
    }

    /// Apply type coercion, then the rule's function if one is present.
    fn decorated(&self, rule: &MappingRule, expr: SqlExpr) -> SqlExpr {
        let expr = coerce(
            rule.source_type,
            rule.target_type,
            rule.has_function(),
            expr,
        );
        if rule.has_function() {
            expr.call(rule.function.clone())
        } else {
            expr
        }
    }
}
