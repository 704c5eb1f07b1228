//! Table resolution and incremental filter (§4.3 steps 6-7). Must run after
//! optimization — schema-qualified names are already fixed by then.

use std::collections::{BTreeMap, BTreeSet};

use sqlparser::ast::{Ident, ObjectName, Query, SetExpr, TableAlias, TableFactor};
use strata_core::errors::CoreError;
use strata_core::model::Model;
use strata_core::snapshot::Snapshot;
use strata_snapshot::SnapshotOps;

use crate::canonical::reparse;
use crate::dates::to_time_literal;

fn top_level_select_mut(query: &mut Query) -> Option<&mut sqlparser::ast::Select> {
    match query.body.as_mut() {
        SetExpr::Select(select) => Some(select),
        _ => None,
    }
}

fn resolve_factor(
    factor: &mut TableFactor,
    snapshots: Option<&BTreeMap<String, Snapshot>>,
    expand: Option<&BTreeSet<String>>,
    models: Option<&BTreeMap<String, Model>>,
    is_dev: bool,
) {
    let TableFactor::Table { name, alias, .. } = factor else {
        return;
    };
    let ref_name = name.to_string();

    let explicitly_expanded = expand.is_some_and(|e| e.contains(&ref_name));
    let unmapped_in_snapshots = snapshots.is_some_and(|s| !s.contains_key(&ref_name));
    let should_inline = explicitly_expanded || unmapped_in_snapshots;

    if should_inline {
        if let Some(model) = models.and_then(|m| m.get(&ref_name)) {
            if let Ok(subquery) = reparse(&model.query, &model.dialect) {
                let alias_name = alias
                    .as_ref()
                    .map(|a| a.name.value.clone())
                    .unwrap_or_else(|| model.view_name.clone());
                *factor = TableFactor::Derived {
                    lateral: false,
                    subquery: Box::new(subquery),
                    alias: Some(TableAlias {
                        name: Ident::new(alias_name),
                        columns: vec![],
                    }),
                };
            }
        }
        return;
    }

    if let Some(snapshot) = snapshots.and_then(|s| s.get(&ref_name)) {
        let physical = snapshot.table_name(is_dev, true);
        *name = ObjectName(physical.split('.').map(|p| Ident::new(p.to_string())).collect());
    }
}

/// Resolve every model-name reference to either its physical table name
/// (via `snapshots`) or an inlined subquery (`expand`, or present in
/// `snapshots` but unmapped).
pub fn resolve_tables(
    mut query: Query,
    snapshots: Option<&BTreeMap<String, Snapshot>>,
    expand: Option<&BTreeSet<String>>,
    models: Option<&BTreeMap<String, Model>>,
    is_dev: bool,
) -> Query {
    if let Some(select) = top_level_select_mut(&mut query) {
        for twj in &mut select.from {
            resolve_factor(&mut twj.relation, snapshots, expand, models, is_dev);
            for join in &mut twj.joins {
                resolve_factor(&mut join.relation, snapshots, expand, models, is_dev);
            }
        }
    }
    query
}

/// Wrap `query` as `SELECT * FROM (<orig>) _sub WHERE <time_column> BETWEEN
/// <start> AND <end>`, re-hoisting any `WITH` clause to the new outer query
/// (§4.3 step 7).
pub fn apply_incremental_filter(
    mut query: Query,
    time_column: &str,
    start_ms: i64,
    end_ms: i64,
    time_format: Option<&str>,
) -> Result<Query, CoreError> {
    let with = query.with.take();
    let start_lit = to_time_literal(start_ms, time_format);
    let end_lit = to_time_literal(end_ms, time_format);
    let inner_sql = query.to_string();
    let wrapped_sql =
        format!("SELECT * FROM ({inner_sql}) _sub WHERE {time_column} BETWEEN {start_lit} AND {end_lit}");
    let mut wrapped = reparse(&wrapped_sql, "generic")?;
    wrapped.with = with;
    Ok(wrapped)
}
