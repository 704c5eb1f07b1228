//! `categorize_change` (§4.2): classify a fingerprint transition into a
//! `ChangeCategory`, or `None` when the config's diff mode declines to
//! auto-classify and a person has to decide.

use std::collections::BTreeMap;

use sqlparser::ast::{Select, SelectItem, SetExpr};
use strata_core::errors::CoreError;
use strata_core::fingerprint::{ChangeCategory, ModelDiffMode, SnapshotFingerprint};
use strata_core::model::{Model, ModelKind};

use crate::canonicalize::parse_single_query;

const EXPLOSIVE_FUNCTIONS: &[&str] = &[
    "EXPLODE",
    "EXPLODE_OUTER",
    "POSEXPLODE",
    "POSEXPLODE_OUTER",
    "UNNEST",
];

fn select_of(query: &sqlparser::ast::Query) -> Option<&Select> {
    match query.body.as_ref() {
        SetExpr::Select(select) => Some(select),
        _ => None,
    }
}

fn mentions_explosive_function(items: &[SelectItem]) -> bool {
    items.iter().any(|item| {
        let rendered = item.to_string().to_ascii_uppercase();
        EXPLOSIVE_FUNCTIONS
            .iter()
            .any(|name| rendered.contains(name))
    })
}

/// Whether `new_sql` differs from `old_sql` only by appending top-level
/// projection items, with the WHERE/FROM/GROUP/HAVING/ORDER/DISTINCT
/// clauses unchanged and no explosive function introduced (§4.2).
pub fn is_projection_addition_only(
    old_sql: &str,
    new_sql: &str,
    dialect: &str,
) -> Result<bool, CoreError> {
    let (Some(old_query), Some(new_query)) = (
        parse_single_query(old_sql, dialect)?,
        parse_single_query(new_sql, dialect)?,
    ) else {
        return Ok(false);
    };

    if old_query.order_by != new_query.order_by {
        return Ok(false);
    }

    let (Some(old_select), Some(new_select)) = (select_of(&old_query), select_of(&new_query))
    else {
        return Ok(false);
    };

    if old_select.distinct.is_some() != new_select.distinct.is_some() {
        return Ok(false);
    }
    if old_select.selection != new_select.selection {
        return Ok(false);
    }
    if old_select.from != new_select.from {
        return Ok(false);
    }
    if old_select.group_by != new_select.group_by {
        return Ok(false);
    }
    if old_select.having != new_select.having {
        return Ok(false);
    }

    if new_select.projection.len() <= old_select.projection.len() {
        return Ok(false);
    }
    if new_select.projection[..old_select.projection.len()] != old_select.projection[..] {
        return Ok(false);
    }

    let added = &new_select.projection[old_select.projection.len()..];
    Ok(!mentions_explosive_function(added))
}

/// Seed diff (§4.2): column additions and same-type overlaps are
/// non-breaking; any removal, rename, or type change is not.
pub fn is_seed_column_addition_only(
    old_columns: &BTreeMap<String, String>,
    new_columns: &BTreeMap<String, String>,
) -> bool {
    for (name, old_type) in old_columns {
        match new_columns.get(name) {
            Some(new_type) if new_type == old_type => {}
            _ => return false,
        }
    }
    new_columns.len() > old_columns.len()
}

/// `categorize_change(old, new, config)` (§4.2). `parent_category` is the
/// already-resolved category of the most-changed parent, consulted only
/// when neither `data_hash` nor `metadata_hash` changed (i.e. the change is
/// purely indirect, via a parent).
pub fn categorize_change(
    old_model: &Model,
    new_model: &Model,
    old_fp: &SnapshotFingerprint,
    new_fp: &SnapshotFingerprint,
    mode: ModelDiffMode,
    parent_category: Option<ChangeCategory>,
) -> Result<Option<ChangeCategory>, CoreError> {
    if old_fp == new_fp {
        return Err(CoreError::Other(
            "cannot categorize a snapshot fingerprint against itself".to_string(),
        ));
    }

    let data_changed = old_fp.data_hash != new_fp.data_hash;
    let metadata_changed = old_fp.metadata_hash != new_fp.metadata_hash;

    if !data_changed && metadata_changed {
        return Ok(Some(ChangeCategory::Metadata));
    }

    if data_changed {
        return Ok(match mode {
            ModelDiffMode::Off => None,
            ModelDiffMode::Full => Some(ChangeCategory::Breaking),
            ModelDiffMode::Semi => {
                let non_breaking = match new_model.kind {
                    ModelKind::Seed => is_seed_column_addition_only(
                        &old_model.columns_to_types,
                        &new_model.columns_to_types,
                    ),
                    ModelKind::External | ModelKind::Embedded => false,
                    _ => is_projection_addition_only(
                        &old_model.query,
                        &new_model.query,
                        &new_model.dialect,
                    )?,
                };
                if non_breaking {
                    Some(ChangeCategory::NonBreaking)
                } else {
                    None
                }
            }
        });
    }

    // Only parent hashes differ: propagate indirectly.
    if old_fp.parent_data_hash != new_fp.parent_data_hash
        || old_fp.parent_metadata_hash != new_fp.parent_metadata_hash
    {
        return Ok(Some(match parent_category {
            Some(ChangeCategory::Breaking) | Some(ChangeCategory::IndirectBreaking) => {
                ChangeCategory::IndirectBreaking
            }
            Some(_) => ChangeCategory::IndirectNonBreaking,
            None => return Ok(None),
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_addition_is_detected() {
        assert!(is_projection_addition_only("select 1, ds", "select 1, 2, ds", "generic").unwrap());
    }

    #[test]
    fn distinct_change_is_not_projection_only() {
        assert!(!is_projection_addition_only(
            "select 1, ds",
            "select distinct 1, 2, ds",
            "generic"
        )
        .unwrap());
    }

    #[test]
    fn explosive_function_blocks_auto_classification() {
        assert!(!is_projection_addition_only(
            "select 1, ds",
            "select 1, explode(arr), ds",
            "generic"
        )
        .unwrap());
    }

    #[test]
    fn seed_column_addition_is_non_breaking() {
        let mut old = BTreeMap::new();
        old.insert("id".to_string(), "int".to_string());
        let mut new = old.clone();
        new.insert("name".to_string(), "text".to_string());
        assert!(is_seed_column_addition_only(&old, &new));
    }

    #[test]
    fn seed_type_change_is_not_addition_only() {
        let mut old = BTreeMap::new();
        old.insert("id".to_string(), "int".to_string());
        let mut new = old.clone();
        new.insert("id".to_string(), "text".to_string());
        assert!(!is_seed_column_addition_only(&old, &new));
    }
}
