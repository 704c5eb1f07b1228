//! `fingerprint_from_model` (§4.2/§4.4): builds the four-hash
//! `SnapshotFingerprint` for a model given its direct parents' already-computed
//! fingerprints. Callers walk the dependency DAG bottom-up (the scheduler's
//! topological order already gives them this) and fold each parent's
//! `data_hash`/`metadata_hash` in as they go — recomputing parents from
//! scratch here would duplicate work across every diamond-shaped dependency.

use std::collections::BTreeMap;

use strata_core::fingerprint::SnapshotFingerprint;
use strata_core::model::{Model, ModelKind, TimeColumn};
use strata_core::errors::CoreError;

use crate::canonicalize::canonical_sql;
use crate::hash::{hash_fields, hash_sorted};

fn serialize_map(map: &BTreeMap<String, String>) -> String {
    map.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

fn time_column_repr(tc: &Option<TimeColumn>) -> String {
    match tc {
        Some(tc) => format!("{}:{}", tc.column, tc.format.as_deref().unwrap_or("")),
        None => String::new(),
    }
}

fn full_query_data_hash(model: &Model) -> Result<String, CoreError> {
    let canonical = canonical_sql(&model.query, &model.dialect)?;
    let mut macro_bodies: Vec<&str> = model.jinja_macros.values().map(String::as_str).collect();
    macro_bodies.sort();
    let python_env = serialize_python_env(model);
    let audits_used: Vec<&str> = model.audits.iter().map(|a| a.name.as_str()).collect();
    let columns = serialize_map(&model.columns_to_types);
    let kind_tag = format!("{:?}", model.kind);
    let time_column = time_column_repr(&model.time_column);
    let batch_size = model.batch_size.map(|b| b.to_string()).unwrap_or_default();
    let lookback = model.lookback.to_string();
    let stamp = model.stamp.clone().unwrap_or_default();

    Ok(hash_fields(&[
        &canonical,
        &kind_tag,
        &model.dialect,
        &model.pre_statements.join("\u{1e}"),
        &model.post_statements.join("\u{1e}"),
        &macro_bodies.join("\u{1e}"),
        &python_env,
        &audits_used.join(","),
        &columns,
        &model.partitioned_by.join(","),
        &model.clustered_by.join(","),
        &time_column,
        &batch_size,
        &lookback,
        &stamp,
    ]))
}

fn serialize_python_env(model: &Model) -> String {
    model
        .python_env
        .values()
        .map(|exe| format!("{}:{:?}:{}", exe.name, exe.kind, exe.payload))
        .collect::<Vec<_>>()
        .join(";")
}

fn seed_data_hash(model: &Model) -> String {
    let columns = serialize_map(&model.columns_to_types);
    hash_fields(&[
        &model.query,
        "SEED",
        &model.dialect,
        &columns,
        model.stamp.as_deref().unwrap_or(""),
    ])
}

/// EXTERNAL/EMBEDDED kinds have no query body to hash, so `data_hash` folds
/// in only identity — any change to the model otherwise shows up only as a
/// rename, which is out of scope for fingerprint stability (§4.2 locked
/// field-list scope).
fn identity_only_data_hash(model: &Model) -> String {
    hash_fields(&[&model.name, &model.dialect, &format!("{:?}", model.kind)])
}

fn own_data_hash(model: &Model) -> Result<String, CoreError> {
    match model.kind {
        ModelKind::External | ModelKind::Embedded => Ok(identity_only_data_hash(model)),
        ModelKind::Seed => Ok(seed_data_hash(model)),
        _ => full_query_data_hash(model),
    }
}

fn own_metadata_hash(model: &Model) -> String {
    let audits_flags: Vec<String> = model
        .audits
        .iter()
        .map(|a| format!("{}:{}", a.name, a.blocking))
        .collect();
    hash_fields(&[
        model.owner.as_deref().unwrap_or(""),
        &model.cron,
        &model.start_ms.map(|v| v.to_string()).unwrap_or_default(),
        &model.tags.join(","),
        &model.grain.join(","),
        &audits_flags.join(","),
        model.description.as_deref().unwrap_or(""),
    ])
}

/// Build the fingerprint for `model`, given the already-computed
/// fingerprints of its direct parents (keyed by parent model name; entries
/// for names not in `model.depends_on` are ignored).
pub fn fingerprint_from_model(
    model: &Model,
    parent_fingerprints: &BTreeMap<String, SnapshotFingerprint>,
) -> Result<SnapshotFingerprint, CoreError> {
    let data_hash = own_data_hash(model)?;
    let metadata_hash = own_metadata_hash(model);

    let mut parent_data = Vec::new();
    let mut parent_metadata = Vec::new();
    for parent_name in &model.depends_on {
        if let Some(fp) = parent_fingerprints.get(parent_name) {
            parent_data.push(fp.data_hash.clone());
            parent_metadata.push(fp.metadata_hash.clone());
        }
    }

    Ok(SnapshotFingerprint {
        data_hash,
        metadata_hash,
        parent_data_hash: hash_sorted(parent_data),
        parent_metadata_hash: hash_sorted(parent_metadata),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::model::Model;

    fn base_model(query: &str) -> Model {
        Model {
            name: "m".into(),
            view_name: "m_view".into(),
            dialect: "generic".into(),
            kind: ModelKind::Full,
            query: query.into(),
            pre_statements: vec![],
            post_statements: vec![],
            macro_definitions: vec![],
            python_env: BTreeMap::new(),
            jinja_macros: BTreeMap::new(),
            cron: "@daily".into(),
            start_ms: None,
            owner: None,
            tags: vec![],
            stamp: None,
            grain: vec![],
            partitioned_by: vec![],
            clustered_by: vec![],
            time_column: None,
            lookback: 0,
            batch_size: None,
            columns_to_types: BTreeMap::new(),
            audits: vec![],
            description: None,
            depends_on: Default::default(),
        }
    }

    #[test]
    fn fingerprint_is_deterministic_across_runs() {
        let model = base_model("select 1, ds");
        let parents = BTreeMap::new();
        let a = fingerprint_from_model(&model, &parents).unwrap();
        let b = fingerprint_from_model(&model, &parents).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn data_hash_changes_with_query() {
        let a = fingerprint_from_model(&base_model("select 1"), &BTreeMap::new()).unwrap();
        let b = fingerprint_from_model(&base_model("select 2"), &BTreeMap::new()).unwrap();
        assert_ne!(a.data_hash, b.data_hash);
        assert_eq!(a.metadata_hash, b.metadata_hash);
    }

    #[test]
    fn parent_hash_is_commutative_over_parent_order() {
        let mut model = base_model("select 1");
        model.depends_on.insert("p1".into());
        model.depends_on.insert("p2".into());

        let fp1 = SnapshotFingerprint {
            data_hash: "1".into(),
            metadata_hash: "10".into(),
            parent_data_hash: "0".into(),
            parent_metadata_hash: "0".into(),
        };
        let fp2 = SnapshotFingerprint {
            data_hash: "2".into(),
            metadata_hash: "20".into(),
            parent_data_hash: "0".into(),
            parent_metadata_hash: "0".into(),
        };

        let mut order_a = BTreeMap::new();
        order_a.insert("p1".to_string(), fp1.clone());
        order_a.insert("p2".to_string(), fp2.clone());

        let mut order_b = BTreeMap::new();
        order_b.insert("p2".to_string(), fp2);
        order_b.insert("p1".to_string(), fp1);

        let result_a = fingerprint_from_model(&model, &order_a).unwrap();
        let result_b = fingerprint_from_model(&model, &order_b).unwrap();
        assert_eq!(result_a.parent_data_hash, result_b.parent_data_hash);
    }
}
