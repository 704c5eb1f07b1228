//! Fingerprinting and change categorization cost on a moderately wide
//! query, the common case where canonicalization (the `sqlparser` parse +
//! re-render round trip) dominates over the hashing itself.

use std::collections::BTreeMap;

use criterion::{criterion_group, criterion_main, Criterion};

use strata_core::fingerprint::ModelDiffMode;
use strata_core::model::{Model, ModelKind};
use strata_fingerprint::{categorize_change, fingerprint_from_model};

fn wide_model(query: &str) -> Model {
    Model {
        name: "orders_enriched".into(),
        view_name: "orders_enriched_view".into(),
        dialect: "generic".into(),
        kind: ModelKind::IncrementalByTimeRange,
        query: query.into(),
        pre_statements: vec![],
        post_statements: vec![],
        macro_definitions: vec![],
        python_env: BTreeMap::new(),
        jinja_macros: BTreeMap::new(),
        cron: "@daily".into(),
        start_ms: None,
        owner: Some("analytics".into()),
        tags: vec!["core".into()],
        stamp: None,
        grain: vec!["order_id".into()],
        partitioned_by: vec!["ds".into()],
        clustered_by: vec![],
        time_column: None,
        lookback: 0,
        batch_size: Some(1),
        columns_to_types: BTreeMap::new(),
        audits: vec![],
        description: None,
        depends_on: Default::default(),
    }
}

fn wide_query() -> String {
    let columns: Vec<String> = (0..40).map(|i| format!("col_{i}")).collect();
    format!(
        "select {}, ds from orders o join customers c on o.customer_id = c.id where ds >= '2024-01-01' group by ds",
        columns.join(", ")
    )
}

fn bench_fingerprint(c: &mut Criterion) {
    let model = wide_model(&wide_query());
    let parents = BTreeMap::new();

    c.bench_function("fingerprint_from_model_wide_query", |b| {
        b.iter(|| fingerprint_from_model(&model, &parents).unwrap())
    });
}

fn bench_categorize(c: &mut Criterion) {
    let old_model = wide_model(&wide_query());
    let mut new_model = old_model.clone();
    new_model.query = wide_query().replacen("col_0", "col_0, col_extra", 1);

    let old_fp = fingerprint_from_model(&old_model, &BTreeMap::new()).unwrap();
    let new_fp = fingerprint_from_model(&new_model, &BTreeMap::new()).unwrap();

    c.bench_function("categorize_projection_addition", |b| {
        b.iter(|| {
            categorize_change(
                &old_model,
                &new_model,
                &old_fp,
                &new_fp,
                ModelDiffMode::Semi,
                None,
            )
            .unwrap()
        })
    });
}

criterion_group!(benches, bench_fingerprint, bench_categorize);
criterion_main!(benches);
