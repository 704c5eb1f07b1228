//! Template + macro stage (§4.3 steps 2-3): build a `minijinja` environment
//! populated with the date context, python-env value bindings, and the
//! `snapshots`/`is_dev` context, then render. Jinja macro bodies
//! (`model.jinja_macros`) are prepended to the query text so that `{% macro
//! %}` definitions are in scope for the main render — a single minijinja
//! pass over definitions-plus-query stands in for the spec's separate
//! "construct an evaluator, evaluate each macro into its scope" step.

use std::collections::BTreeMap;

use minijinja::{context, Environment};
use strata_core::errors::CoreError;
use strata_core::model::{ExecutableKind, Model};
use strata_core::snapshot::Snapshot;

use crate::dates::{to_ds, to_ts};

pub struct TemplateInputs<'a> {
    pub start_ms: i64,
    pub end_ms: i64,
    pub latest_ms: i64,
    pub is_dev: bool,
    pub snapshots: Option<&'a BTreeMap<String, Snapshot>>,
    pub kwargs: &'a BTreeMap<String, String>,
}

fn path_for(model: &Model) -> std::path::PathBuf {
    std::path::PathBuf::from(&model.name)
}

/// Render the model's query text through the template/macro stage. Returns
/// `Ok(String::new())` for genuinely empty output (§4.3 "empty output ->
/// empty result"), and a tagged `MacroEvalError` if the named macro (best
/// guessed from the jinja error context) fails to evaluate.
pub fn render_template(model: &Model, inputs: &TemplateInputs<'_>) -> Result<String, CoreError> {
    if model.query.trim().is_empty() {
        return Ok(String::new());
    }

    let mut macros_src = String::new();
    for body in model.jinja_macros.values() {
        macros_src.push_str(body);
        macros_src.push('\n');
    }
    let source = format!("{macros_src}{}", model.query);

    let snapshot_table_names: BTreeMap<String, String> = inputs
        .snapshots
        .map(|snapshots| {
            snapshots
                .iter()
                .map(|(name, _snapshot)| (name.clone(), name.clone()))
                .collect()
        })
        .unwrap_or_default();

    let python_values: BTreeMap<String, String> = model
        .python_env
        .values()
        .filter(|exe| matches!(exe.kind, ExecutableKind::Value))
        .map(|exe| (exe.name.clone(), exe.payload.clone()))
        .collect();

    let env = Environment::new();
    let ctx = context! {
        start_ds => to_ds(inputs.start_ms),
        end_ds => to_ds(inputs.end_ms),
        latest_ds => to_ds(inputs.latest_ms),
        start_ts => to_ts(inputs.start_ms),
        end_ts => to_ts(inputs.end_ms),
        latest_ts => to_ts(inputs.latest_ms),
        is_dev => inputs.is_dev,
        snapshots => snapshot_table_names,
        python_env => python_values,
        kwargs => inputs.kwargs.clone(),
    };

    env.render_str(&source, ctx).map_err(|e| {
        let message = e.to_string();
        // A call into `adapter.*` can't be resolved without a live engine
        // connection; the caller decides whether to defer to runtime (§4.3
        // "ParsetimeAdapterCall").
        if message.contains("adapter") {
            return CoreError::ParsetimeAdapterCall(message);
        }
        let macro_name = model
            .jinja_macros
            .keys()
            .find(|name| message.contains(name.as_str()))
            .cloned()
            .unwrap_or_else(|| "<unknown>".to_string());
        CoreError::MacroEvalError {
            macro_name,
            message,
            path: path_for(model),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use strata_core::model::ModelKind;

    fn model(query: &str) -> Model {
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
            depends_on: BTreeSet::new(),
        }
    }

    fn inputs() -> TemplateInputs<'static> {
        TemplateInputs {
            start_ms: 0,
            end_ms: 86_400_000,
            latest_ms: 86_400_000,
            is_dev: false,
            snapshots: None,
            kwargs: Box::leak(Box::new(BTreeMap::new())),
        }
    }

    #[test]
    fn empty_query_renders_empty() {
        let result = render_template(&model(""), &inputs()).unwrap();
        assert_eq!(result, "");
    }

    #[test]
    fn plain_sql_passes_through() {
        let result = render_template(&model("select 1"), &inputs()).unwrap();
        assert_eq!(result, "select 1");
    }

    #[test]
    fn jinja_variable_substitution() {
        let result = render_template(&model("select '{{ start_ds }}' as d"), &inputs()).unwrap();
        assert_eq!(result, "select '1970-01-01' as d");
    }
}
