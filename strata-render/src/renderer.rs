//! The `Renderer` orchestrator (§4.3): ties the template, optimize, resolve,
//! and incremental-filter stages together around the two-level cache.

use std::collections::{BTreeMap, BTreeSet};

use strata_core::errors::CoreError;
use strata_core::model::Model;
use strata_core::snapshot::Snapshot;

use crate::cache::RenderCache;
use crate::canonical::reparse;
use crate::optimize;
use crate::resolve;
use crate::template::{render_template, TemplateInputs};

pub struct RenderRequest<'a> {
    pub model: &'a Model,
    pub start_ms: i64,
    pub end_ms: i64,
    pub latest_ms: i64,
    pub is_dev: bool,
    pub snapshots: Option<&'a BTreeMap<String, Snapshot>>,
    pub expand: Option<&'a BTreeSet<String>>,
    pub models: Option<&'a BTreeMap<String, Model>>,
    pub known_columns: Option<&'a BTreeMap<String, BTreeMap<String, String>>>,
    pub apply_incremental_filter: bool,
    pub kwargs: BTreeMap<String, String>,
}

impl<'a> RenderRequest<'a> {
    pub fn new(model: &'a Model, start_ms: i64, end_ms: i64, latest_ms: i64) -> Self {
        Self {
            model,
            start_ms,
            end_ms,
            latest_ms,
            is_dev: false,
            snapshots: None,
            expand: None,
            models: None,
            known_columns: None,
            apply_incremental_filter: false,
            kwargs: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct Renderer {
    cache: RenderCache,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cache(cache: RenderCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    fn window_key(req: &RenderRequest<'_>) -> (i64, i64, i64) {
        (req.start_ms, req.end_ms, req.latest_ms)
    }

    fn skips_optimized_cache(req: &RenderRequest<'_>) -> bool {
        req.snapshots.is_some() || req.expand.is_some()
    }

    /// Render `req.model`'s query for the requested window (§4.3 full
    /// pipeline). Returns `Ok(String::new())` when the template stage
    /// produces nothing.
    pub fn render_query(&self, req: &RenderRequest<'_>) -> Result<String, CoreError> {
        let key = Self::window_key(req);
        let skip_optimized = Self::skips_optimized_cache(req);

        if !skip_optimized {
            if let Some(cached) = self.cache.get_optimized(key) {
                return Ok(cached);
            }
        }

        let macro_text = match self.cache.get_macro_stage(key) {
            Some(text) => text,
            None => {
                let rendered = render_template(
                    req.model,
                    &TemplateInputs {
                        start_ms: req.start_ms,
                        end_ms: req.end_ms,
                        latest_ms: req.latest_ms,
                        is_dev: req.is_dev,
                        snapshots: req.snapshots,
                        kwargs: &req.kwargs,
                    },
                )?;
                self.cache.put_macro_stage(key, rendered.clone());
                rendered
            }
        };

        if macro_text.trim().is_empty() {
            return Ok(String::new());
        }

        let parsed = reparse(&macro_text, &req.model.dialect)?;

        let known_columns = req.known_columns.cloned().unwrap_or_default();
        let optimized = optimize::optimize(parsed, &known_columns);

        let resolved = resolve::resolve_tables(optimized, req.snapshots, req.expand, req.models, req.is_dev);

        let final_query = if req.apply_incremental_filter {
            match &req.model.time_column {
                Some(time_column) => resolve::apply_incremental_filter(
                    resolved,
                    &time_column.column,
                    req.start_ms,
                    req.end_ms,
                    time_column.format.as_deref(),
                )?,
                None => resolved,
            }
        } else {
            resolved
        };

        let sql = optimize::query_to_sql(&final_query);

        if !skip_optimized {
            self.cache.put_optimized(key, sql.clone());
        }

        Ok(sql)
    }

    /// Entry point for calls that pass `snapshots`/`expand` (§4.3 "bypass
    /// the optimized cache but still consult the unoptimized cache"). The
    /// optimized-cache bypass is enforced by `render_query` itself via
    /// `skips_optimized_cache`; this wrapper documents the call site.
    pub fn render_uncached(&self, req: &RenderRequest<'_>) -> Result<String, CoreError> {
        self.render_query(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
            depends_on: Default::default(),
        }
    }

    #[test]
    fn render_query_caches_optimized_output() {
        let renderer = Renderer::new();
        let m = model("select a, b from upstream");
        let req = RenderRequest::new(&m, 0, 86_400_000, 86_400_000);
        let first = renderer.render_query(&req).unwrap();
        assert_eq!(renderer.cache().optimized_entry_count(), 1);
        let second = renderer.render_query(&req).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn snapshots_bypass_optimized_cache() {
        let renderer = Renderer::new();
        let m = model("select a from upstream");
        let snapshots = BTreeMap::new();
        let mut req = RenderRequest::new(&m, 0, 86_400_000, 86_400_000);
        req.snapshots = Some(&snapshots);
        renderer.render_query(&req).unwrap();
        assert_eq!(renderer.cache().optimized_entry_count(), 0);
        assert_eq!(renderer.cache().macro_stage_entry_count(), 1);
    }

    #[test]
    fn empty_query_short_circuits() {
        let renderer = Renderer::new();
        let m = model("");
        let req = RenderRequest::new(&m, 0, 86_400_000, 86_400_000);
        assert_eq!(renderer.render_query(&req).unwrap(), "");
    }
}
