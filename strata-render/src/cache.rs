//! Two-level render cache (§4.3 "[ADDED]"): post-macro-resolution and
//! post-optimization text, each keyed by `(start_ms, end_ms, latest_ms)`.
//! Built on `moka::sync::Cache` the way the teacher's parser cache is —
//! bounded capacity, TinyLFU admission, `invalidate`/`entry_count` exposed
//! for tests.

use moka::sync::Cache;

pub type WindowKey = (i64, i64, i64);

const DEFAULT_CAPACITY: u64 = 2_048;

#[derive(Clone)]
pub struct RenderCache {
    macro_stage: Cache<WindowKey, String>,
    optimized: Cache<WindowKey, String>,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RenderCache {
    pub fn with_capacity(capacity: u64) -> Self {
        Self {
            macro_stage: Cache::new(capacity),
            optimized: Cache::new(capacity),
        }
    }

    pub fn get_macro_stage(&self, key: WindowKey) -> Option<String> {
        self.macro_stage.get(&key)
    }

    pub fn put_macro_stage(&self, key: WindowKey, value: String) {
        self.macro_stage.insert(key, value);
    }

    pub fn get_optimized(&self, key: WindowKey) -> Option<String> {
        self.optimized.get(&key)
    }

    pub fn put_optimized(&self, key: WindowKey, value: String) {
        self.optimized.insert(key, value);
    }

    pub fn invalidate_all(&self) {
        self.macro_stage.invalidate_all();
        self.optimized.invalidate_all();
    }

    pub fn macro_stage_entry_count(&self) -> u64 {
        self.macro_stage.run_pending_tasks();
        self.macro_stage.entry_count()
    }

    pub fn optimized_entry_count(&self) -> u64 {
        self.optimized.run_pending_tasks();
        self.optimized.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = RenderCache::default();
        cache.put_macro_stage((0, 1, 1), "select 1".to_string());
        assert_eq!(cache.get_macro_stage((0, 1, 1)), Some("select 1".to_string()));
        assert_eq!(cache.get_optimized((0, 1, 1)), None);
    }

    #[test]
    fn invalidate_all_clears_both_maps() {
        let cache = RenderCache::default();
        cache.put_macro_stage((0, 1, 1), "a".to_string());
        cache.put_optimized((0, 1, 1), "b".to_string());
        cache.invalidate_all();
        assert_eq!(cache.macro_stage_entry_count(), 0);
        assert_eq!(cache.optimized_entry_count(), 0);
    }
}
