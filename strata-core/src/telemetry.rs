//! Tracing setup and an in-process structured event feed. Mirrors the
//! teacher's `telemetry/collector.rs`: log lines via `tracing` are the
//! primary surface; `EventCollector` is an optional secondary sink for
//! callers that want to assert on what happened (tests, a future UI) without
//! scraping log output.

use std::sync::{Arc, Mutex};

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global `tracing` subscriber. Safe to call more than once —
/// subsequent calls are no-ops (the global subscriber can only be set once
/// per process).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// One structured event worth keeping around after the log line scrolls by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    RenderCacheMiss { model: String },
    CategorizationDecided { model: String, category: String },
    Promoted { environment: String, added: usize, removed: usize },
    MigrationApplied { from_version: u32, to_version: u32 },
}

/// A thread-safe sink `EngineAdapter`/store implementations can share.
#[derive(Debug, Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<Vec<CoreEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: CoreEvent) {
        tracing::debug!(?event, "core event");
        self.events.lock().expect("event collector poisoned").push(event);
    }

    pub fn drain(&self) -> Vec<CoreEvent> {
        std::mem::take(&mut self.events.lock().expect("event collector poisoned"))
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("event collector poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
