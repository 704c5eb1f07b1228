//! `BatchCommand` — write operations that can be batched onto the
//! dedicated writer thread (§4.6).

use strata_core::ids::SnapshotId;
use strata_core::snapshot::Snapshot;

#[derive(Debug)]
pub enum BatchCommand {
    PushSnapshots(Vec<Snapshot>),
    AddInterval {
        snapshot: SnapshotId,
        start_ms: i64,
        end_ms: i64,
        is_dev: bool,
    },
    RemoveInterval {
        snapshots: Vec<SnapshotId>,
        start_ms: i64,
        end_ms: i64,
    },
    /// Flush any pending writes immediately (fire-and-forget).
    Flush,
    /// Flush and signal completion via the provided sender (synchronous).
    FlushSync(std::sync::mpsc::SyncSender<()>),
    /// Shut down the writer thread.
    Shutdown,
}
