//! Dedicated writer thread with a bounded crossbeam channel. Batches writes
//! into single transactions for throughput, the same shape as the
//! teacher's batch writer.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use rusqlite::Connection;
use strata_core::errors::CoreError;

use super::commands::BatchCommand;
use crate::queries;

const CHANNEL_BOUND: usize = 1024;
const BATCH_SIZE: usize = 500;
const FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

#[derive(Debug, Default, Clone)]
pub struct WriteStats {
    pub snapshots_pushed: usize,
    pub intervals_added: usize,
    pub intervals_removed: usize,
    pub flushes: usize,
}

pub struct BatchWriter {
    tx: Sender<BatchCommand>,
    handle: Option<JoinHandle<Result<WriteStats, CoreError>>>,
}

impl BatchWriter {
    pub fn new(conn: Connection) -> Self {
        let (tx, rx) = bounded(CHANNEL_BOUND);
        let handle = thread::Builder::new()
            .name("strata-batch-writer".to_string())
            .spawn(move || writer_loop(conn, rx))
            .expect("failed to spawn batch writer thread");
        Self {
            tx,
            handle: Some(handle),
        }
    }

    pub fn send(&self, cmd: BatchCommand) -> Result<(), CoreError> {
        self.tx
            .send(cmd)
            .map_err(|_| CoreError::store("batch writer channel disconnected"))
    }

    pub fn flush(&self) -> Result<(), CoreError> {
        self.send(BatchCommand::Flush)
    }

    pub fn flush_sync(&self) -> Result<(), CoreError> {
        let (tx, rx) = std::sync::mpsc::sync_channel(0);
        self.send(BatchCommand::FlushSync(tx))?;
        rx.recv()
            .map_err(|_| CoreError::store("batch writer thread did not respond to flush_sync"))
    }

    pub fn shutdown(mut self) -> Result<WriteStats, CoreError> {
        let _ = self.tx.send(BatchCommand::Shutdown);
        match self.handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| CoreError::store("batch writer thread panicked"))?,
            None => Ok(WriteStats::default()),
        }
    }
}

impl Drop for BatchWriter {
    fn drop(&mut self) {
        let _ = self.tx.send(BatchCommand::Shutdown);
    }
}

fn writer_loop(conn: Connection, rx: Receiver<BatchCommand>) -> Result<WriteStats, CoreError> {
    let mut buffer: Vec<BatchCommand> = Vec::with_capacity(BATCH_SIZE);
    let mut stats = WriteStats::default();

    loop {
        match rx.recv_timeout(FLUSH_TIMEOUT) {
            Ok(BatchCommand::Shutdown) => {
                flush_buffer(&conn, &mut buffer, &mut stats)?;
                break;
            }
            Ok(BatchCommand::Flush) => {
                flush_buffer(&conn, &mut buffer, &mut stats)?;
            }
            Ok(BatchCommand::FlushSync(done_tx)) => {
                flush_buffer(&conn, &mut buffer, &mut stats)?;
                let _ = done_tx.send(());
            }
            Ok(cmd) => {
                buffer.push(cmd);
                if buffer.len() >= BATCH_SIZE {
                    flush_buffer(&conn, &mut buffer, &mut stats)?;
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !buffer.is_empty() {
                    flush_buffer(&conn, &mut buffer, &mut stats)?;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                flush_buffer(&conn, &mut buffer, &mut stats)?;
                break;
            }
        }
    }

    Ok(stats)
}

fn flush_buffer(conn: &Connection, buffer: &mut Vec<BatchCommand>, stats: &mut WriteStats) -> Result<(), CoreError> {
    if buffer.is_empty() {
        return Ok(());
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| CoreError::store(format!("begin transaction: {e}")))?;

    for cmd in buffer.iter() {
        match cmd {
            BatchCommand::PushSnapshots(snapshots) => {
                for snapshot in snapshots {
                    queries::snapshots::insert_snapshot(&tx, snapshot)?;
                    stats.snapshots_pushed += 1;
                }
            }
            BatchCommand::AddInterval {
                snapshot,
                start_ms,
                end_ms,
                is_dev,
            } => {
                queries::intervals::add_interval(&tx, snapshot, *start_ms, *end_ms, *is_dev)?;
                stats.intervals_added += 1;
            }
            BatchCommand::RemoveInterval {
                snapshots,
                start_ms,
                end_ms,
            } => {
                queries::intervals::remove_interval(&tx, snapshots, *start_ms, *end_ms)?;
                stats.intervals_removed += 1;
            }
            BatchCommand::Flush | BatchCommand::FlushSync(_) | BatchCommand::Shutdown => {}
        }
    }

    tx.commit().map_err(|e| CoreError::store(format!("commit batch: {e}")))?;
    stats.flushes += 1;
    buffer.clear();
    Ok(())
}
