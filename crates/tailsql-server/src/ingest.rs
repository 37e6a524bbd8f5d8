//! Background ingestion.
//!
//! Each relation gets one worker task that owns the relation's
//! [`StoreWriter`]. Records arrive through a bounded queue and are appended
//! with `put` in arrival order. Since the writer moves into the task and
//! [`IngestSender`] is not `Clone`, there is exactly one producer and one
//! writer per relation.

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use tailsql_common::config::DecodeErrorPolicy;
use tailsql_sql::storage::{StoreError, StoreWriter};

/// One raw record read from a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRecord {
    /// Position of the record in its stream.
    pub offset: i64,
    /// Record key; empty for unkeyed records.
    pub key: Bytes,
    /// Encoded record value.
    pub value: Bytes,
}

impl IngestRecord {
    /// Creates a record.
    pub fn new(offset: i64, key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self {
            offset,
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Counters reported by a finished worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Successful `put` calls. Includes records evicted later on, so the
    /// store holds `accepted - skipped` rows once the worker finishes.
    pub accepted: u64,
    /// Records evicted or dropped because they could not be decoded.
    pub skipped: u64,
}

/// Producer side of an ingestion worker's queue.
///
/// Dropping the sender (or calling [`close`](Self::close)) lets the worker
/// drain the queue and finish.
#[derive(Debug)]
pub struct IngestSender {
    relation: String,
    tx: mpsc::Sender<IngestRecord>,
}

impl IngestSender {
    /// Queues a record, waiting while the queue is full.
    ///
    /// Fails with the record if the worker has stopped.
    pub async fn send(&self, record: IngestRecord) -> Result<(), SendError<IngestRecord>> {
        self.tx.send(record).await
    }

    /// Blocking variant of [`send`](Self::send) for non-async producers.
    pub fn blocking_send(&self, record: IngestRecord) -> Result<(), SendError<IngestRecord>> {
        self.tx.blocking_send(record)
    }

    /// Relation fed by this sender.
    pub fn relation(&self) -> &str {
        &self.relation
    }

    /// Returns true once the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Closes the queue.
    pub fn close(self) {}
}

/// Spawns the ingestion worker for `writer`'s relation.
///
/// The worker returns its counters once the sender is dropped and the
/// queue drained. Under [`DecodeErrorPolicy::Abort`] the first failing
/// `put` ends the worker with that error. Under
/// [`DecodeErrorPolicy::Skip`] undecodable pending records are evicted
/// and ingestion continues; other errors still end the worker.
pub fn spawn_ingest(
    writer: StoreWriter,
    queue_capacity: usize,
    policy: DecodeErrorPolicy,
) -> (IngestSender, JoinHandle<Result<IngestStats, StoreError>>) {
    let relation = writer.store().relation().to_string();
    let (tx, rx) = mpsc::channel(queue_capacity.max(1));
    let handle = tokio::spawn(run_worker(writer, rx, policy));
    (IngestSender { relation, tx }, handle)
}

async fn run_worker(
    mut writer: StoreWriter,
    mut rx: mpsc::Receiver<IngestRecord>,
    policy: DecodeErrorPolicy,
) -> Result<IngestStats, StoreError> {
    let relation = writer.store().relation().to_string();
    let mut stats = IngestStats::default();
    info!(relation = %relation, policy = ?policy, "ingestion worker started");

    while let Some(record) = rx.recv().await {
        let IngestRecord { offset, key, value } = record;
        match writer.put(offset, key.clone(), value.clone()) {
            Ok(()) => stats.accepted += 1,
            Err(e) if e.is_decode() && policy == DecodeErrorPolicy::Skip => {
                let evicted = writer.evict_undecodable();
                stats.skipped += evicted as u64;
                // Retry once: if the new record itself is bad it is dropped.
                match writer.put(offset, key, value) {
                    Ok(()) => stats.accepted += 1,
                    Err(retry) if retry.is_decode() => stats.skipped += 1,
                    Err(retry) => {
                        error!(relation = %relation, offset, error = %retry, "ingestion aborted");
                        return Err(retry);
                    }
                }
                warn!(relation = %relation, offset, evicted, error = %e, "skipped undecodable records");
            }
            Err(e) => {
                error!(relation = %relation, offset, error = %e, "ingestion aborted");
                return Err(e);
            }
        }
    }

    info!(
        relation = %relation,
        accepted = stats.accepted,
        skipped = stats.skipped,
        "ingestion worker finished"
    );
    Ok(stats)
}
