//! Lazy batch iterator over a columnar store.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tracing::trace;

use tailsql_common::memory::MemoryReservation;

use super::{ColumnarStore, StoreResult};
use crate::physical::PhysicalExpr;

/// Iterator over the batches of a [`ColumnarStore`].
///
/// Yields the decoded pending buffer (if non-empty) first, then the
/// materialized batches from newest to oldest. Empty batches are never
/// yielded. The set of materialized batches is fixed on the first call to
/// `next()`.
pub struct BatchIterator {
    store: Arc<ColumnarStore>,
    predicate: Option<PhysicalExpr>,
    started: bool,
    /// Materialized batches left to visit; the next one is `cursor - 1`.
    cursor: usize,
    pending: Option<RecordBatch>,
    /// Memory held by the decoded pending batch until the iterator closes.
    reservation: Option<MemoryReservation>,
    closed: bool,
}

impl BatchIterator {
    pub(super) fn new(store: Arc<ColumnarStore>, predicate: Option<PhysicalExpr>) -> Self {
        Self {
            store,
            predicate,
            started: false,
            cursor: 0,
            pending: None,
            reservation: None,
            closed: false,
        }
    }

    /// Schema of the yielded batches.
    pub fn schema(&self) -> SchemaRef {
        self.store.schema()
    }

    /// Relation being iterated.
    pub fn relation(&self) -> &str {
        self.store.relation()
    }

    /// Releases held resources. Later calls to `next()` return `None`.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.pending = None;
            self.reservation = None;
            trace!(relation = %self.store.relation(), "batch iterator closed");
        }
    }

    fn start(&mut self) -> StoreResult<()> {
        self.started = true;
        let (values, batches) = self.store.snapshot();
        self.cursor = batches;
        if !values.is_empty() {
            let batch = self.store.decoder().decode(&values)?;
            self.reservation = Some(
                self.store
                    .memory()
                    .try_reserve(batch.get_array_memory_size())?,
            );
            self.pending = Some(batch);
        }
        Ok(())
    }

    fn next_raw(&mut self) -> Option<RecordBatch> {
        if let Some(batch) = self.pending.take() {
            return Some(batch);
        }
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        self.store.batch_at(self.cursor)
    }

    fn advance(&mut self) -> StoreResult<Option<RecordBatch>> {
        if !self.started {
            self.start()?;
        }
        while let Some(batch) = self.next_raw() {
            let batch = match &self.predicate {
                Some(predicate) => predicate.filter(&batch)?,
                None => batch,
            };
            if batch.num_rows() > 0 {
                return Ok(Some(batch));
            }
        }
        Ok(None)
    }
}

impl Iterator for BatchIterator {
    type Item = StoreResult<RecordBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        match self.advance() {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.close();
                None
            }
            Err(e) => {
                self.close();
                Some(Err(e))
            }
        }
    }
}

impl fmt::Debug for BatchIterator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchIterator")
            .field("relation", &self.store.relation())
            .field("predicate", &self.predicate.as_ref().map(ToString::to_string))
            .field("started", &self.started)
            .field("cursor", &self.cursor)
            .field("closed", &self.closed)
            .finish()
    }
}
