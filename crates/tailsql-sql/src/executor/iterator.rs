//! Consumer-facing result cursor.

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use tracing::{debug, warn};

use super::operators::{leading_columns, leading_schema};
use super::{ExecResult, Operator};
use crate::physical::{CancelHandle, ExecutionContext, PhysicalOperator};

/// Cursor over the non-empty result batches of one query.
///
/// Created by [`QueryEngine::execute`](super::QueryEngine::execute) with the
/// operator tree already open. `next()` pulls from the root operator,
/// skipping empty batches. The tree is closed exactly once: on exhaustion,
/// on the first error, on an explicit [`close`](Self::close) or on drop.
#[derive(Debug)]
pub struct ResultIterator {
    root: PhysicalOperator,
    ctx: ExecutionContext,
    schema: SchemaRef,
    output_width: usize,
    current: Option<RecordBatch>,
    rows: usize,
    closed: bool,
}

impl ResultIterator {
    pub(crate) fn try_new(
        root: PhysicalOperator,
        ctx: ExecutionContext,
        output_width: usize,
    ) -> ExecResult<Self> {
        let schema = leading_schema(&root.schema(), output_width)?;
        Ok(Self {
            root,
            ctx,
            schema,
            output_width,
            current: None,
            rows: 0,
            closed: false,
        })
    }

    /// Advances to the next non-empty batch.
    ///
    /// Returns `Ok(false)` once the results are exhausted. After an error
    /// or exhaustion, every later call returns `Ok(false)`.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> ExecResult<bool> {
        self.current = None;
        if self.closed {
            return Ok(false);
        }
        match self.advance() {
            Ok(Some(batch)) => {
                self.rows += batch.num_rows();
                self.current = Some(batch);
                Ok(true)
            }
            Ok(None) => {
                self.close()?;
                Ok(false)
            }
            Err(e) => {
                if let Err(close_err) = self.close() {
                    warn!(query_id = self.ctx.query_id(), error = %close_err, "close after failure");
                }
                Err(e)
            }
        }
    }

    fn advance(&mut self) -> ExecResult<Option<RecordBatch>> {
        loop {
            self.ctx.check()?;
            match self.root.next(&self.ctx)? {
                Some(batch) if batch.num_rows() == 0 => continue,
                Some(batch) => return Ok(Some(leading_columns(batch, self.output_width)?)),
                None => return Ok(None),
            }
        }
    }

    /// The batch produced by the last successful `next()`.
    pub fn value(&self) -> Option<&RecordBatch> {
        self.current.as_ref()
    }

    /// Schema of the result batches.
    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    /// Returns a handle that cancels this query from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.ctx.cancel_handle()
    }

    /// Query identifier.
    pub fn query_id(&self) -> u64 {
        self.ctx.query_id()
    }

    /// Closes the operator tree. Idempotent.
    pub fn close(&mut self) -> ExecResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.current = None;
        debug!(
            query_id = self.ctx.query_id(),
            rows = self.rows,
            elapsed_us = self.ctx.elapsed().as_micros() as u64,
            "query finished"
        );
        self.root.close()
    }

    /// Drains the remaining batches.
    pub fn collect_batches(mut self) -> ExecResult<Vec<RecordBatch>> {
        let mut batches = Vec::new();
        while self.next()? {
            if let Some(batch) = self.current.take() {
                batches.push(batch);
            }
        }
        Ok(batches)
    }
}

impl Drop for ResultIterator {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(query_id = self.ctx.query_id(), error = %e, "close on drop");
        }
    }
}
