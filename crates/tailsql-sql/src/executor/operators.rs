//! Operator execution implementations.
//!
//! Each operator consumes batches from its child on demand and produces
//! batches in the same pull-based model.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};

use super::{ExecResult, ExecutionError};
use crate::physical::{ExecutionContext, PhysicalExpr, PhysicalOperator};
use crate::storage::BatchIterator;

/// Trait for executable operators.
pub trait Operator: std::fmt::Debug {
    /// Returns the output schema.
    fn schema(&self) -> SchemaRef;

    /// Prepares the operator and its children.
    fn open(&mut self) -> ExecResult<()>;

    /// Returns the next batch, or `None` once exhausted.
    fn next(&mut self, ctx: &ExecutionContext) -> ExecResult<Option<RecordBatch>>;

    /// Releases resources held by the operator and its children.
    fn close(&mut self) -> ExecResult<()>;
}

/// Scan over a store's batch iterator.
#[derive(Debug)]
pub struct ScanExec {
    relation: String,
    schema: SchemaRef,
    /// `None` once closed.
    input: Option<BatchIterator>,
}

impl ScanExec {
    /// Creates a scan over `input`.
    pub fn new(relation: impl Into<String>, input: BatchIterator) -> Self {
        Self {
            relation: relation.into(),
            schema: input.schema(),
            input: Some(input),
        }
    }

    /// Scanned relation.
    pub fn relation(&self) -> &str {
        &self.relation
    }
}

impl Operator for ScanExec {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn open(&mut self) -> ExecResult<()> {
        Ok(())
    }

    fn next(&mut self, ctx: &ExecutionContext) -> ExecResult<Option<RecordBatch>> {
        ctx.check()?;
        match self.input.as_mut() {
            Some(input) => Ok(input.next().transpose()?),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        if let Some(mut input) = self.input.take() {
            input.close();
        }
        Ok(())
    }
}

/// Zero-copy column selection.
#[derive(Debug)]
pub struct ProjectExec {
    child: Box<PhysicalOperator>,
    mapping: Vec<usize>,
    schema: SchemaRef,
}

impl ProjectExec {
    /// Creates a projection producing `schema` from the `mapping` columns.
    pub fn new(child: Box<PhysicalOperator>, mapping: Vec<usize>, schema: SchemaRef) -> Self {
        Self {
            child,
            mapping,
            schema,
        }
    }

    /// Input column index for each output column.
    pub fn mapping(&self) -> &[usize] {
        &self.mapping
    }

    /// Child operator.
    pub fn child(&self) -> &PhysicalOperator {
        &self.child
    }

    fn project(&self, batch: &RecordBatch) -> ExecResult<RecordBatch> {
        let columns = self
            .mapping
            .iter()
            .map(|&i| {
                batch.columns().get(i).cloned().ok_or_else(|| {
                    ExecutionError::UnsupportedQueryShape(format!(
                        "projection index {i} out of range for {} columns",
                        batch.num_columns()
                    ))
                })
            })
            .collect::<ExecResult<Vec<_>>>()?;
        let options = RecordBatchOptions::new().with_row_count(Some(batch.num_rows()));
        Ok(RecordBatch::try_new_with_options(
            self.schema.clone(),
            columns,
            &options,
        )?)
    }
}

impl Operator for ProjectExec {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn open(&mut self) -> ExecResult<()> {
        self.child.open()
    }

    fn next(&mut self, ctx: &ExecutionContext) -> ExecResult<Option<RecordBatch>> {
        match self.child.next(ctx)? {
            Some(batch) => Ok(Some(self.project(&batch)?)),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        self.child.close()
    }
}

/// Compacts each input batch to the rows matching a predicate.
///
/// May return zero-row batches; the result iterator skips them.
#[derive(Debug)]
pub struct FilterExec {
    child: Box<PhysicalOperator>,
    predicate: PhysicalExpr,
}

impl FilterExec {
    /// Creates a filter over `child`.
    pub fn new(child: Box<PhysicalOperator>, predicate: PhysicalExpr) -> Self {
        Self { child, predicate }
    }

    /// Bound predicate.
    pub fn predicate(&self) -> &PhysicalExpr {
        &self.predicate
    }

    /// Child operator.
    pub fn child(&self) -> &PhysicalOperator {
        &self.child
    }
}

impl Operator for FilterExec {
    fn schema(&self) -> SchemaRef {
        self.child.schema()
    }

    fn open(&mut self) -> ExecResult<()> {
        self.child.open()
    }

    fn next(&mut self, ctx: &ExecutionContext) -> ExecResult<Option<RecordBatch>> {
        match self.child.next(ctx)? {
            Some(batch) => Ok(Some(self.predicate.filter(&batch)?)),
            None => Ok(None),
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        self.child.close()
    }
}

/// Returns the first `width` columns of `batch` without copying.
pub(crate) fn leading_columns(batch: RecordBatch, width: usize) -> ExecResult<RecordBatch> {
    if batch.num_columns() <= width {
        return Ok(batch);
    }
    let indices: Vec<usize> = (0..width).collect();
    Ok(batch.project(&indices)?)
}

/// Returns the schema of the first `width` columns of `schema`.
pub(crate) fn leading_schema(schema: &SchemaRef, width: usize) -> ExecResult<SchemaRef> {
    if schema.fields().len() <= width {
        return Ok(schema.clone());
    }
    let indices: Vec<usize> = (0..width).collect();
    Ok(Arc::new(schema.project(&indices)?))
}
