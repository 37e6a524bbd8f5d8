//! Physical operator tree.

use std::fmt;

use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use super::ExecutionContext;
use crate::executor::{ExecResult, FilterExec, Operator, ProjectExec, ScanExec};

/// Closed set of executable operators.
///
/// Mirrors the accepted logical shape one to one. Dispatch is an exhaustive
/// match, so adding a variant forces every caller to handle it.
#[derive(Debug)]
pub enum PhysicalOperator {
    /// Scan over a store.
    Scan(ScanExec),
    /// Column selection.
    Project(ProjectExec),
    /// Row filter.
    Filter(FilterExec),
}

impl PhysicalOperator {
    /// Returns the name of this operator.
    pub fn name(&self) -> &'static str {
        match self {
            PhysicalOperator::Scan(_) => "Scan",
            PhysicalOperator::Project(_) => "Project",
            PhysicalOperator::Filter(_) => "Filter",
        }
    }

    fn format_node(&self, indent: usize, output: &mut String) {
        let prefix = "  ".repeat(indent);
        match self {
            PhysicalOperator::Scan(scan) => {
                output.push_str(&format!("{}Scan: {}\n", prefix, scan.relation()));
            }
            PhysicalOperator::Project(proj) => {
                output.push_str(&format!("{}Project: {:?}\n", prefix, proj.mapping()));
                proj.child().format_node(indent + 1, output);
            }
            PhysicalOperator::Filter(filter) => {
                output.push_str(&format!("{}Filter: {}\n", prefix, filter.predicate()));
                filter.child().format_node(indent + 1, output);
            }
        }
    }
}

impl Operator for PhysicalOperator {
    fn schema(&self) -> SchemaRef {
        match self {
            PhysicalOperator::Scan(op) => op.schema(),
            PhysicalOperator::Project(op) => op.schema(),
            PhysicalOperator::Filter(op) => op.schema(),
        }
    }

    fn open(&mut self) -> ExecResult<()> {
        match self {
            PhysicalOperator::Scan(op) => op.open(),
            PhysicalOperator::Project(op) => op.open(),
            PhysicalOperator::Filter(op) => op.open(),
        }
    }

    fn next(&mut self, ctx: &ExecutionContext) -> ExecResult<Option<RecordBatch>> {
        match self {
            PhysicalOperator::Scan(op) => op.next(ctx),
            PhysicalOperator::Project(op) => op.next(ctx),
            PhysicalOperator::Filter(op) => op.next(ctx),
        }
    }

    fn close(&mut self) -> ExecResult<()> {
        match self {
            PhysicalOperator::Scan(op) => op.close(),
            PhysicalOperator::Project(op) => op.close(),
            PhysicalOperator::Filter(op) => op.close(),
        }
    }
}

/// A physical plan ready for execution.
#[derive(Debug)]
pub struct PhysicalPlan {
    /// Root operator.
    pub root: PhysicalOperator,
    /// Number of leading root columns returned to the caller.
    pub output_width: usize,
}

impl PhysicalPlan {
    /// Returns a formatted string representation of the plan.
    pub fn display(&self) -> String {
        let mut output = String::new();
        self.root.format_node(0, &mut output);
        output
    }
}

impl fmt::Display for PhysicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
