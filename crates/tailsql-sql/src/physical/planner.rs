//! Logical to physical plan conversion.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::{PhysicalExpr, PhysicalOperator, PhysicalPlan};
use crate::executor::{ExecResult, ExecutionError, FilterExec, ProjectExec, ScanExec};
use crate::logical::{LogicalOperator, LogicalPlan};
use crate::storage::BatchIterator;

/// Opens batch iterators over registered relations.
pub trait ScanSource {
    /// Returns a fresh iterator over `relation`, or `None` if unknown.
    fn scan(&self, relation: &str) -> Option<BatchIterator>;
}

/// Converts logical plans into physical operator trees.
#[derive(Debug, Default)]
pub struct PhysicalPlanner;

impl PhysicalPlanner {
    /// Creates a new physical planner.
    pub fn new() -> Self {
        Self
    }

    /// Converts `plan`, binding its scan to `source`.
    ///
    /// Only `Filter(Project(NamedScan))` is accepted; every other shape
    /// yields [`ExecutionError::UnsupportedQueryShape`].
    pub fn create_physical_plan<S>(&self, plan: &LogicalPlan, source: &S) -> ExecResult<PhysicalPlan>
    where
        S: ScanSource + ?Sized,
    {
        let start = Instant::now();

        let LogicalOperator::Filter(filter) = plan.root.as_ref() else {
            return Err(unexpected("Filter", &plan.root));
        };
        let LogicalOperator::Project(project) = filter.input.as_ref() else {
            return Err(unexpected("Project", &filter.input));
        };
        let LogicalOperator::NamedScan(scan) = project.input.as_ref() else {
            return Err(unexpected("NamedScan", &project.input));
        };

        if plan.output_names.len() > project.schema.fields().len() {
            return Err(ExecutionError::UnsupportedQueryShape(format!(
                "{} output names for {} projected columns",
                plan.output_names.len(),
                project.schema.fields().len()
            )));
        }

        let input = source
            .scan(&scan.relation)
            .ok_or_else(|| ExecutionError::UnknownRelation(scan.relation.clone()))?;
        if input.schema().fields() != scan.schema.fields() {
            return Err(ExecutionError::SchemaMismatch(scan.relation.clone()));
        }

        let predicate = PhysicalExpr::try_new(&filter.condition, &project.schema)?;

        let scan_exec = PhysicalOperator::Scan(ScanExec::new(scan.relation.clone(), input));
        let project_exec = PhysicalOperator::Project(ProjectExec::new(
            Box::new(scan_exec),
            project.mapping.clone(),
            Arc::clone(&project.schema),
        ));
        let root = PhysicalOperator::Filter(FilterExec::new(Box::new(project_exec), predicate));

        let physical = PhysicalPlan {
            root,
            output_width: plan.output_names.len(),
        };
        debug!(
            relation = %scan.relation,
            elapsed_us = start.elapsed().as_micros() as u64,
            plan = %physical.display().trim_end(),
            "created physical plan"
        );
        Ok(physical)
    }
}

fn unexpected(expected: &str, found: &LogicalOperator) -> ExecutionError {
    ExecutionError::UnsupportedQueryShape(format!(
        "expected {expected}, found {}",
        found.name()
    ))
}
