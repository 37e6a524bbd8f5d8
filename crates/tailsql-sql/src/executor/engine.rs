//! Query execution engine.
//!
//! Converts a logical plan into a physical operator tree bound to a scan
//! source, opens it, and returns a [`ResultIterator`].

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::{ExecResult, Operator, ResultIterator};
use crate::logical::LogicalPlan;
use crate::physical::{ExecutionConfig, ExecutionContext, PhysicalPlan, PhysicalPlanner, ScanSource};

/// Runs compiled plans.
#[derive(Debug, Default)]
pub struct QueryEngine {
    config: ExecutionConfig,
    planner: PhysicalPlanner,
    next_query_id: AtomicU64,
}

impl QueryEngine {
    /// Creates an engine.
    pub fn new(config: ExecutionConfig) -> Self {
        Self {
            config,
            planner: PhysicalPlanner::new(),
            next_query_id: AtomicU64::new(1),
        }
    }

    /// Execution configuration applied to every query.
    pub fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Converts `plan` against `source` without running it.
    pub fn explain<S>(&self, plan: &LogicalPlan, source: &S) -> ExecResult<PhysicalPlan>
    where
        S: ScanSource + ?Sized,
    {
        self.planner.create_physical_plan(plan, source)
    }

    /// Converts and opens `plan`, returning a cursor over its results.
    ///
    /// If opening fails, the tree is closed before the error is returned.
    pub fn execute<S>(&self, plan: &LogicalPlan, source: &S) -> ExecResult<ResultIterator>
    where
        S: ScanSource + ?Sized,
    {
        let query_id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
        let PhysicalPlan {
            mut root,
            output_width,
        } = self.planner.create_physical_plan(plan, source)?;

        if let Err(e) = root.open() {
            if let Err(close_err) = root.close() {
                warn!(query_id, error = %close_err, "close after failed open");
            }
            return Err(e);
        }
        debug!(query_id, relation = ?plan.relation(), "query started");

        let ctx = ExecutionContext::new(query_id, self.config.clone());
        ResultIterator::try_new(root, ctx, output_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ExecutionError;
    use crate::logical::compile;
    use crate::storage::{RelationCatalog, StoreWriter};
    use arrow::array::{Float64Array, StringArray};
    use bytes::Bytes;
    use std::time::Duration;
    use tailsql_common::config::{InputFormat, StreamConfig};
    use tailsql_common::memory::MemoryTracker;
    use tailsql_common::{Field, Schema, Type, TypeName};

    fn catalog(capacity: usize) -> (RelationCatalog, StoreWriter) {
        let catalog = RelationCatalog::new(MemoryTracker::unbounded());
        let schema = Schema::try_new(vec![
            Field::new("name", Type::scalar(TypeName::Utf8).unwrap(), false),
            Field::new("amount", Type::scalar(TypeName::Double).unwrap(), false),
            Field::new("id", Type::scalar(TypeName::Int).unwrap(), false),
        ])
        .unwrap();
        let writer = catalog
            .register(
                &StreamConfig::new("events", InputFormat::Json, schema)
                    .with_buffer_capacity(capacity),
            )
            .unwrap();
        (catalog, writer)
    }

    fn put(writer: &mut StoreWriter, offset: i64, name: &str, amount: f64) {
        let value = format!(r#"{{"name":"{name}","amount":{amount:?},"id":{offset}}}"#);
        writer.put(offset, Bytes::new(), Bytes::from(value)).unwrap();
    }

    fn amounts(batches: &[arrow::record_batch::RecordBatch]) -> Vec<Vec<f64>> {
        batches
            .iter()
            .map(|b| {
                b.column(0)
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .unwrap()
                    .values()
                    .to_vec()
            })
            .collect()
    }

    #[test]
    fn test_execute_filters_and_trims() {
        let (catalog, mut writer) = catalog(2);
        put(&mut writer, 0, "x", 1.0);
        put(&mut writer, 1, "y", 2.0);
        put(&mut writer, 2, "x", 3.0);

        let plan = compile(r#"SELECT amount FROM events WHERE name = "x""#, &catalog).unwrap();
        let engine = QueryEngine::default();
        let results = engine.execute(&plan, &catalog).unwrap();
        assert_eq!(results.schema().fields().len(), 1);

        let batches = results.collect_batches().unwrap();
        // Pending buffer first, then the materialized batch.
        assert_eq!(amounts(&batches), vec![vec![3.0], vec![1.0]]);
        assert!(batches.iter().all(|b| b.num_columns() == 1));
    }

    #[test]
    fn test_selected_predicate_column_is_kept() {
        let (catalog, mut writer) = catalog(8);
        put(&mut writer, 0, "x", 1.0);

        let plan = compile("SELECT name, amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let mut results = QueryEngine::default().execute(&plan, &catalog).unwrap();
        assert!(results.next().unwrap());
        let batch = results.value().unwrap();
        assert_eq!(batch.num_columns(), 2);
        let names = batch.column(0).as_any().downcast_ref::<StringArray>().unwrap();
        assert_eq!(names.value(0), "x");
        assert!(!results.next().unwrap());
        assert!(results.value().is_none());
    }

    #[test]
    fn test_no_match_yields_nothing() {
        let (catalog, mut writer) = catalog(2);
        for i in 0..5 {
            put(&mut writer, i, "y", i as f64);
        }
        let plan = compile("SELECT amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let mut results = QueryEngine::default().execute(&plan, &catalog).unwrap();
        assert!(!results.next().unwrap());
        assert!(!results.next().unwrap());
    }

    #[test]
    fn test_integer_predicate() {
        let (catalog, mut writer) = catalog(4);
        for i in 0..6 {
            put(&mut writer, i, "x", i as f64 * 10.0);
        }
        let plan = compile("SELECT amount FROM events WHERE id = 4", &catalog).unwrap();
        let batches = QueryEngine::default()
            .execute(&plan, &catalog)
            .unwrap()
            .collect_batches()
            .unwrap();
        assert_eq!(amounts(&batches), vec![vec![40.0]]);
    }

    #[test]
    fn test_incompatible_literal_fails_at_conversion() {
        let (catalog, _writer) = catalog(4);
        let plan = compile("SELECT amount FROM events WHERE id = 'abc'", &catalog).unwrap();
        let err = QueryEngine::default().execute(&plan, &catalog).unwrap_err();
        assert!(matches!(err, ExecutionError::Evaluation(_)));
    }

    #[test]
    fn test_cancel() {
        let (catalog, mut writer) = catalog(4);
        put(&mut writer, 0, "x", 1.0);
        let plan = compile("SELECT amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let mut results = QueryEngine::default().execute(&plan, &catalog).unwrap();
        results.cancel_handle().cancel();
        assert!(matches!(results.next(), Err(ExecutionError::Cancelled)));
        assert!(!results.next().unwrap());
    }

    #[test]
    fn test_timeout() {
        let (catalog, mut writer) = catalog(4);
        put(&mut writer, 0, "x", 1.0);
        let plan = compile("SELECT amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let engine = QueryEngine::new(ExecutionConfig::default().with_query_timeout(Duration::ZERO));
        let mut results = engine.execute(&plan, &catalog).unwrap();
        assert!(matches!(results.next(), Err(ExecutionError::Timeout(_))));
    }

    #[test]
    fn test_close_releases_scan_memory() {
        let (catalog, mut writer) = catalog(8);
        put(&mut writer, 0, "x", 1.0);
        let plan = compile("SELECT amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let mut results = QueryEngine::default().execute(&plan, &catalog).unwrap();
        assert!(results.next().unwrap());
        assert!(catalog.memory().used() > 0);
        results.close().unwrap();
        assert_eq!(catalog.memory().used(), 0);
        assert!(results.value().is_none());
    }

    #[test]
    fn test_decode_error_aborts_and_closes() {
        let (catalog, mut writer) = catalog(8);
        put(&mut writer, 0, "x", 1.0);
        writer
            .put(1, Bytes::new(), Bytes::from_static(b"{bad"))
            .unwrap();

        let plan = compile("SELECT amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let mut results = QueryEngine::default().execute(&plan, &catalog).unwrap();
        match results.next() {
            Err(ExecutionError::Storage(e)) => assert!(e.is_decode()),
            other => panic!("expected a decode error, got {other:?}"),
        }
        assert!(!results.next().unwrap());
        assert!(results.value().is_none());
        assert_eq!(catalog.memory().used(), 0);
    }

    #[test]
    fn test_explain() {
        let (catalog, _writer) = catalog(4);
        let plan = compile("SELECT amount FROM events WHERE name = 'x'", &catalog).unwrap();
        let physical = QueryEngine::default().explain(&plan, &catalog).unwrap();
        assert_eq!(
            physical.to_string(),
            "Filter: name@1 = 'x'\n  Project: [1, 0]\n    Scan: events\n"
        );
    }
}
