//! Relation registry and query interface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use arrow::record_batch::RecordBatch;
use tracing::{debug, info};

use tailsql_common::config::StreamConfig;
use tailsql_common::memory::MemoryTracker;
use tailsql_sql::executor::{QueryEngine, ResultIterator};
use tailsql_sql::logical::{compile, LogicalPlan, RelationResolver, ResolvedRelation};
use tailsql_sql::physical::ExecutionConfig;
use tailsql_sql::storage::{BatchIterator, RelationCatalog, StoreStats, StoreWriter};

use super::error::DatastoreResult;
use crate::config::ServerConfig;

/// Datastore configuration.
#[derive(Debug, Clone, Default)]
pub struct DatastoreConfig {
    /// Limit on memory held by columnar batches, in bytes.
    pub memory_limit: Option<usize>,
    /// Per-query deadline.
    pub query_timeout: Option<Duration>,
}

impl DatastoreConfig {
    /// Sets the memory limit.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Sets the query timeout.
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }
}

impl From<&ServerConfig> for DatastoreConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            memory_limit: config.memory_limit_bytes(),
            query_timeout: config.query_timeout(),
        }
    }
}

/// Registry of relations plus the query interface.
///
/// Shared across request handlers; every method takes `&self`.
#[derive(Debug)]
pub struct Datastore {
    catalog: RelationCatalog,
    engine: QueryEngine,
    started_at: Instant,
}

impl Datastore {
    /// Creates an empty datastore.
    pub fn new(config: DatastoreConfig) -> Self {
        let memory = match config.memory_limit {
            Some(limit) => MemoryTracker::with_limit(limit),
            None => MemoryTracker::unbounded(),
        };
        let mut execution = ExecutionConfig::default();
        execution.query_timeout = config.query_timeout;
        Self {
            catalog: RelationCatalog::new(memory),
            engine: QueryEngine::new(execution),
            started_at: Instant::now(),
        }
    }

    /// Creates an empty datastore from server configuration.
    ///
    /// Streams are not registered; call [`register`](Self::register) for
    /// each to obtain its writer.
    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(DatastoreConfig::from(config))
    }

    /// Registers the relation described by `stream`.
    ///
    /// Returns the relation's only writer, to be handed to its ingestion
    /// worker.
    pub fn register(&self, stream: &StreamConfig) -> DatastoreResult<StoreWriter> {
        Ok(self.catalog.register(stream)?)
    }

    /// Compiles and runs `sql`, resolving only `relation`.
    ///
    /// Naming any other relation in the query fails with `UnknownRelation`.
    pub fn query(&self, relation: &str, sql: &str) -> DatastoreResult<ResultIterator> {
        let resolver = |name: &str| -> Option<ResolvedRelation> {
            if name == relation {
                self.catalog.resolve_relation(name)
            } else {
                None
            }
        };
        let plan = compile(sql, &resolver)?;
        self.run(plan)
    }

    /// Compiles and runs `sql` against every registered relation.
    pub fn sql(&self, sql: &str) -> DatastoreResult<ResultIterator> {
        let plan = compile(sql, &self.catalog)?;
        self.run(plan)
    }

    /// Renders the physical plan `sql` would run.
    pub fn explain(&self, sql: &str) -> DatastoreResult<String> {
        let plan = compile(sql, &self.catalog)?;
        let physical = self.engine.explain(&plan, &self.catalog)?;
        Ok(physical.display())
    }

    /// Iterates every batch of `relation` without a predicate.
    pub fn scan(&self, relation: &str) -> DatastoreResult<BatchIterator> {
        Ok(self.catalog.store(relation)?.iterator(None))
    }

    /// Returns the latest value stored under `key` as a one-row batch.
    pub fn get(&self, relation: &str, key: &[u8]) -> DatastoreResult<RecordBatch> {
        Ok(self.catalog.store(relation)?.get(key)?)
    }

    /// Statistics of one relation's store.
    pub fn stats(&self, relation: &str) -> DatastoreResult<StoreStats> {
        Ok(self.catalog.store(relation)?.stats())
    }

    /// Registered relation names, sorted.
    pub fn relation_names(&self) -> Vec<String> {
        self.catalog.relation_names()
    }

    /// Memory tracker shared by all stores.
    pub fn memory(&self) -> &Arc<MemoryTracker> {
        self.catalog.memory()
    }

    /// Time since the datastore was created.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    fn run(&self, plan: LogicalPlan) -> DatastoreResult<ResultIterator> {
        debug!(plan = %plan.display().trim_end(), "compiled query");
        let results = self.engine.execute(&plan, &self.catalog)?;
        info!(
            query_id = results.query_id(),
            relation = plan.relation().unwrap_or_default(),
            "executing query"
        );
        Ok(results)
    }
}
