//! Registry of named relations.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use tailsql_common::config::StreamConfig;
use tailsql_common::memory::MemoryTracker;
use tailsql_common::Schema;

use super::{BatchIterator, ColumnarStore, StoreConfig, StoreError, StoreResult, StoreWriter};
use crate::logical::{RelationResolver, ResolvedRelation};
use crate::physical::ScanSource;

/// A registered relation.
#[derive(Debug, Clone)]
pub struct Relation {
    /// Relation name, equal to the stream topic.
    pub name: String,
    /// Declared schema.
    pub schema: Schema,
    /// Backing store.
    pub store: Arc<ColumnarStore>,
}

/// Catalog of relations sharing one memory tracker.
#[derive(Debug)]
pub struct RelationCatalog {
    relations: RwLock<HashMap<String, Relation>>,
    memory: Arc<MemoryTracker>,
}

impl RelationCatalog {
    /// Creates an empty catalog.
    pub fn new(memory: Arc<MemoryTracker>) -> Self {
        Self {
            relations: RwLock::new(HashMap::new()),
            memory,
        }
    }

    /// Registers a relation for `config` and returns its only writer.
    pub fn register(&self, config: &StreamConfig) -> StoreResult<StoreWriter> {
        config.validate().map_err(StoreError::InvalidConfig)?;

        let mut relations = self.relations.write();
        if relations.contains_key(&config.topic) {
            return Err(StoreError::RelationExists(config.topic.clone()));
        }
        let (store, writer) = ColumnarStore::try_new(
            config.topic.clone(),
            Arc::new(config.schema.to_arrow()),
            StoreConfig::from(config),
            Arc::clone(&self.memory),
        )?;
        relations.insert(
            config.topic.clone(),
            Relation {
                name: config.topic.clone(),
                schema: config.schema.clone(),
                store,
            },
        );
        info!(
            relation = %config.topic,
            format = %config.format,
            capacity = config.buffer_capacity,
            "registered relation"
        );
        Ok(writer)
    }

    /// Looks up a relation.
    pub fn relation(&self, name: &str) -> Option<Relation> {
        self.relations.read().get(name).cloned()
    }

    /// Looks up a relation's store.
    pub fn store(&self, name: &str) -> StoreResult<Arc<ColumnarStore>> {
        self.relations
            .read()
            .get(name)
            .map(|r| Arc::clone(&r.store))
            .ok_or_else(|| StoreError::RelationNotFound(name.to_string()))
    }

    /// Registered relation names, sorted.
    pub fn relation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.relations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Memory tracker shared by all stores.
    pub fn memory(&self) -> &Arc<MemoryTracker> {
        &self.memory
    }
}

impl RelationResolver for RelationCatalog {
    fn resolve_relation(&self, name: &str) -> Option<ResolvedRelation> {
        self.relations.read().get(name).map(|r| ResolvedRelation {
            name: r.name.clone(),
            schema: r.store.schema(),
        })
    }
}

impl ScanSource for RelationCatalog {
    fn scan(&self, relation: &str) -> Option<BatchIterator> {
        let store = self.relations.read().get(relation).map(|r| Arc::clone(&r.store))?;
        Some(store.iterator(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tailsql_common::config::InputFormat;
    use tailsql_common::{Field, Type, TypeName};

    fn events_config() -> StreamConfig {
        let schema = Schema::try_new(vec![
            Field::new("name", Type::scalar(TypeName::Utf8).unwrap(), false),
            Field::new("amount", Type::scalar(TypeName::Double).unwrap(), false),
        ])
        .unwrap();
        StreamConfig::new("events", InputFormat::Json, schema).with_buffer_capacity(2)
    }

    #[test]
    fn test_register_and_resolve() {
        let catalog = RelationCatalog::new(MemoryTracker::unbounded());
        let mut writer = catalog.register(&events_config()).unwrap();
        writer
            .put(0, Bytes::new(), Bytes::from_static(br#"{"name":"x","amount":1.0}"#))
            .unwrap();

        let resolved = catalog.resolve_relation("events").unwrap();
        assert_eq!(resolved.name, "events");
        assert_eq!(resolved.schema.fields().len(), 2);
        assert!(catalog.resolve_relation("other").is_none());

        let rows: usize = catalog
            .scan("events")
            .unwrap()
            .map(|b| b.unwrap().num_rows())
            .sum();
        assert_eq!(rows, 1);
        assert!(catalog.scan("other").is_none());
        assert_eq!(catalog.relation_names(), vec!["events".to_string()]);
    }

    #[test]
    fn test_register_twice() {
        let catalog = RelationCatalog::new(MemoryTracker::unbounded());
        catalog.register(&events_config()).unwrap();
        let err = catalog.register(&events_config()).unwrap_err();
        assert!(matches!(err, StoreError::RelationExists(name) if name == "events"));
    }

    #[test]
    fn test_store_not_found() {
        let catalog = RelationCatalog::new(MemoryTracker::unbounded());
        assert!(matches!(
            catalog.store("nope"),
            Err(StoreError::RelationNotFound(_))
        ));
    }
}
