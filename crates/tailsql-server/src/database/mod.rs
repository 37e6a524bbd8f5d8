//! # Datastore
//!
//! The registry of relations and the query interface on top of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Datastore                         │
//! │                                                          │
//! │  register(stream) ──► RelationCatalog ──► StoreWriter    │
//! │                            │                  │          │
//! │                            │           ingestion worker  │
//! │                            ▼                             │
//! │  query(rel, sql) ──► compile ──► QueryEngine::execute    │
//! │                                        │                 │
//! │                                        ▼                 │
//! │                                  ResultIterator          │
//! └──────────────────────────────────────────────────────────┘
//! ```

mod datastore;
mod error;

pub use datastore::{Datastore, DatastoreConfig};
pub use error::{DatastoreError, DatastoreResult};
