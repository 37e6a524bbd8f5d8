//! # tailsql-server
//!
//! Query service for TailSQL.
//!
//! This crate provides:
//!
//! - **Datastore**: the registry of relations plus the query interface.
//!   Relations are registered from stream configurations; queries are
//!   compiled against the registry and executed into result iterators.
//!
//! - **Ingestion**: one background worker per relation that owns the
//!   relation's only store writer and appends records in arrival order.
//!
//! - **Output**: line-delimited JSON serialization of result batches.
//!
//! # Quick Start
//!
//! ```ignore
//! use tailsql_server::config::ServerConfig;
//! use tailsql_server::database::Datastore;
//! use tailsql_server::ingest::{spawn_ingest, IngestRecord};
//!
//! let config = ServerConfig::from_file("tailsql.toml".as_ref())?;
//! let datastore = Datastore::from_config(&config);
//! let writer = datastore.register(&config.streams[0])?;
//! let (sender, worker) = spawn_ingest(writer, config.ingest_queue_capacity, config.streams[0].on_decode_error);
//!
//! sender.send(IngestRecord::new(0, "k", r#"{"name":"x","amount":1.0}"#)).await?;
//! drop(sender);
//! worker.await??;
//!
//! let rows = datastore.query("events", "SELECT amount FROM events WHERE name = 'x'")?;
//! tailsql_server::output::write_json_rows(std::io::stdout(), rows)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Server configuration.
pub mod config;

/// Relation registry and query interface.
pub mod database;

/// Background ingestion workers.
pub mod ingest;

/// Result serialization.
pub mod output;

pub use config::ServerConfig;
pub use database::{Datastore, DatastoreError, DatastoreResult};
pub use ingest::{spawn_ingest, IngestRecord, IngestSender, IngestStats};
