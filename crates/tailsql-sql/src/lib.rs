//! # tailsql-sql
//!
//! Query compilation and execution for TailSQL.
//!
//! This crate implements:
//! - SQL parsing (MySQL dialect, single statement)
//! - Compilation of `SELECT <cols> FROM <relation> WHERE <col> = <literal>`
//!   into a logical plan
//! - Conversion of logical plans into pull-based operator trees
//! - Buffered columnar stores with lazy batch iteration
//!
//! ## Example
//!
//! ```rust
//! use bytes::Bytes;
//! use tailsql_common::config::{InputFormat, StreamConfig};
//! use tailsql_common::memory::MemoryTracker;
//! use tailsql_common::types::{Field, Schema, Type, TypeName};
//! use tailsql_sql::executor::QueryEngine;
//! use tailsql_sql::logical::compile;
//! use tailsql_sql::physical::ExecutionConfig;
//! use tailsql_sql::storage::RelationCatalog;
//!
//! let catalog = RelationCatalog::new(MemoryTracker::unbounded());
//! let schema = Schema::try_new(vec![
//!     Field::new("name", Type::scalar(TypeName::Utf8).unwrap(), false),
//!     Field::new("amount", Type::scalar(TypeName::Double).unwrap(), false),
//! ])
//! .unwrap();
//! let mut writer = catalog
//!     .register(&StreamConfig::new("events", InputFormat::Json, schema))
//!     .unwrap();
//! writer
//!     .put(0, Bytes::new(), Bytes::from_static(br#"{"name":"x","amount":1.0}"#))
//!     .unwrap();
//!
//! let plan = compile(r#"SELECT amount FROM events WHERE name = "x""#, &catalog).unwrap();
//! let engine = QueryEngine::new(ExecutionConfig::default());
//! let mut results = engine.execute(&plan, &catalog).unwrap();
//! assert!(results.next().unwrap());
//! assert_eq!(results.value().unwrap().num_rows(), 1);
//! assert!(!results.next().unwrap());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// SQL text parsing
pub mod parser;

/// Logical plan representation and compiler
pub mod logical;

/// Physical conversion and execution context
pub mod physical;

/// Pull-based query execution
pub mod executor;

/// Buffered columnar storage
pub mod storage;
