//! # tailsql-common
//!
//! Shared types, configuration, and utilities for TailSQL.
//!
//! This crate provides the foundational pieces used by every TailSQL
//! component:
//!
//! - **Types**: The recursive field-tree [`Schema`] model and its mapping onto arrow
//! - **Config**: Stream (relation) configuration consumed at registration time
//! - **Memory**: Explicit memory accounting for materialized batches
//! - **Errors**: Stable error codes shared by every error enum
//! - **Constants**: System-wide defaults and limits
//!
//! ## Example
//!
//! ```rust
//! use tailsql_common::types::{Field, Schema, Type, TypeName};
//!
//! let schema = Schema::try_new(vec![
//!     Field::new("name", Type::scalar(TypeName::Utf8).unwrap(), false),
//!     Field::new("amount", Type::scalar(TypeName::Double).unwrap(), true),
//! ])
//! .unwrap();
//!
//! assert_eq!(schema.to_arrow().fields().len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod memory;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, SchemaError, SchemaResult};
pub use memory::{MemoryError, MemoryReservation, MemoryTracker};
pub use types::{Field, ScalarType, Schema, Type, TypeName};
