//! # tailsql-test
//!
//! End-to-end tests for TailSQL.
//!
//! The scenarios live in `tests/`; this library holds the fixtures they
//! share.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Shared schemas, records and result helpers.
pub mod fixtures;
