//! TailSQL Performance Benchmarks
//!
//! This crate contains benchmarks for:
//! - Columnar store appends and flushes
//! - SQL compilation
//! - Query execution over flushed and pending batches
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench -p tailsql-bench
//! ```

pub mod utils;
