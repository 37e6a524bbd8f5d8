//! Physical plan generation.
//!
//! This module converts logical plans into trees of pull-based operators.
//!
//! # Architecture
//!
//! - **PhysicalExpr**: Compiled predicate evaluated against whole batches
//! - **PhysicalOperator**: Closed set of executable operators
//! - **PhysicalPlan**: Operator tree plus the declared output width
//! - **ExecutionContext**: Per-query deadline and cancellation state
//! - **PhysicalPlanner**: Converts logical plans to physical plans
//!
//! # Physical Operators
//!
//! | Logical Operator | Physical Operator |
//! |-----------------|-------------------|
//! | NamedScan | Scan over the store's batch iterator |
//! | Project | Project (zero-copy column selection) |
//! | Filter | Filter (selection vector + compaction) |
//!
//! Only the `Filter(Project(NamedScan))` shape is accepted.

mod context;
mod expr;
mod operator;
mod planner;

pub use context::*;
pub use expr::*;
pub use operator::*;
pub use planner::*;
