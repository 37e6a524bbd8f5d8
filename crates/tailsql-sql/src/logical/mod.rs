//! Logical query plan representation.
//!
//! A logical plan is a small relational tree with three node kinds:
//! `NamedScan`, `Project` and `Filter`. It is produced by [`compile`] and
//! consumed by the physical planner, which only accepts the
//! `Filter(Project(NamedScan))` shape.

mod builder;
mod expr;
mod operator;
mod plan;

pub use builder::*;
pub use expr::*;
pub use operator::*;
pub use plan::*;
