//! Query execution.
//!
//! Operators follow the pull (Volcano) protocol: `open`, then `next` until
//! it returns `None`, then `close`. Nothing runs ahead of a `next` call, so
//! a slow consumer naturally applies backpressure down to the scan.
//!
//! [`QueryEngine`] converts a logical plan and hands back a
//! [`ResultIterator`], the single consumer-facing cursor.

mod engine;
mod error;
mod iterator;
mod operators;

pub use engine::*;
pub use error::*;
pub use iterator::*;
pub use operators::*;
