//! Memory accounting for TailSQL.
//!
//! Batches are allocated by arrow; this module only tracks how many bytes
//! are held on behalf of each store and iterator. A [`MemoryTracker`] is
//! created once and passed explicitly to every component that materializes
//! batches. There is no global tracker.

mod tracker;

pub use tracker::{MemoryError, MemoryReservation, MemoryTracker};
