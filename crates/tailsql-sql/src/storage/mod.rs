//! Buffered columnar storage.
//!
//! Each relation is backed by a [`ColumnarStore`]. Raw records are appended
//! to a fixed-capacity pending buffer; when it fills up, the buffer is
//! decoded into one immutable arrow batch and appended to the store's batch
//! arena.
//!
//! # Architecture
//!
//! ```text
//!   ingestion worker                         queries
//!         │                                     │
//!         ▼                                     ▼
//! ┌───────────────┐   put()    ┌──────────────────────────────┐
//! │  StoreWriter  │──────────► │        ColumnarStore         │
//! │ (one per rel) │            │  pending: [(off, key, val)]  │
//! └───────────────┘            │  batches: [RecordBatch; n]   │
//!                              │  keys:    key -> position    │
//!                              └──────────────┬───────────────┘
//!                                             │ iterator()
//!                                             ▼
//!                              ┌──────────────────────────────┐
//!                              │        BatchIterator         │
//!                              │ pending (decoded on demand), │
//!                              │ then batches newest first    │
//!                              └──────────────────────────────┘
//! ```

mod catalog;
mod decoder;
mod error;
mod iterator;
mod store;

pub use catalog::{Relation, RelationCatalog};
pub use decoder::RecordDecoder;
pub use error::{StoreError, StoreResult};
pub use iterator::BatchIterator;
pub use store::{ColumnarStore, StoreConfig, StoreStats, StoreWriter};
