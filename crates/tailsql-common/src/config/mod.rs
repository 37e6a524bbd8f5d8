//! Configuration for TailSQL relations.
//!
//! Each ingested stream is described by a [`StreamConfig`]: the relation
//! name it is exposed under, the raw record format, buffer sizing and the
//! schema of its columns.

mod stream;

pub use stream::{DecodeErrorPolicy, InputFormat, StreamConfig};
