//! Schema model for TailSQL relations.
//!
//! A relation's schema is an ordered, recursive field tree. Field order is
//! significant: it defines column positions in every batch produced for the
//! relation. The [`arrow`] submodule maps this model onto the arrow physical
//! schema used by materialized batches.

mod arrow;
mod schema;

pub use schema::{Field, ScalarType, Schema, SchemaRef, Type, TypeName};
