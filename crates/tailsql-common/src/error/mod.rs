//! Error handling for TailSQL.
//!
//! Every subsystem defines its own error enum; this module holds the stable
//! numeric [`ErrorCode`] table they all map onto, plus the schema
//! validation error used at configuration load time.

mod codes;
mod schema;

pub use codes::ErrorCode;
pub use schema::SchemaError;

/// Result type alias for schema construction and conversion.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;
