//! Storage error types.

use std::fmt;

use arrow::datatypes::DataType;
use tailsql_common::config::InputFormat;
use tailsql_common::{ErrorCode, MemoryError};

use crate::physical::EvalError;

/// Storage error type.
#[derive(Debug)]
pub enum StoreError {
    /// Raw records could not be decoded into a batch.
    Decode {
        /// Relation being materialized.
        relation: String,
        /// Decoder message.
        reason: String,
    },
    /// A pushed-down predicate failed against a batch.
    Evaluation(EvalError),
    /// No value stored for the key.
    KeyNotFound(String),
    /// A column type cannot be expressed in the input format.
    UnsupportedType {
        /// Column name.
        field: String,
        /// Column type.
        data_type: DataType,
        /// Configured format.
        format: InputFormat,
    },
    /// Relation already registered.
    RelationExists(String),
    /// Relation not registered.
    RelationNotFound(String),
    /// Stream configuration rejected.
    InvalidConfig(String),
    /// Memory limit exceeded while materializing.
    Memory(MemoryError),
}

impl StoreError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::Decode { .. } => ErrorCode::DecodeFailed,
            StoreError::Evaluation(_) => ErrorCode::ExpressionEvaluation,
            StoreError::KeyNotFound(_) => ErrorCode::KeyNotFound,
            StoreError::UnsupportedType { .. } => ErrorCode::UnsupportedType,
            StoreError::RelationExists(_) => ErrorCode::RelationExists,
            StoreError::RelationNotFound(_) => ErrorCode::RelationNotFound,
            StoreError::InvalidConfig(_) => ErrorCode::InvalidArgument,
            StoreError::Memory(e) => e.code(),
        }
    }

    /// Returns true for decode failures.
    pub fn is_decode(&self) -> bool {
        matches!(self, StoreError::Decode { .. })
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Decode { relation, reason } => {
                write!(f, "Decode error in relation '{}': {}", relation, reason)
            }
            StoreError::Evaluation(e) => write!(f, "Expression evaluation error: {}", e),
            StoreError::KeyNotFound(key) => write!(f, "Key not found: {}", key),
            StoreError::UnsupportedType {
                field,
                data_type,
                format,
            } => write!(
                f,
                "Column '{}' of type {} is not supported by the {} format",
                field, data_type, format
            ),
            StoreError::RelationExists(name) => write!(f, "Relation already exists: {}", name),
            StoreError::RelationNotFound(name) => write!(f, "Relation not found: {}", name),
            StoreError::InvalidConfig(msg) => write!(f, "Invalid stream configuration: {}", msg),
            StoreError::Memory(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Evaluation(e) => Some(e),
            StoreError::Memory(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EvalError> for StoreError {
    fn from(e: EvalError) -> Self {
        StoreError::Evaluation(e)
    }
}

impl From<MemoryError> for StoreError {
    fn from(e: MemoryError) -> Self {
        StoreError::Memory(e)
    }
}

/// Storage result type.
pub type StoreResult<T> = Result<T, StoreError>;
