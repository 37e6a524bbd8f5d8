//! Execution errors.

use std::time::Duration;

use arrow::error::ArrowError;
use thiserror::Error;

use tailsql_common::ErrorCode;

use crate::physical::EvalError;
use crate::storage::StoreError;

/// Error type for execution.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The plan is not `Filter(Project(NamedScan))`.
    #[error("Unsupported query shape: {0}")]
    UnsupportedQueryShape(String),

    /// The scanned relation is not registered.
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),

    /// The relation schema differs from the one the plan was compiled with.
    #[error("Schema of relation '{0}' does not match the plan")]
    SchemaMismatch(String),

    /// Predicate binding or evaluation failed.
    #[error("Expression evaluation failed: {0}")]
    Evaluation(#[from] EvalError),

    /// The store failed to produce a batch.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// The query was cancelled through its handle.
    #[error("Query cancelled")]
    Cancelled,

    /// The query ran past its deadline.
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// Arrow kernel failure.
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

impl ExecutionError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ExecutionError::UnsupportedQueryShape(_) => ErrorCode::UnsupportedQueryShape,
            ExecutionError::UnknownRelation(_) => ErrorCode::UnknownRelation,
            ExecutionError::SchemaMismatch(_) => ErrorCode::InvalidArgument,
            ExecutionError::Evaluation(_) => ErrorCode::ExpressionEvaluation,
            ExecutionError::Storage(e) => e.code(),
            ExecutionError::Cancelled => ErrorCode::Cancelled,
            ExecutionError::Timeout(_) => ErrorCode::Timeout,
            ExecutionError::Arrow(_) => ErrorCode::ExecutionFailed,
        }
    }
}

/// Result type for execution.
pub type ExecResult<T> = Result<T, ExecutionError>;
