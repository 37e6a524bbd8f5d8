//! Datastore error types.

use thiserror::Error;

use tailsql_common::ErrorCode;
use tailsql_sql::executor::ExecutionError;
use tailsql_sql::logical::CompileError;
use tailsql_sql::storage::StoreError;

/// Datastore errors.
#[derive(Debug, Error)]
pub enum DatastoreError {
    /// SQL compilation failed.
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Plan conversion or execution failed.
    #[error("execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// Registration, lookup or scan failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl DatastoreError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DatastoreError::Compile(e) => e.code(),
            DatastoreError::Execution(e) => e.code(),
            DatastoreError::Storage(e) => e.code(),
        }
    }
}

/// Datastore result type.
pub type DatastoreResult<T> = Result<T, DatastoreError>;
