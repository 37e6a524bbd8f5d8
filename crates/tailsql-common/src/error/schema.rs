//! Schema validation errors.

use thiserror::Error;

use super::ErrorCode;

/// Errors raised while building or converting a [`Schema`](crate::types::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The type tree does not match its tag.
    #[error("invalid type '{name}': {reason}")]
    InvalidType {
        /// Type name as written.
        name: String,
        /// What is wrong with the nested parts.
        reason: String,
    },

    /// Two fields of one field list share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    /// A field list that must contain at least one field is empty.
    #[error("field list of '{0}' is empty")]
    EmptyFields(String),

    /// An arrow type has no counterpart in the type model.
    #[error("unsupported arrow type for field '{field}': {data_type}")]
    UnsupportedArrowType {
        /// Field carrying the type.
        field: String,
        /// Debug rendering of the arrow data type.
        data_type: String,
    },
}

impl SchemaError {
    /// Returns the error code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidType { .. } | Self::EmptyFields(_) => ErrorCode::InvalidType,
            Self::DuplicateField(_) => ErrorCode::DuplicateField,
            Self::UnsupportedArrowType { .. } => ErrorCode::UnsupportedType,
        }
    }
}
