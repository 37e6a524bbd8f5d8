//! Stable error codes.

use std::fmt;

/// Error codes for categorizing errors.
///
/// These codes can be used for programmatic error handling and
/// are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // General errors (0x0000 - 0x00FF)
    /// Unknown or unspecified error.
    Unknown = 0x0000,
    /// Internal error (bug).
    Internal = 0x0001,
    /// Operation not supported.
    NotSupported = 0x0002,
    /// Invalid argument provided.
    InvalidArgument = 0x0003,
    /// Operation timed out.
    Timeout = 0x0004,
    /// Operation was cancelled.
    Cancelled = 0x0005,
    /// Memory limit exceeded.
    ResourcesExhausted = 0x0006,

    // Schema errors (0x0100 - 0x01FF)
    /// Malformed type tree.
    InvalidType = 0x0100,
    /// Field name repeated within one field list.
    DuplicateField = 0x0101,
    /// Type cannot be represented by the target format.
    UnsupportedType = 0x0102,

    // Storage errors (0x0200 - 0x02FF)
    /// Raw record could not be decoded.
    DecodeFailed = 0x0200,
    /// Key not found.
    KeyNotFound = 0x0201,
    /// Relation already registered.
    RelationExists = 0x0202,
    /// Relation not registered.
    RelationNotFound = 0x0203,

    // Query errors (0x0300 - 0x03FF)
    /// SQL syntax error.
    SyntaxError = 0x0300,
    /// Relation named in a query is unknown.
    UnknownRelation = 0x0301,
    /// Column named in a query is unknown.
    UnknownColumn = 0x0302,
    /// Query uses a construct outside the supported shape.
    UnsupportedQueryShape = 0x0303,
    /// Literal could not be coerced.
    LiteralConversion = 0x0304,
    /// Predicate evaluation failed.
    ExpressionEvaluation = 0x0305,
    /// Query execution failed.
    ExecutionFailed = 0x0306,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x00 => "General",
            0x01 => "Schema",
            0x02 => "Storage",
            0x03 => "Query",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::Cancelled.category(), "General");
        assert_eq!(ErrorCode::DuplicateField.category(), "Schema");
        assert_eq!(ErrorCode::DecodeFailed.category(), "Storage");
        assert_eq!(ErrorCode::UnknownColumn.category(), "Query");
    }

    #[test]
    fn test_error_code_value() {
        assert_eq!(ErrorCode::SyntaxError.as_u16(), 0x0300);
        assert_eq!(ErrorCode::KeyNotFound.to_string(), "KeyNotFound");
    }
}
