//! SQL parser for TailSQL.
//!
//! Thin wrapper over the `sqlparser` crate. The MySQL dialect is used so
//! that both `'x'` and `"x"` are string literals, while identifiers may be
//! quoted with backticks.
//!
//! # Usage
//!
//! ```
//! use tailsql_sql::parser::Parser;
//!
//! let statement = Parser::parse_one(r#"SELECT amount FROM events WHERE name = "x""#).unwrap();
//! ```

use sqlparser::ast::Statement;
use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser as SqlParser;
use thiserror::Error;

use tailsql_common::MAX_QUERY_LENGTH;

/// Errors that can occur during SQL parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Error from the underlying sqlparser crate.
    #[error("SQL syntax error: {0}")]
    Syntax(String),

    /// Empty query.
    #[error("Empty query")]
    EmptyQuery,

    /// More than one statement in the text.
    #[error("Expected 1 statement, got {0}")]
    MultipleStatements(usize),

    /// Query text longer than the accepted maximum.
    #[error("Query length {length} exceeds maximum of {max} bytes")]
    TooLong {
        /// Length of the rejected text.
        length: usize,
        /// Accepted maximum.
        max: usize,
    },
}

impl From<sqlparser::parser::ParserError> for ParseError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        ParseError::Syntax(err.to_string())
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// SQL parser for TailSQL.
pub struct Parser;

impl Parser {
    /// Parses a SQL string into a list of statements.
    pub fn parse(sql: &str) -> ParseResult<Vec<Statement>> {
        if sql.len() > MAX_QUERY_LENGTH {
            return Err(ParseError::TooLong {
                length: sql.len(),
                max: MAX_QUERY_LENGTH,
            });
        }
        if sql.trim().is_empty() {
            return Err(ParseError::EmptyQuery);
        }

        let dialect = MySqlDialect {};
        let ast = SqlParser::parse_sql(&dialect, sql)?;

        if ast.is_empty() {
            return Err(ParseError::EmptyQuery);
        }
        Ok(ast)
    }

    /// Parses a single SQL statement.
    pub fn parse_one(sql: &str) -> ParseResult<Statement> {
        let mut statements = Self::parse(sql)?;
        if statements.len() != 1 {
            return Err(ParseError::MultipleStatements(statements.len()));
        }
        Ok(statements.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let stmt = Parser::parse_one("SELECT a, b FROM t WHERE a = 1").unwrap();
        assert!(matches!(stmt, Statement::Query(_)));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Parser::parse_one("   "), Err(ParseError::EmptyQuery));
        assert_eq!(Parser::parse_one(";"), Err(ParseError::EmptyQuery));
    }

    #[test]
    fn test_parse_multiple() {
        assert_eq!(
            Parser::parse_one("SELECT a FROM t; SELECT b FROM t"),
            Err(ParseError::MultipleStatements(2))
        );
    }

    #[test]
    fn test_parse_syntax_error() {
        let err = Parser::parse_one("SELEC a FROM t").unwrap_err();
        assert!(matches!(err, ParseError::Syntax(_)));
        assert!(err.to_string().starts_with("SQL syntax error"));
    }

    #[test]
    fn test_parse_too_long() {
        let sql = format!("SELECT a FROM t WHERE a = '{}'", "x".repeat(MAX_QUERY_LENGTH));
        assert!(matches!(Parser::parse_one(&sql), Err(ParseError::TooLong { .. })));
    }
}
