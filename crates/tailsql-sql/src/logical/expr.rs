//! Logical scalar expressions.

use std::fmt;

use arrow::array::{ArrayRef, Int32Array, StringArray};
use arrow::datatypes::DataType;
use std::sync::Arc;

/// A typed literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// UTF-8 string, from a quoted SQL literal.
    Utf8(String),
    /// Signed 32-bit integer, from a bare numeric SQL literal.
    Int32(i32),
}

impl Literal {
    /// Returns the arrow type of the literal.
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Utf8(_) => DataType::Utf8,
            Literal::Int32(_) => DataType::Int32,
        }
    }

    /// Returns the literal as a one-element array.
    pub fn to_array(&self) -> ArrayRef {
        match self {
            Literal::Utf8(s) => Arc::new(StringArray::from(vec![s.as_str()])),
            Literal::Int32(v) => Arc::new(Int32Array::from(vec![*v])),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Utf8(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Int32(v) => write!(f, "{v}"),
        }
    }
}

/// Reference to a column of the operator input, by name and position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// Column name.
    pub name: String,
    /// Position in the input schema.
    pub index: usize,
}

/// A scalar expression over the columns of one input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarExpr {
    /// Column reference.
    Column(ColumnRef),
    /// Literal value.
    Literal(Literal),
    /// Equality comparison, yielding a boolean.
    Eq {
        /// Left operand.
        left: Box<ScalarExpr>,
        /// Right operand.
        right: Box<ScalarExpr>,
    },
}

impl ScalarExpr {
    /// Creates a column reference.
    pub fn column(name: impl Into<String>, index: usize) -> Self {
        ScalarExpr::Column(ColumnRef {
            name: name.into(),
            index,
        })
    }

    /// Creates a literal.
    pub fn literal(value: Literal) -> Self {
        ScalarExpr::Literal(value)
    }

    /// Creates an equality comparison.
    pub fn eq(left: ScalarExpr, right: ScalarExpr) -> Self {
        ScalarExpr::Eq {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Returns every column referenced by this expression.
    pub fn columns(&self) -> Vec<&ColumnRef> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a ColumnRef>) {
        match self {
            ScalarExpr::Column(c) => out.push(c),
            ScalarExpr::Literal(_) => {}
            ScalarExpr::Eq { left, right } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
        }
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Column(c) => write!(f, "{}", c.name),
            ScalarExpr::Literal(l) => write!(f, "{l}"),
            ScalarExpr::Eq { left, right } => write!(f, "{left} = {right}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;

    #[test]
    fn test_expr_display() {
        let expr = ScalarExpr::eq(
            ScalarExpr::column("name", 1),
            ScalarExpr::literal(Literal::Utf8("o'neil".to_string())),
        );
        assert_eq!(expr.to_string(), "name = 'o''neil'");
        assert_eq!(expr.columns().len(), 1);
        assert_eq!(expr.columns()[0].index, 1);
    }

    #[test]
    fn test_literal_array() {
        let array = Literal::Int32(-7).to_array();
        assert_eq!(array.len(), 1);
        assert_eq!(array.data_type(), &DataType::Int32);
        assert_eq!(Literal::Utf8("x".into()).data_type(), DataType::Utf8);
    }
}
