//! Physical expressions.
//!
//! A physical expression is a logical condition bound to a concrete input
//! schema. The literal side of an equality is cast to the column type once,
//! at conversion time, so evaluation is a single vectorized comparison.

use arrow::array::{Array, ArrayRef, BooleanArray, Scalar};
use arrow::compute::kernels::cmp;
use arrow::compute::{can_cast_types, cast_with_options, filter_record_batch, CastOptions};
use arrow::datatypes::{DataType, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use thiserror::Error;

use crate::logical::{ColumnRef, Literal, ScalarExpr};

/// Errors raised while binding or evaluating an expression.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The referenced column does not exist in the input.
    #[error("Column index {index} out of bounds for input with {columns} columns")]
    ColumnOutOfBounds {
        /// Referenced position.
        index: usize,
        /// Number of input columns.
        columns: usize,
    },

    /// The input column does not have the type the expression was bound to.
    #[error("Column '{name}' has type {actual}, expected {expected}")]
    TypeMismatch {
        /// Column name.
        name: String,
        /// Bound type.
        expected: DataType,
        /// Type found in the batch.
        actual: DataType,
    },

    /// The literal cannot be compared with the column.
    #[error("Cannot compare column '{column}' of type {data_type} with {literal}: {reason}")]
    IncompatibleLiteral {
        /// Column name.
        column: String,
        /// Column type.
        data_type: DataType,
        /// Literal as rendered in plans.
        literal: String,
        /// Why the cast failed.
        reason: String,
    },

    /// The expression is not a supported predicate.
    #[error("Unsupported predicate: {0}")]
    Unsupported(String),

    /// Arrow kernel failure.
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// A predicate bound to an input schema.
#[derive(Debug, Clone)]
pub enum PhysicalExpr {
    /// `column = value`.
    ColumnEq {
        /// Compared column.
        column: ColumnRef,
        /// Literal as written, for display.
        literal: Literal,
        /// One-element array holding the literal cast to the column type.
        value: ArrayRef,
    },
}

impl PhysicalExpr {
    /// Binds a logical condition to `input`.
    pub fn try_new(expr: &ScalarExpr, input: &Schema) -> Result<Self, EvalError> {
        let (column, literal) = match expr {
            ScalarExpr::Eq { left, right } => match (left.as_ref(), right.as_ref()) {
                (ScalarExpr::Column(c), ScalarExpr::Literal(l))
                | (ScalarExpr::Literal(l), ScalarExpr::Column(c)) => (c, l),
                _ => return Err(EvalError::Unsupported(expr.to_string())),
            },
            other => return Err(EvalError::Unsupported(other.to_string())),
        };

        let field = input
            .fields()
            .get(column.index)
            .ok_or(EvalError::ColumnOutOfBounds {
                index: column.index,
                columns: input.fields().len(),
            })?;
        let data_type = field.data_type();

        let incompatible = |reason: String| EvalError::IncompatibleLiteral {
            column: column.name.clone(),
            data_type: data_type.clone(),
            literal: literal.to_string(),
            reason,
        };
        if !can_cast_types(&literal.data_type(), data_type) {
            return Err(incompatible("no cast available".to_string()));
        }
        let options = CastOptions {
            safe: false,
            ..Default::default()
        };
        let value = cast_with_options(&literal.to_array(), data_type, &options)
            .map_err(|e| incompatible(e.to_string()))?;

        Ok(PhysicalExpr::ColumnEq {
            column: column.clone(),
            literal: literal.clone(),
            value,
        })
    }

    /// Evaluates the predicate over every row of `batch`.
    ///
    /// Rows where the column is null yield a null selection entry, which
    /// compaction treats as not selected.
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<BooleanArray, EvalError> {
        match self {
            PhysicalExpr::ColumnEq { column, value, .. } => {
                let array = batch
                    .columns()
                    .get(column.index)
                    .ok_or(EvalError::ColumnOutOfBounds {
                        index: column.index,
                        columns: batch.num_columns(),
                    })?;
                if array.data_type() != value.data_type() {
                    return Err(EvalError::TypeMismatch {
                        name: column.name.clone(),
                        expected: value.data_type().clone(),
                        actual: array.data_type().clone(),
                    });
                }
                Ok(cmp::eq(array, &Scalar::new(value.clone()))?)
            }
        }
    }

    /// Evaluates the predicate and compacts `batch` to the selected rows.
    pub fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch, EvalError> {
        let selection = self.evaluate(batch)?;
        Ok(filter_record_batch(batch, &selection)?)
    }
}

impl std::fmt::Display for PhysicalExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicalExpr::ColumnEq {
                column, literal, ..
            } => write!(f, "{}@{} = {}", column.name, column.index, literal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use arrow::datatypes::Field;
    use std::sync::Arc;

    fn test_schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, true),
            Field::new("amount", DataType::Float64, false),
            Field::new("id", DataType::Int64, false),
        ]))
    }

    fn test_batch() -> RecordBatch {
        RecordBatch::try_new(
            test_schema(),
            vec![
                Arc::new(StringArray::from(vec![Some("a"), Some("b"), None, Some("a")])),
                Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0, 4.0])),
                Arc::new(Int64Array::from(vec![10, 20, 30, 40])),
            ],
        )
        .unwrap()
    }

    fn eq(name: &str, index: usize, literal: Literal) -> ScalarExpr {
        ScalarExpr::eq(ScalarExpr::column(name, index), ScalarExpr::literal(literal))
    }

    #[test]
    fn test_evaluate_utf8() {
        let expr = PhysicalExpr::try_new(&eq("name", 0, Literal::Utf8("a".into())), &test_schema())
            .unwrap();
        let selection = expr.evaluate(&test_batch()).unwrap();
        assert_eq!(selection.len(), 4);
        assert!(selection.value(0));
        assert!(!selection.value(1));
        assert!(selection.is_null(2));
        assert!(selection.value(3));
    }

    #[test]
    fn test_filter_drops_nulls() {
        let expr = PhysicalExpr::try_new(&eq("name", 0, Literal::Utf8("a".into())), &test_schema())
            .unwrap();
        let filtered = expr.filter(&test_batch()).unwrap();
        assert_eq!(filtered.num_rows(), 2);
        let amounts = filtered
            .column(1)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(amounts.values(), &[1.0, 4.0]);
    }

    #[test]
    fn test_int_literal_widened() {
        let expr = PhysicalExpr::try_new(&eq("id", 2, Literal::Int32(30)), &test_schema()).unwrap();
        assert_eq!(expr.filter(&test_batch()).unwrap().num_rows(), 1);

        let expr =
            PhysicalExpr::try_new(&eq("amount", 1, Literal::Int32(2)), &test_schema()).unwrap();
        assert_eq!(expr.filter(&test_batch()).unwrap().num_rows(), 1);
    }

    #[test]
    fn test_incompatible_literal() {
        let err = PhysicalExpr::try_new(&eq("amount", 1, Literal::Utf8("abc".into())), &test_schema())
            .unwrap_err();
        assert!(matches!(err, EvalError::IncompatibleLiteral { .. }));
    }

    #[test]
    fn test_out_of_bounds() {
        let err = PhysicalExpr::try_new(&eq("x", 7, Literal::Int32(1)), &test_schema()).unwrap_err();
        assert!(matches!(err, EvalError::ColumnOutOfBounds { index: 7, columns: 3 }));
    }

    #[test]
    fn test_type_mismatch_at_evaluation() {
        let expr = PhysicalExpr::try_new(&eq("id", 2, Literal::Int32(1)), &test_schema()).unwrap();
        let other = RecordBatch::try_new(
            Arc::new(Schema::new(vec![
                Field::new("a", DataType::Utf8, false),
                Field::new("b", DataType::Utf8, false),
                Field::new("c", DataType::Utf8, false),
            ])),
            vec![
                Arc::new(StringArray::from(vec!["x"])),
                Arc::new(StringArray::from(vec!["y"])),
                Arc::new(StringArray::from(vec!["z"])),
            ],
        )
        .unwrap();
        assert!(matches!(expr.evaluate(&other), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_unsupported() {
        let err = PhysicalExpr::try_new(&ScalarExpr::column("id", 2), &test_schema()).unwrap_err();
        assert!(matches!(err, EvalError::Unsupported(_)));
    }
}
