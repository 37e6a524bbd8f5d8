//! Logical operators.

use std::sync::Arc;

use arrow::datatypes::{Schema, SchemaRef};

use super::expr::ScalarExpr;

/// Logical operator in a query plan.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOperator {
    /// Read every batch of a registered relation.
    NamedScan(NamedScan),
    /// Select and reorder input columns.
    Project(Project),
    /// Keep rows whose condition holds.
    Filter(Filter),
}

impl LogicalOperator {
    /// Returns the output schema of this operator.
    pub fn schema(&self) -> SchemaRef {
        match self {
            LogicalOperator::NamedScan(scan) => scan.schema.clone(),
            LogicalOperator::Project(proj) => proj.schema.clone(),
            LogicalOperator::Filter(filter) => filter.input.schema(),
        }
    }

    /// Returns the child operators.
    pub fn children(&self) -> Vec<&Arc<LogicalOperator>> {
        match self {
            LogicalOperator::NamedScan(_) => vec![],
            LogicalOperator::Project(proj) => vec![&proj.input],
            LogicalOperator::Filter(filter) => vec![&filter.input],
        }
    }

    /// Returns the name of this operator.
    pub fn name(&self) -> &'static str {
        match self {
            LogicalOperator::NamedScan(_) => "NamedScan",
            LogicalOperator::Project(_) => "Project",
            LogicalOperator::Filter(_) => "Filter",
        }
    }
}

/// Scan of a registered relation.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedScan {
    /// Relation name.
    pub relation: String,
    /// Relation schema.
    pub schema: SchemaRef,
}

impl NamedScan {
    /// Creates a scan.
    pub fn new(relation: impl Into<String>, schema: SchemaRef) -> Self {
        Self {
            relation: relation.into(),
            schema,
        }
    }
}

/// Column selection by input position.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Input column index for each output column.
    pub mapping: Vec<usize>,
    /// Renamed output names, one per mapped column.
    pub names: Option<Vec<String>>,
    /// Output schema.
    pub schema: SchemaRef,
}

impl Project {
    /// Creates a projection, deriving the output schema from the mapping.
    ///
    /// Returns `None` when an index is out of range or the number of names
    /// does not match the mapping.
    pub fn try_new(
        input: Arc<LogicalOperator>,
        mapping: Vec<usize>,
        names: Option<Vec<String>>,
    ) -> Option<Self> {
        let schema = project_schema(&input.schema(), &mapping, names.as_deref())?;
        Some(Self {
            input,
            mapping,
            names,
            schema,
        })
    }
}

/// Derives the schema produced by selecting `mapping` from `input`.
pub fn project_schema(
    input: &Schema,
    mapping: &[usize],
    names: Option<&[String]>,
) -> Option<SchemaRef> {
    if names.is_some_and(|n| n.len() != mapping.len()) {
        return None;
    }
    let mut fields = Vec::with_capacity(mapping.len());
    for (pos, &index) in mapping.iter().enumerate() {
        let field = input.fields().get(index)?.as_ref().clone();
        let field = match names {
            Some(names) => field.with_name(names[pos].clone()),
            None => field,
        };
        fields.push(field);
    }
    Some(Arc::new(Schema::new_with_metadata(
        fields,
        input.metadata().clone(),
    )))
}

/// Row filter over its input.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Input operator.
    pub input: Arc<LogicalOperator>,
    /// Boolean condition, column positions relative to the input.
    pub condition: ScalarExpr,
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};

    fn test_scan() -> Arc<LogicalOperator> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Utf8, true),
            Field::new("c", DataType::Float64, false),
        ]));
        Arc::new(LogicalOperator::NamedScan(NamedScan::new("t", schema)))
    }

    #[test]
    fn test_project_schema() {
        let proj = Project::try_new(test_scan(), vec![1, 0], None).unwrap();
        let names: Vec<_> = proj.schema.fields().iter().map(|f| f.name().clone()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(proj.schema.field(0).data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_project_renamed() {
        let proj =
            Project::try_new(test_scan(), vec![2], Some(vec!["total".to_string()])).unwrap();
        assert_eq!(proj.schema.field(0).name(), "total");
        assert_eq!(proj.schema.field(0).data_type(), &DataType::Float64);
    }

    #[test]
    fn test_project_invalid() {
        assert!(Project::try_new(test_scan(), vec![3], None).is_none());
        assert!(Project::try_new(test_scan(), vec![0], Some(vec![])).is_none());
    }

    #[test]
    fn test_children() {
        let scan = test_scan();
        assert!(scan.children().is_empty());
        let proj = LogicalOperator::Project(Project::try_new(scan, vec![0], None).unwrap());
        assert_eq!(proj.children().len(), 1);
        assert_eq!(proj.name(), "Project");
    }
}
