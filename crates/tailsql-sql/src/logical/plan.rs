//! Logical plan wrapper and utilities.

use std::fmt;
use std::sync::Arc;

use arrow::datatypes::SchemaRef;

use super::operator::LogicalOperator;

/// A logical query plan.
///
/// `output_names` lists the columns the caller asked for, in order. The
/// root may carry extra trailing columns needed only to evaluate the
/// condition; execution drops them before results are returned.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPlan {
    /// Root operator.
    pub root: Arc<LogicalOperator>,
    /// Declared output column names.
    pub output_names: Vec<String>,
}

impl LogicalPlan {
    /// Creates a new logical plan.
    pub fn new(root: LogicalOperator, output_names: Vec<String>) -> Self {
        Self {
            root: Arc::new(root),
            output_names,
        }
    }

    /// Returns the schema of the root operator.
    pub fn schema(&self) -> SchemaRef {
        self.root.schema()
    }

    /// Returns the relation scanned by this plan, if any.
    pub fn relation(&self) -> Option<&str> {
        let mut op = self.root.as_ref();
        loop {
            match op {
                LogicalOperator::NamedScan(scan) => return Some(scan.relation.as_str()),
                LogicalOperator::Project(proj) => op = proj.input.as_ref(),
                LogicalOperator::Filter(filter) => op = filter.input.as_ref(),
            }
        }
    }

    /// Returns a formatted string representation of the plan.
    pub fn display(&self) -> String {
        let mut output = String::new();
        Self::format_node(&self.root, 0, &mut output);
        output
    }

    fn format_node(op: &LogicalOperator, indent: usize, output: &mut String) {
        let prefix = "  ".repeat(indent);

        match op {
            LogicalOperator::NamedScan(scan) => {
                output.push_str(&format!("{}NamedScan: {}\n", prefix, scan.relation));
            }
            LogicalOperator::Project(proj) => {
                let names: Vec<_> = proj.schema.fields().iter().map(|f| f.name().as_str()).collect();
                output.push_str(&format!("{}Project: {}\n", prefix, names.join(", ")));
                Self::format_node(&proj.input, indent + 1, output);
            }
            LogicalOperator::Filter(filter) => {
                output.push_str(&format!("{}Filter: {}\n", prefix, filter.condition));
                Self::format_node(&filter.input, indent + 1, output);
            }
        }
    }
}

impl fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::{Filter, Literal, NamedScan, Project, ScalarExpr};
    use arrow::datatypes::{DataType, Field, Schema};

    fn test_plan() -> LogicalPlan {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("amount", DataType::Float64, false),
        ]));
        let scan = Arc::new(LogicalOperator::NamedScan(NamedScan::new("events", schema)));
        let proj = Project::try_new(scan, vec![1, 0], None).unwrap();
        let filter = Filter {
            input: Arc::new(LogicalOperator::Project(proj)),
            condition: ScalarExpr::eq(
                ScalarExpr::column("name", 1),
                ScalarExpr::literal(Literal::Utf8("x".into())),
            ),
        };
        LogicalPlan::new(LogicalOperator::Filter(filter), vec!["amount".into()])
    }

    #[test]
    fn test_plan_display() {
        let plan = test_plan();
        assert_eq!(
            plan.display(),
            "Filter: name = 'x'\n  Project: amount, name\n    NamedScan: events\n"
        );
        assert_eq!(plan.to_string(), plan.display());
    }

    #[test]
    fn test_plan_relation() {
        let plan = test_plan();
        assert_eq!(plan.relation(), Some("events"));
        assert_eq!(plan.schema().fields().len(), 2);
    }
}
