//! SQL to logical plan compiler.
//!
//! Accepts exactly `SELECT <col>, ... FROM <relation> WHERE <col> = <literal>`
//! and lowers it to `Filter(Project(NamedScan))`. Every other construct is
//! rejected with [`CompileError::UnsupportedQueryShape`] before the relation
//! is resolved, so an unsupported query never yields a partial plan.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use sqlparser::ast::{
    BinaryOperator, Expr as AstExpr, GroupByExpr, Ident, ObjectName, Query, SelectItem, SetExpr,
    Statement, TableFactor, UnaryOperator, Value,
};
use thiserror::Error;
use tracing::debug;

use tailsql_common::ErrorCode;

use super::expr::{Literal, ScalarExpr};
use super::operator::{Filter, LogicalOperator, NamedScan, Project};
use super::plan::LogicalPlan;
use crate::parser::{ParseError, Parser};

/// Errors that can occur during compilation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The SQL text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The FROM clause names a relation that is not registered.
    #[error("Unknown relation: {0}")]
    UnknownRelation(String),

    /// A column is not part of the relation schema.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// The query uses a construct outside the supported shape.
    #[error("Unsupported query shape: {0}")]
    UnsupportedQueryShape(String),

    /// A literal cannot be coerced to its inferred type.
    #[error("Cannot convert literal {literal}: {reason}")]
    LiteralConversion {
        /// Literal as written.
        literal: String,
        /// Why the conversion failed.
        reason: String,
    },

    /// The plan could not be assembled.
    #[error("Internal planning error: {0}")]
    Internal(String),
}

impl CompileError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            CompileError::Parse(_) => ErrorCode::SyntaxError,
            CompileError::UnknownRelation(_) => ErrorCode::UnknownRelation,
            CompileError::UnknownColumn(_) => ErrorCode::UnknownColumn,
            CompileError::UnsupportedQueryShape(_) => ErrorCode::UnsupportedQueryShape,
            CompileError::LiteralConversion { .. } => ErrorCode::LiteralConversion,
            CompileError::Internal(_) => ErrorCode::Internal,
        }
    }
}

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

fn unsupported(what: impl Into<String>) -> CompileError {
    CompileError::UnsupportedQueryShape(what.into())
}

/// A relation as seen by the compiler.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelation {
    /// Physical relation name.
    pub name: String,
    /// Arrow schema of the relation's batches.
    pub schema: SchemaRef,
}

/// Resolves relation names for the compiler.
pub trait RelationResolver {
    /// Resolves a relation by name.
    fn resolve_relation(&self, name: &str) -> Option<ResolvedRelation>;
}

impl<F> RelationResolver for F
where
    F: Fn(&str) -> Option<ResolvedRelation>,
{
    fn resolve_relation(&self, name: &str) -> Option<ResolvedRelation> {
        self(name)
    }
}

/// Compiles SQL text into a logical plan.
///
/// Pure function of its inputs: compiling the same text against an
/// unchanged resolver yields equal plans.
pub fn compile<R>(sql: &str, resolver: &R) -> CompileResult<LogicalPlan>
where
    R: RelationResolver + ?Sized,
{
    let statement = Parser::parse_one(sql)?;
    let query = match &statement {
        Statement::Query(query) => query,
        _ => return Err(unsupported("only SELECT queries are supported")),
    };

    let shape = QueryShape::extract(query)?;
    let relation = resolver
        .resolve_relation(&shape.relation)
        .ok_or_else(|| CompileError::UnknownRelation(shape.relation.clone()))?;

    let plan = shape.into_plan(relation)?;
    debug!(plan = %plan.display().trim_end(), "compiled query");
    Ok(plan)
}

/// Column operand as written, optionally qualified.
#[derive(Debug)]
struct ColumnName {
    qualifier: Option<String>,
    name: String,
}

impl ColumnName {
    fn display(&self) -> String {
        match &self.qualifier {
            Some(q) => format!("{}.{}", q, self.name),
            None => self.name.clone(),
        }
    }
}

enum Operand {
    Column(ColumnName),
    Literal(Literal),
}

/// The parts of a supported query, before name resolution.
#[derive(Debug)]
struct QueryShape {
    relation: String,
    alias: Option<String>,
    columns: Vec<ColumnName>,
    predicate: (ColumnName, Literal),
}

impl QueryShape {
    fn extract(query: &Query) -> CompileResult<Self> {
        if query.with.is_some() {
            return Err(unsupported("WITH"));
        }
        if !query.order_by.is_empty() {
            return Err(unsupported("ORDER BY"));
        }
        if query.limit.is_some() {
            return Err(unsupported("LIMIT"));
        }
        if query.offset.is_some() {
            return Err(unsupported("OFFSET"));
        }
        if query.fetch.is_some() {
            return Err(unsupported("FETCH"));
        }
        if !query.limit_by.is_empty() {
            return Err(unsupported("LIMIT BY"));
        }
        if !query.locks.is_empty() {
            return Err(unsupported("locking clause"));
        }

        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            SetExpr::Query(_) => return Err(unsupported("nested query")),
            SetExpr::SetOperation { op, .. } => return Err(unsupported(op.to_string())),
            other => return Err(unsupported(other.to_string())),
        };

        if select.distinct.is_some() {
            return Err(unsupported("DISTINCT"));
        }
        if select.top.is_some() {
            return Err(unsupported("TOP"));
        }
        if select.into.is_some() {
            return Err(unsupported("SELECT INTO"));
        }
        match &select.group_by {
            GroupByExpr::All => return Err(unsupported("GROUP BY")),
            GroupByExpr::Expressions(exprs) if !exprs.is_empty() => {
                return Err(unsupported("GROUP BY"))
            }
            GroupByExpr::Expressions(_) => {}
        }
        if select.having.is_some() {
            return Err(unsupported("HAVING"));
        }
        if select.qualify.is_some() {
            return Err(unsupported("QUALIFY"));
        }
        if !select.named_window.is_empty() {
            return Err(unsupported("WINDOW"));
        }
        if !select.lateral_views.is_empty() {
            return Err(unsupported("LATERAL VIEW"));
        }
        if !select.cluster_by.is_empty() {
            return Err(unsupported("CLUSTER BY"));
        }
        if !select.distribute_by.is_empty() {
            return Err(unsupported("DISTRIBUTE BY"));
        }
        if !select.sort_by.is_empty() {
            return Err(unsupported("SORT BY"));
        }
        if select.value_table_mode.is_some() {
            return Err(unsupported("SELECT AS"));
        }

        let table = match select.from.as_slice() {
            [] => return Err(unsupported("missing FROM clause")),
            [table] => table,
            _ => return Err(unsupported("multiple FROM items")),
        };
        if !table.joins.is_empty() {
            return Err(unsupported("JOIN"));
        }
        let (relation, alias) = match &table.relation {
            TableFactor::Table { name, alias, .. } => (
                relation_name(name)?,
                alias.as_ref().map(|a| a.name.value.clone()),
            ),
            _ => return Err(unsupported("FROM must name a single relation")),
        };

        let columns = select
            .projection
            .iter()
            .map(select_item_column)
            .collect::<CompileResult<Vec<_>>>()?;

        let predicate = match &select.selection {
            Some(expr) => equality(expr)?,
            None => return Err(unsupported("missing WHERE clause")),
        };

        Ok(Self {
            relation,
            alias,
            columns,
            predicate,
        })
    }

    fn into_plan(self, relation: ResolvedRelation) -> CompileResult<LogicalPlan> {
        let schema = relation.schema.clone();

        let mut mapping = Vec::with_capacity(self.columns.len() + 1);
        let mut output_names = Vec::with_capacity(self.columns.len());
        for column in &self.columns {
            mapping.push(self.resolve_column(&schema, column)?);
            output_names.push(column.name.clone());
        }

        let (column, literal) = &self.predicate;
        let source_index = self.resolve_column(&schema, column)?;
        // The condition column is carried through the projection when the
        // SELECT list does not include it.
        let filter_index = match mapping.iter().position(|&i| i == source_index) {
            Some(pos) => pos,
            None => {
                mapping.push(source_index);
                mapping.len() - 1
            }
        };

        let scan = LogicalOperator::NamedScan(NamedScan::new(relation.name, schema));
        let project = Project::try_new(Arc::new(scan), mapping, None)
            .ok_or_else(|| CompileError::Internal("projection out of range".to_string()))?;
        let filter = Filter {
            input: Arc::new(LogicalOperator::Project(project)),
            condition: ScalarExpr::eq(
                ScalarExpr::column(column.name.clone(), filter_index),
                ScalarExpr::literal(literal.clone()),
            ),
        };

        Ok(LogicalPlan::new(LogicalOperator::Filter(filter), output_names))
    }

    fn resolve_column(&self, schema: &SchemaRef, column: &ColumnName) -> CompileResult<usize> {
        if let Some(qualifier) = &column.qualifier {
            let matches_relation = *qualifier == self.relation;
            let matches_alias = self.alias.as_deref() == Some(qualifier.as_str());
            if !matches_relation && !matches_alias {
                return Err(CompileError::UnknownColumn(column.display()));
            }
        }
        schema
            .index_of(&column.name)
            .map_err(|_| CompileError::UnknownColumn(column.display()))
    }
}

fn relation_name(name: &ObjectName) -> CompileResult<String> {
    match name.0.as_slice() {
        [ident] => Ok(ident.value.clone()),
        _ => Err(unsupported(format!("qualified relation name {name}"))),
    }
}

fn select_item_column(item: &SelectItem) -> CompileResult<ColumnName> {
    match item {
        SelectItem::UnnamedExpr(expr) => projected_column(expr),
        // Aliases are accepted but the source column name is kept.
        SelectItem::ExprWithAlias { expr, .. } => projected_column(expr),
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => {
            Err(unsupported("wildcard projection"))
        }
    }
}

fn projected_column(expr: &AstExpr) -> CompileResult<ColumnName> {
    match operand(expr)? {
        Operand::Column(column) => Ok(column),
        Operand::Literal(literal) => Err(unsupported(format!("projection of literal {literal}"))),
    }
}

fn equality(expr: &AstExpr) -> CompileResult<(ColumnName, Literal)> {
    match expr {
        AstExpr::Nested(inner) => equality(inner),
        AstExpr::BinaryOp {
            left,
            op: BinaryOperator::Eq,
            right,
        } => match (operand(left)?, operand(right)?) {
            (Operand::Column(c), Operand::Literal(l)) | (Operand::Literal(l), Operand::Column(c)) => {
                Ok((c, l))
            }
            (Operand::Column(_), Operand::Column(_)) => {
                Err(unsupported("comparison between columns"))
            }
            (Operand::Literal(_), Operand::Literal(_)) => Err(unsupported("constant predicate")),
        },
        AstExpr::BinaryOp { op, .. } => Err(unsupported(format!("predicate operator {op}"))),
        other => Err(unsupported(format!("predicate {other}"))),
    }
}

fn operand(expr: &AstExpr) -> CompileResult<Operand> {
    match expr {
        AstExpr::Nested(inner) => operand(inner),
        AstExpr::Identifier(ident) => Ok(Operand::Column(ColumnName {
            qualifier: None,
            name: ident.value.clone(),
        })),
        AstExpr::CompoundIdentifier(parts) => compound_column(parts).map(Operand::Column),
        AstExpr::Value(value) => literal(value, false).map(Operand::Literal),
        AstExpr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match expr.as_ref() {
            AstExpr::Value(value @ Value::Number(..)) => literal(value, true).map(Operand::Literal),
            other => Err(unsupported(format!("expression -{other}"))),
        },
        AstExpr::UnaryOp {
            op: UnaryOperator::Plus,
            expr,
        } => match expr.as_ref() {
            AstExpr::Value(value @ Value::Number(..)) => literal(value, false).map(Operand::Literal),
            other => Err(unsupported(format!("expression +{other}"))),
        },
        other => Err(unsupported(format!("expression {other}"))),
    }
}

fn compound_column(parts: &[Ident]) -> CompileResult<ColumnName> {
    match parts {
        [qualifier, name] => Ok(ColumnName {
            qualifier: Some(qualifier.value.clone()),
            name: name.value.clone(),
        }),
        _ => {
            let written: Vec<_> = parts.iter().map(|p| p.value.as_str()).collect();
            Err(CompileError::UnknownColumn(written.join(".")))
        }
    }
}

fn literal(value: &Value, negative: bool) -> CompileResult<Literal> {
    match value {
        Value::SingleQuotedString(s) | Value::DoubleQuotedString(s) => Ok(Literal::Utf8(s.clone())),
        Value::Number(n, _) => {
            let text = if negative { format!("-{n}") } else { n.clone() };
            text.parse::<i32>()
                .map(Literal::Int32)
                .map_err(|e| CompileError::LiteralConversion {
                    literal: text.clone(),
                    reason: format!("not a 32-bit signed integer ({e})"),
                })
        }
        other => Err(CompileError::LiteralConversion {
            literal: other.to_string(),
            reason: "unsupported literal type".to_string(),
        }),
    }
}
