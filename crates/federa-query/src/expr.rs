// SPDX-License-Identifier: Apache-2.0

//! Relational expression tree
//!
//! Expressions are immutable values; builders consume `self` and wrap it in a
//! new node. For routing purposes the interesting question is which physical
//! relations an expression reads from, answered by [`Expr::sources`].

use federa_core::{ColumnInfo, TableSchema, Value};

use crate::error::ExprError;
use crate::handle::{HandleId, TableHandle};

/// A relational operator node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Physical table reference.
    Table(TableHandle),
    /// Result of `source`, stored (or to be stored) in the local engine as `name`.
    Cached(CachedTable),
    Filter {
        input: Box<Expr>,
        predicate: ScalarExpr,
    },
    Project {
        input: Box<Expr>,
        columns: Vec<String>,
    },
    Join {
        left: Box<Expr>,
        right: Box<Expr>,
        kind: JoinKind,
        on: Vec<(String, String)>,
    },
    Sort {
        input: Box<Expr>,
        keys: Vec<SortKey>,
    },
    Limit {
        input: Box<Expr>,
        limit: u64,
        offset: u64,
    },
    Aggregate {
        input: Box<Expr>,
        group_by: Vec<String>,
        measures: Vec<Measure>,
    },
}

/// A deferred cache entry: behaves as a local physical table named `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedTable {
    pub name: String,
    pub schema: TableSchema,
    pub source: Box<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: false,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            descending: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunc {
    pub fn sql_name(self) -> &'static str {
        match self {
            AggFunc::Count => "COUNT",
            AggFunc::Sum => "SUM",
            AggFunc::Avg => "AVG",
            AggFunc::Min => "MIN",
            AggFunc::Max => "MAX",
        }
    }
}

/// One aggregate output column. `column == None` is only valid for `COUNT(*)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure {
    pub func: AggFunc,
    pub column: Option<String>,
    pub alias: String,
}

impl Measure {
    pub fn new(func: AggFunc, column: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            func,
            column: Some(column.into()),
            alias: alias.into(),
        }
    }

    pub fn count_star(alias: impl Into<String>) -> Self {
        Self {
            func: AggFunc::Count,
            column: None,
            alias: alias.into(),
        }
    }
}

/// Scalar expression used in predicates
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarExpr {
    Column(String),
    Literal(Value),
    Binary {
        op: BinaryOp,
        left: Box<ScalarExpr>,
        right: Box<ScalarExpr>,
    },
    Not(Box<ScalarExpr>),
    IsNull(Box<ScalarExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Plus,
    Minus,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
        }
    }
}

/// Column reference.
pub fn col(name: impl Into<String>) -> ScalarExpr {
    ScalarExpr::Column(name.into())
}

/// Literal value.
pub fn lit(value: impl Into<Value>) -> ScalarExpr {
    ScalarExpr::Literal(value.into())
}

impl ScalarExpr {
    fn binary(self, op: BinaryOp, right: ScalarExpr) -> ScalarExpr {
        ScalarExpr::Binary {
            op,
            left: Box::new(self),
            right: Box::new(right),
        }
    }

    pub fn equals(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Eq, right)
    }

    pub fn not_equals(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::NotEq, right)
    }

    pub fn lt(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Lt, right)
    }

    pub fn lte(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::LtEq, right)
    }

    pub fn gt(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Gt, right)
    }

    pub fn gte(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::GtEq, right)
    }

    pub fn and(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::And, right)
    }

    pub fn or(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Or, right)
    }

    pub fn plus(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Plus, right)
    }

    pub fn minus(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Minus, right)
    }

    pub fn times(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Multiply, right)
    }

    pub fn divide(self, right: ScalarExpr) -> ScalarExpr {
        self.binary(BinaryOp::Divide, right)
    }

    pub fn negate(self) -> ScalarExpr {
        ScalarExpr::Not(Box::new(self))
    }

    pub fn is_null(self) -> ScalarExpr {
        ScalarExpr::IsNull(Box::new(self))
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ScalarExpr::Column(name) => out.push(name),
            ScalarExpr::Literal(_) => {}
            ScalarExpr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            ScalarExpr::Not(inner) | ScalarExpr::IsNull(inner) => inner.collect_columns(out),
        }
    }

    /// Column names referenced anywhere in the expression.
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }
}

/// A leaf an expression reads from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceRef<'a> {
    Table(&'a TableHandle),
    Cached(&'a CachedTable),
}

impl Expr {
    pub fn filter(self, predicate: ScalarExpr) -> Expr {
        Expr::Filter {
            input: Box::new(self),
            predicate,
        }
    }

    pub fn select<S: AsRef<str>>(self, columns: &[S]) -> Expr {
        Expr::Project {
            input: Box::new(self),
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    pub fn join<S: AsRef<str>>(self, right: Expr, on: &[(S, S)]) -> Expr {
        self.join_with(right, JoinKind::Inner, on)
    }

    pub fn left_join<S: AsRef<str>>(self, right: Expr, on: &[(S, S)]) -> Expr {
        self.join_with(right, JoinKind::Left, on)
    }

    fn join_with<S: AsRef<str>>(self, right: Expr, kind: JoinKind, on: &[(S, S)]) -> Expr {
        Expr::Join {
            left: Box::new(self),
            right: Box::new(right),
            kind,
            on: on
                .iter()
                .map(|(l, r)| (l.as_ref().to_string(), r.as_ref().to_string()))
                .collect(),
        }
    }

    pub fn order_by(self, keys: Vec<SortKey>) -> Expr {
        Expr::Sort {
            input: Box::new(self),
            keys,
        }
    }

    pub fn limit(self, limit: u64) -> Expr {
        self.limit_offset(limit, 0)
    }

    pub fn limit_offset(self, limit: u64, offset: u64) -> Expr {
        Expr::Limit {
            input: Box::new(self),
            limit,
            offset,
        }
    }

    pub fn aggregate<S: AsRef<str>>(self, group_by: &[S], measures: Vec<Measure>) -> Expr {
        Expr::Aggregate {
            input: Box::new(self),
            group_by: group_by.iter().map(|c| c.as_ref().to_string()).collect(),
            measures,
        }
    }

    /// Direct relational inputs. A cached node hides its source.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Table(_) | Expr::Cached(_) => Vec::new(),
            Expr::Filter { input, .. }
            | Expr::Project { input, .. }
            | Expr::Sort { input, .. }
            | Expr::Limit { input, .. }
            | Expr::Aggregate { input, .. } => vec![input.as_ref()],
            Expr::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// The originating relations of this expression, left to right.
    ///
    /// Bound table handles are deduplicated by identity; cached nodes by name.
    pub fn sources(&self) -> Vec<SourceRef<'_>> {
        let mut out: Vec<SourceRef<'_>> = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Expr::Table(handle) => {
                    let seen = out.iter().any(|s| match s {
                        SourceRef::Table(h) => {
                            h.id().is_bound() && h.id() == handle.id()
                        }
                        SourceRef::Cached(_) => false,
                    });
                    if !seen {
                        out.push(SourceRef::Table(handle));
                    }
                }
                Expr::Cached(cached) => {
                    let seen = out.iter().any(|s| match s {
                        SourceRef::Cached(c) => c.name == cached.name,
                        SourceRef::Table(_) => false,
                    });
                    if !seen {
                        out.push(SourceRef::Cached(cached));
                    }
                }
                _ => {
                    // reversed so the left-most input is visited first
                    stack.extend(node.children().into_iter().rev());
                }
            }
        }
        out
    }

    /// Ids of all bound table handles this expression reads from.
    pub fn handle_ids(&self) -> Vec<HandleId> {
        self.sources()
            .into_iter()
            .filter_map(|s| match s {
                SourceRef::Table(h) if h.id().is_bound() => Some(h.id()),
                _ => None,
            })
            .collect()
    }

    /// Every cached node in the tree, including those nested inside the
    /// sources of other cached nodes. Inner entries come before the nodes
    /// that depend on them.
    pub fn cached_tables(&self) -> Vec<&CachedTable> {
        let mut out = Vec::new();
        self.collect_cached(&mut out);
        out
    }

    fn collect_cached<'a>(&'a self, out: &mut Vec<&'a CachedTable>) {
        match self {
            Expr::Cached(cached) => {
                cached.source.collect_cached(out);
                if !out.iter().any(|c| c.name == cached.name) {
                    out.push(cached);
                }
            }
            _ => {
                for child in self.children() {
                    child.collect_cached(out);
                }
            }
        }
    }

    /// Output schema, validating every column reference on the way.
    pub fn schema(&self) -> Result<TableSchema, ExprError> {
        match self {
            Expr::Table(handle) => Ok(handle.schema().clone()),
            Expr::Cached(cached) => Ok(cached.schema.clone()),
            Expr::Filter { input, predicate } => {
                let schema = input.schema()?;
                for column in predicate.columns() {
                    require_column(&schema, column)?;
                }
                Ok(schema)
            }
            Expr::Project { input, columns } => {
                if columns.is_empty() {
                    return Err(ExprError::EmptyProjection);
                }
                let schema = input.schema()?;
                let projected = columns
                    .iter()
                    .map(|c| require_column(&schema, c).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(TableSchema::new(projected))
            }
            Expr::Join {
                left, right, on, ..
            } => {
                if on.is_empty() {
                    return Err(ExprError::EmptyJoinKeys);
                }
                let left_schema = left.schema()?;
                let right_schema = right.schema()?;
                for (l, r) in on {
                    require_column(&left_schema, l)?;
                    require_column(&right_schema, r)?;
                }
                let columns = join_columns(&left_schema, &right_schema)
                    .into_iter()
                    .map(|jc| ColumnInfo {
                        name: jc.output.as_str().into(),
                        ..jc.column.clone()
                    })
                    .collect();
                Ok(TableSchema::new(columns))
            }
            Expr::Sort { input, keys } => {
                let schema = input.schema()?;
                for key in keys {
                    require_column(&schema, &key.column)?;
                }
                Ok(schema)
            }
            Expr::Limit { input, .. } => input.schema(),
            Expr::Aggregate {
                input,
                group_by,
                measures,
            } => {
                if group_by.is_empty() && measures.is_empty() {
                    return Err(ExprError::EmptyAggregate);
                }
                let schema = input.schema()?;
                let mut columns = group_by
                    .iter()
                    .map(|c| require_column(&schema, c).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                for measure in measures {
                    let data_type = match (&measure.column, measure.func) {
                        (None, AggFunc::Count) => "BIGINT".to_string(),
                        (None, func) => {
                            return Err(ExprError::MissingMeasureColumn {
                                func: func.sql_name().to_string(),
                            })
                        }
                        (Some(c), func) => {
                            let source = require_column(&schema, c)?;
                            match func {
                                AggFunc::Count => "BIGINT".to_string(),
                                AggFunc::Avg => "DOUBLE".to_string(),
                                _ => source.data_type.to_string(),
                            }
                        }
                    };
                    columns.push(ColumnInfo::new(measure.alias.as_str(), data_type));
                }
                Ok(TableSchema::new(columns))
            }
        }
    }
}

fn require_column<'a>(schema: &'a TableSchema, name: &str) -> Result<&'a ColumnInfo, ExprError> {
    schema
        .column(name)
        .ok_or_else(|| ExprError::unknown_column(name))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JoinSide {
    Left,
    Right,
}

/// One output column of a join.
#[derive(Debug, Clone)]
pub(crate) struct JoinColumn<'a> {
    pub side: JoinSide,
    pub column: &'a ColumnInfo,
    pub output: String,
}

/// Left columns keep their names; right columns that collide get `_right`.
pub(crate) fn join_columns<'a>(
    left: &'a TableSchema,
    right: &'a TableSchema,
) -> Vec<JoinColumn<'a>> {
    let mut out: Vec<JoinColumn<'a>> = left
        .columns
        .iter()
        .map(|c| JoinColumn {
            side: JoinSide::Left,
            column: c,
            output: c.name.to_string(),
        })
        .collect();

    for c in &right.columns {
        let mut output = c.name.to_string();
        while out.iter().any(|o| o.output == output) {
            output.push_str("_right");
        }
        out.push(JoinColumn {
            side: JoinSide::Right,
            column: c,
            output,
        });
    }
    out
}
