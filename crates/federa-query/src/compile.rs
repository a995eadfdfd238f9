// SPDX-License-Identifier: Apache-2.0

//! Expression → SQL rendering
//!
//! Every non-leaf node becomes one `SELECT` over its input, nested as a derived
//! table. The only fusion is `Limit` over `Sort`, which must share a `SELECT`
//! for the ordering to be meaningful.

use crate::dialect::Dialect;
use crate::error::ExprError;
use crate::expr::{join_columns, Expr, JoinKind, JoinSide, ScalarExpr, SortKey};

/// Renders `expr` as a single `SELECT` statement in `dialect`.
pub fn to_sql(expr: &Expr, dialect: Dialect) -> Result<String, ExprError> {
    expr.schema()?;
    SqlCompiler::new(dialect).select(expr)
}

struct SqlCompiler {
    dialect: Dialect,
    next_alias: usize,
}

impl SqlCompiler {
    fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            next_alias: 0,
        }
    }

    fn alias(&mut self) -> String {
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;
        alias
    }

    /// `FROM` item for `expr` together with the alias it is bound to.
    fn relation(&mut self, expr: &Expr) -> Result<(String, String), ExprError> {
        let source = match expr {
            Expr::Table(handle) => self
                .dialect
                .qualified_table(handle.namespace(), handle.name()),
            Expr::Cached(cached) => self.dialect.quote_ident(&cached.name),
            _ => format!("({})", self.select(expr)?),
        };
        let alias = self.alias();
        Ok((format!("{source} AS {alias}"), alias))
    }

    fn select(&mut self, expr: &Expr) -> Result<String, ExprError> {
        match expr {
            Expr::Table(_) | Expr::Cached(_) => {
                let (from, _) = self.relation(expr)?;
                Ok(format!("SELECT * FROM {from}"))
            }
            Expr::Filter { input, predicate } => {
                let (from, _) = self.relation(input)?;
                Ok(format!(
                    "SELECT * FROM {from} WHERE {}",
                    self.scalar(predicate)
                ))
            }
            Expr::Project { input, columns } => {
                let (from, _) = self.relation(input)?;
                let list: Vec<String> = columns
                    .iter()
                    .map(|c| self.dialect.quote_ident(c))
                    .collect();
                Ok(format!("SELECT {} FROM {from}", list.join(", ")))
            }
            Expr::Sort { input, keys } => {
                let (from, _) = self.relation(input)?;
                Ok(format!(
                    "SELECT * FROM {from} ORDER BY {}",
                    self.order_list(keys)
                ))
            }
            Expr::Limit {
                input,
                limit,
                offset,
            } => {
                let mut sql = match input.as_ref() {
                    Expr::Sort { input, keys } => {
                        let (from, _) = self.relation(input)?;
                        format!("SELECT * FROM {from} ORDER BY {}", self.order_list(keys))
                    }
                    other => {
                        let (from, _) = self.relation(other)?;
                        format!("SELECT * FROM {from}")
                    }
                };
                sql.push_str(&format!(" LIMIT {limit}"));
                if *offset > 0 {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
                Ok(sql)
            }
            Expr::Join {
                left,
                right,
                kind,
                on,
            } => {
                let left_schema = left.schema()?;
                let right_schema = right.schema()?;
                let (left_from, la) = self.relation(left)?;
                let (right_from, ra) = self.relation(right)?;

                let list: Vec<String> = join_columns(&left_schema, &right_schema)
                    .into_iter()
                    .map(|jc| {
                        let alias = match jc.side {
                            JoinSide::Left => &la,
                            JoinSide::Right => &ra,
                        };
                        format!(
                            "{alias}.{} AS {}",
                            self.dialect.quote_ident(&jc.column.name),
                            self.dialect.quote_ident(&jc.output)
                        )
                    })
                    .collect();

                let condition: Vec<String> = on
                    .iter()
                    .map(|(l, r)| {
                        format!(
                            "{la}.{} = {ra}.{}",
                            self.dialect.quote_ident(l),
                            self.dialect.quote_ident(r)
                        )
                    })
                    .collect();

                let join = match kind {
                    JoinKind::Inner => "INNER JOIN",
                    JoinKind::Left => "LEFT JOIN",
                };

                Ok(format!(
                    "SELECT {} FROM {left_from} {join} {right_from} ON {}",
                    list.join(", "),
                    condition.join(" AND ")
                ))
            }
            Expr::Aggregate {
                input,
                group_by,
                measures,
            } => {
                let (from, _) = self.relation(input)?;
                let groups: Vec<String> = group_by
                    .iter()
                    .map(|c| self.dialect.quote_ident(c))
                    .collect();
                let mut list = groups.clone();
                for measure in measures {
                    let arg = match &measure.column {
                        Some(c) => self.dialect.quote_ident(c),
                        None => "*".to_string(),
                    };
                    list.push(format!(
                        "{}({arg}) AS {}",
                        measure.func.sql_name(),
                        self.dialect.quote_ident(&measure.alias)
                    ));
                }
                let mut sql = format!("SELECT {} FROM {from}", list.join(", "));
                if !groups.is_empty() {
                    sql.push_str(&format!(" GROUP BY {}", groups.join(", ")));
                }
                Ok(sql)
            }
        }
    }

    fn order_list(&self, keys: &[SortKey]) -> String {
        keys.iter()
            .map(|k| {
                format!(
                    "{} {}",
                    self.dialect.quote_ident(&k.column),
                    if k.descending { "DESC" } else { "ASC" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn scalar(&self, expr: &ScalarExpr) -> String {
        match expr {
            ScalarExpr::Column(name) => self.dialect.quote_ident(name),
            ScalarExpr::Literal(value) => self.dialect.format_value(value),
            ScalarExpr::Binary { op, left, right } => format!(
                "({} {} {})",
                self.scalar(left),
                op.sql(),
                self.scalar(right)
            ),
            ScalarExpr::Not(inner) => format!("(NOT {})", self.scalar(inner)),
            ScalarExpr::IsNull(inner) => format!("({} IS NULL)", self.scalar(inner)),
        }
    }
}
