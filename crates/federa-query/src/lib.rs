// SPDX-License-Identifier: Apache-2.0

//! Relational expression tree and multi-dialect SQL rendering.
//!
//! ```
//! use federa_core::{ColumnInfo, Namespace, TableSchema};
//! use federa_query::{col, lit, to_sql, Dialect, TableHandle};
//!
//! let schema = TableSchema::new(vec![ColumnInfo::new("total", "DOUBLE")]);
//! let orders = TableHandle::physical("local", "orders", Namespace::default(), schema);
//! let expr = orders.to_expr().filter(col("total").gt(lit(100.0)));
//! assert!(to_sql(&expr, Dialect::DuckDb).unwrap().contains("WHERE"));
//! ```

pub mod compile;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod handle;

pub use compile::to_sql;
pub use dialect::Dialect;
pub use error::ExprError;
pub use expr::{
    col, lit, AggFunc, BinaryOp, CachedTable, Expr, JoinKind, Measure, ScalarExpr, SortKey,
    SourceRef,
};
pub use handle::{HandleId, HandleOwner, TableHandle};
