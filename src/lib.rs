// SPDX-License-Identifier: Apache-2.0

//! federa - presents several query engines as one
//!
//! ```no_run
//! # async fn demo() -> federa::EngineResult<()> {
//! use std::sync::Arc;
//! use federa::{col, lit, DuckDbBackend, FederationConfig, Router};
//!
//! let warehouse = DuckDbBackend::open("warehouse", "warehouse.duckdb")?;
//! let mut router = Router::open(&FederationConfig::default()).await?;
//! router.add_connection(Arc::new(warehouse), None)?;
//!
//! let orders = router.table("orders").await?;
//! let big = orders.to_expr().filter(col("total").gt(lit(100.0)));
//! let result = router.execute(&big).await?;
//! println!("{} rows", result.row_count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod federation;
pub mod observability;

use std::sync::Arc;

use tokio::sync::Mutex;

pub use config::FederationConfig;
pub use engine::drivers::{DuckDbBackend, SqliteBackend};
pub use engine::{Backend, ConnectionRegistry, DuplicatePolicy, LocalEngine, NamePattern};
pub use federa_core::{
    ColumnInfo, ConnectionId, EngineError, EngineResult, Namespace, QueryResult, Row,
    TableSchema, Value,
};
pub use federa_query::{
    col, lit, to_sql, AggFunc, Dialect, Expr, HandleId, Measure, SortKey, TableHandle,
};
pub use federation::{NameAllocator, Origin, Router};

/// A router shared between tasks; every operation holds the lock for its duration.
pub type SharedRouter = Arc<Mutex<Router>>;

pub fn shared(router: Router) -> SharedRouter {
    Arc::new(Mutex::new(router))
}
