// SPDX-License-Identifier: Apache-2.0

//! Backend trait definitions
//!
//! `Backend` is the boundary between the federation layer and a physical
//! query engine. The router never sees SQL; it hands whole expressions to the
//! owning backend and lets the backend render them in its own dialect.

use async_trait::async_trait;
use federa_core::{EngineResult, Namespace, QueryResult};
use federa_query::{Dialect, Expr, TableHandle};

use crate::engine::pattern::NamePattern;

/// Core trait that all physical backends must implement
#[async_trait]
pub trait Backend: Send + Sync {
    /// Declared name, used as the registration name unless overridden
    fn name(&self) -> &str;

    /// Returns the driver identifier (e.g., "duckdb", "sqlite")
    fn driver_id(&self) -> &'static str;

    fn dialect(&self) -> Dialect;

    /// Resolves a table owned by this backend
    ///
    /// Absence must be reported as `EngineError::ObjectNotFound`; any other
    /// error stops the router's search.
    async fn resolve(&self, name: &str, namespace: &Namespace) -> EngineResult<TableHandle>;

    /// Lists table names, optionally filtered by a glob
    async fn list_tables(&self, filter: Option<&NamePattern>) -> EngineResult<Vec<String>>;

    /// Executes a whole expression and returns its result
    async fn execute(&self, expr: &Expr) -> EngineResult<QueryResult>;

    /// Pulls the complete result of `expr` into memory for materialization
    ///
    /// Backends whose `execute` already returns every row need not override this.
    async fn pull_all(&self, expr: &Expr) -> EngineResult<QueryResult> {
        self.execute(expr).await
    }
}

/// The engine the federation layer owns and materializes into
#[async_trait]
pub trait LocalEngine: Backend {
    /// Installs `data` as temporary table `name`, replacing any previous one.
    ///
    /// Must be atomic: on error the previous table (if any) stays as it was.
    async fn install_temp_table(&self, name: &str, data: &QueryResult) -> EngineResult<()>;
}
