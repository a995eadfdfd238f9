// SPDX-License-Identifier: Apache-2.0

//! Cache materialization
//!
//! Pulls the complete result of an expression from its owner and installs it
//! as a temporary table in the local engine. Generated names come from a
//! [`NameAllocator`] keyed by the expression's owner and rendered SQL, so the
//! same computation always lands in the same table.

use std::collections::{HashMap, HashSet};

use federa_core::{EngineError, EngineResult};
use federa_query::{to_sql, CachedTable, Dialect, Expr, TableHandle};
use tracing::{info, instrument, warn};

use crate::federation::naming::NameAllocator;
use crate::federation::provenance::Origin;
use crate::federation::router::Router;

/// Identity of a cached computation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub origin: Origin,
    pub sql: String,
}

/// Cache names handed out so far and the ones already installed locally
#[derive(Debug)]
pub struct CacheMaterializer {
    names: NameAllocator<CacheKey>,
    installed: HashSet<String>,
}

impl CacheMaterializer {
    pub fn new(prefix: &str) -> Self {
        Self {
            names: NameAllocator::with_prefix(prefix),
            installed: HashSet::new(),
        }
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    pub fn installed(&self) -> impl Iterator<Item = &str> {
        self.installed.iter().map(String::as_str)
    }

    pub fn ref_count(&self, name: &str) -> u64 {
        self.names.ref_count(name)
    }

    pub fn ref_counts(&self) -> &HashMap<String, u64> {
        self.names.ref_counts()
    }
}

impl Router {
    pub fn cache_state(&self) -> &CacheMaterializer {
        &self.cache
    }

    /// Materializes `expr` as local table `name` and resolves it.
    ///
    /// An existing cached table of that name is replaced.
    pub async fn cache(&mut self, name: &str, expr: &Expr) -> EngineResult<TableHandle> {
        self.materialize(name, expr).await?;
        self.table(name).await
    }

    /// Materializes `expr` under a generated name, on first reference only.
    pub async fn cache_expr(&mut self, expr: &Expr) -> EngineResult<TableHandle> {
        let key = self.cache_key(expr)?;
        let name = self.cache.names.name_for(&key);
        if !self.cache.is_installed(&name) {
            self.materialize(&name, expr).await?;
        }
        self.table(&name).await
    }

    /// Wraps `expr` in a cached node without running it.
    ///
    /// The node reads as a local table; `execute` materializes it the first
    /// time an expression containing it runs.
    pub fn deferred(&mut self, expr: Expr) -> EngineResult<Expr> {
        let key = self.cache_key(&expr)?;
        let schema = expr.schema()?;
        let name = self.cache.names.name_for(&key);
        Ok(Expr::Cached(CachedTable {
            name,
            schema,
            source: Box::new(expr),
        }))
    }

    /// Pulls `expr` from its owner and installs it locally as `name`.
    ///
    /// Pull or install failures leave the local catalog as it was and are
    /// reported as `MaterializationFailure`.
    #[instrument(skip(self, expr))]
    pub async fn materialize(&mut self, name: &str, expr: &Expr) -> EngineResult<()> {
        self.materialize_deferred(expr).await?;
        self.install(name, expr).await
    }

    /// Installs every cached node of `expr` not yet present, inner nodes first.
    pub(crate) async fn materialize_deferred(&mut self, expr: &Expr) -> EngineResult<()> {
        for cached in expr.cached_tables() {
            if !self.cache.is_installed(&cached.name) {
                self.install(&cached.name, &cached.source).await?;
            }
        }
        Ok(())
    }

    async fn install(&mut self, name: &str, expr: &Expr) -> EngineResult<()> {
        let owner = self.resolve_owner(expr)?;

        let data = self.run_on(owner, expr, true).await.map_err(|e| {
            warn!(table = name, error = %e, "pull failed");
            EngineError::materialization(name, e.to_string())
        })?;

        self.local
            .install_temp_table(name, &data)
            .await
            .map_err(|e| {
                warn!(table = name, error = %e, "install failed");
                EngineError::materialization(name, e.to_string())
            })?;

        self.cache.installed.insert(name.to_string());
        info!(
            table = name,
            owner = %self.origin_label(owner),
            rows = data.rows.len(),
            "Materialized into local engine"
        );
        Ok(())
    }

    fn cache_key(&self, expr: &Expr) -> EngineResult<CacheKey> {
        Ok(CacheKey {
            origin: self.resolve_owner(expr)?,
            sql: to_sql(expr, Dialect::DuckDb)?,
        })
    }
}
