// SPDX-License-Identifier: Apache-2.0

//! Federation router
//!
//! Presents the registered connections plus the local engine as one logical
//! engine. Name resolution probes candidates one at a time and stops at the
//! first owner; execution sends the whole expression to the single backend its
//! tables came from.

use std::sync::Arc;

use federa_core::{ConnectionId, EngineError, EngineResult, Namespace, QueryResult};
use federa_query::{Expr, SourceRef, TableHandle};
use tracing::{debug, info, instrument, warn};

use crate::config::FederationConfig;
use crate::engine::drivers::DuckDbBackend;
use crate::engine::pattern::NamePattern;
use crate::engine::registry::{ConnectionRegistry, RegisteredConnection};
use crate::engine::traits::{Backend, LocalEngine};
use crate::federation::cache::CacheMaterializer;
use crate::federation::provenance::{Origin, ProvenanceTracker};

/// Name the local engine reports in errors and logs
pub const LOCAL_ENGINE_NAME: &str = "local";

pub struct Router {
    pub(crate) local: Arc<dyn LocalEngine>,
    pub(crate) registry: ConnectionRegistry,
    pub(crate) provenance: ProvenanceTracker,
    pub(crate) cache: CacheMaterializer,
}

impl Router {
    /// Router over `local` with default settings.
    pub fn new(local: Arc<dyn LocalEngine>) -> Self {
        Self::with_config(local, &FederationConfig::default())
    }

    pub fn with_config(local: Arc<dyn LocalEngine>, config: &FederationConfig) -> Self {
        Self {
            local,
            registry: ConnectionRegistry::with_policy(config.duplicate_connections),
            provenance: ProvenanceTracker::new(),
            cache: CacheMaterializer::new(&config.cache.name_prefix),
        }
    }

    /// Opens the configured DuckDB local engine and builds a router over it.
    pub async fn open(config: &FederationConfig) -> EngineResult<Self> {
        config.validate()?;
        let local = DuckDbBackend::open(LOCAL_ENGINE_NAME, &config.local_engine.path)?;
        if let Some(threads) = config.local_engine.threads {
            local.set_threads(threads).await?;
        }
        info!(path = local.db_path(), "Opened local engine");
        Ok(Self::with_config(Arc::new(local), config))
    }

    // ==================== Connections ====================

    /// Registers `backend` under `name`, or its declared name.
    pub fn add_connection(
        &mut self,
        backend: Arc<dyn Backend>,
        name: Option<&str>,
    ) -> EngineResult<ConnectionId> {
        self.registry.add(backend, name)
    }

    pub fn drop_connection(&mut self, name: &str) -> EngineResult<()> {
        self.registry.remove(name).map(|_| ())
    }

    pub fn list_connections(&self, filter: Option<&NamePattern>) -> Vec<&RegisteredConnection> {
        self.registry.list(filter)
    }

    pub fn connection(&self, name: &str) -> Option<&RegisteredConnection> {
        self.registry.get(name)
    }

    pub fn local(&self) -> &Arc<dyn LocalEngine> {
        &self.local
    }

    pub fn provenance(&self) -> &ProvenanceTracker {
        &self.provenance
    }

    /// True owner of a handle obtained from this router.
    pub fn origin_of(&self, handle: &TableHandle) -> EngineResult<Origin> {
        self.provenance.lookup(handle.id())
    }

    // ==================== Resolution ====================

    /// Resolves an unqualified table name.
    pub async fn table(&mut self, name: &str) -> EngineResult<TableHandle> {
        self.table_in(name, &Namespace::default()).await
    }

    /// Resolves `name`, probing cached tables, then each connection in
    /// registration order, then the local engine.
    #[instrument(skip(self, namespace), fields(connections = self.registry.len()))]
    pub async fn table_in(&mut self, name: &str, namespace: &Namespace) -> EngineResult<TableHandle> {
        if namespace.is_empty() && self.cache.is_installed(name) {
            match self.local.resolve(name, namespace).await {
                Ok(raw) => {
                    debug!(table = name, "resolved from cache");
                    return Ok(self.provenance.present(&raw, Origin::Local));
                }
                Err(e) if e.is_not_found() => {
                    warn!(table = name, "cached table missing from local engine");
                }
                Err(e) => return Err(e),
            }
        }

        for conn in self.registry.iter() {
            match conn.backend().resolve(name, namespace).await {
                Ok(raw) => {
                    debug!(table = name, connection = conn.name(), "resolved");
                    return Ok(self
                        .provenance
                        .present(&raw, Origin::Connection(conn.id())));
                }
                Err(e) if e.is_not_found() => {
                    debug!(table = name, connection = conn.name(), "not found, trying next");
                }
                Err(e) => {
                    warn!(table = name, connection = conn.name(), error = %e, "probe failed");
                    return Err(e);
                }
            }
        }

        match self.local.resolve(name, namespace).await {
            Ok(raw) => {
                debug!(table = name, "resolved in local engine");
                Ok(self.provenance.present(&raw, Origin::Local))
            }
            Err(e) if e.is_not_found() && !self.registry.is_empty() => {
                Err(EngineError::table_not_found(name))
            }
            Err(e) => Err(e),
        }
    }

    /// Table names of every connection, then of the local engine. Not deduplicated.
    pub async fn list_tables(&self, filter: Option<&NamePattern>) -> EngineResult<Vec<String>> {
        let mut names = Vec::new();
        for conn in self.registry.iter() {
            names.extend(conn.backend().list_tables(filter).await?);
        }
        names.extend(self.local.list_tables(filter).await?);
        Ok(names)
    }

    // ==================== Execution ====================

    /// The single owner every table in `expr` came from.
    pub fn resolve_owner(&self, expr: &Expr) -> EngineResult<Origin> {
        let mut owners: Vec<Origin> = Vec::new();
        for source in expr.sources() {
            let origin = match source {
                SourceRef::Table(handle) => self.provenance.lookup(handle.id())?,
                SourceRef::Cached(_) => Origin::Local,
            };
            if !owners.contains(&origin) {
                owners.push(origin);
            }
        }

        match owners.as_slice() {
            [] => Ok(Origin::Local),
            [single] => Ok(*single),
            _ => Err(EngineError::ambiguous_provenance(
                owners.iter().map(|o| self.origin_label(*o)).collect(),
            )),
        }
    }

    /// Runs `expr` on its owner, materializing deferred cache nodes first.
    #[instrument(skip(self, expr), fields(sources = expr.sources().len()))]
    pub async fn execute(&mut self, expr: &Expr) -> EngineResult<QueryResult> {
        self.materialize_deferred(expr).await?;

        let owner = self.resolve_owner(expr)?;
        debug!(owner = %self.origin_label(owner), "dispatching");
        self.run_on(owner, expr, false).await
    }

    /// Executes on `owner`, pulling the full result when `pull` is set.
    pub(crate) async fn run_on(
        &self,
        owner: Origin,
        expr: &Expr,
        pull: bool,
    ) -> EngineResult<QueryResult> {
        match owner {
            Origin::Local if pull => self.local.pull_all(expr).await,
            Origin::Local => self.local.execute(expr).await,
            Origin::Connection(id) => {
                let conn = self
                    .registry
                    .get_by_id(id)
                    .ok_or_else(|| EngineError::unknown_connection(id.to_string()))?;
                if pull {
                    conn.backend().pull_all(expr).await
                } else {
                    conn.backend().execute(expr).await
                }
            }
        }
    }

    pub(crate) fn origin_label(&self, origin: Origin) -> String {
        match origin {
            Origin::Local => LOCAL_ENGINE_NAME.to_string(),
            Origin::Connection(id) => self
                .registry
                .get_by_id(id)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| id.to_string()),
        }
    }

    // ==================== Unsupported ====================

    pub fn create_table(&self, name: &str, _source: Option<&Expr>) -> EngineResult<TableHandle> {
        Err(EngineError::unsupported(format!("create_table({name})")))
    }

    pub fn create_view(&self, name: &str, _source: &Expr) -> EngineResult<TableHandle> {
        Err(EngineError::unsupported(format!("create_view({name})")))
    }

    pub fn drop_table(&self, name: &str) -> EngineResult<()> {
        Err(EngineError::unsupported(format!("drop_table({name})")))
    }

    pub fn drop_view(&self, name: &str) -> EngineResult<()> {
        Err(EngineError::unsupported(format!("drop_view({name})")))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("local", &self.local.name())
            .field("registry", &self.registry)
            .field("provenance", &self.provenance)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use federa_core::{ColumnInfo, TableSchema};
    use federa_query::Dialect;

    /// Backend that knows a fixed set of names and fails on one.
    struct Fixed {
        name: &'static str,
        tables: Vec<&'static str>,
        broken: Option<&'static str>,
    }

    #[async_trait]
    impl Backend for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn driver_id(&self) -> &'static str {
            "fixed"
        }

        fn dialect(&self) -> Dialect {
            Dialect::DuckDb
        }

        async fn resolve(&self, name: &str, namespace: &Namespace) -> EngineResult<TableHandle> {
            if self.broken == Some(name) {
                return Err(EngineError::connection_failed("backend unreachable"));
            }
            if self.tables.contains(&name) {
                let schema = TableSchema::new(vec![ColumnInfo::new("id", "BIGINT")]);
                Ok(TableHandle::physical(self.name, name, namespace.clone(), schema))
            } else {
                Err(EngineError::object_not_found(name, self.name))
            }
        }

        async fn list_tables(&self, _filter: Option<&NamePattern>) -> EngineResult<Vec<String>> {
            Ok(self.tables.iter().map(|t| t.to_string()).collect())
        }

        async fn execute(&self, _expr: &Expr) -> EngineResult<QueryResult> {
            Ok(QueryResult::empty())
        }
    }

    fn fixed(name: &'static str, tables: &[&'static str]) -> Arc<dyn Backend> {
        Arc::new(Fixed {
            name,
            tables: tables.to_vec(),
            broken: None,
        })
    }

    fn router() -> Router {
        Router::new(Arc::new(DuckDbBackend::in_memory(LOCAL_ENGINE_NAME).unwrap()))
    }

    #[tokio::test]
    async fn first_registered_owner_wins() {
        let mut router = router();
        let a = router.add_connection(fixed("a", &["t"]), None).unwrap();
        router.add_connection(fixed("b", &["t"]), None).unwrap();

        let handle = router.table("t").await.unwrap();
        assert_eq!(router.origin_of(&handle).unwrap(), Origin::Connection(a));
    }

    #[tokio::test]
    async fn missing_everywhere_is_table_not_found() {
        let mut router = router();
        router.add_connection(fixed("a", &["t"]), None).unwrap();

        let err = router.table("missing").await.unwrap_err();
        assert_eq!(err, EngineError::table_not_found("missing"));
    }

    #[tokio::test]
    async fn non_absence_errors_stop_the_search() {
        let mut router = router();
        router
            .add_connection(
                Arc::new(Fixed {
                    name: "flaky",
                    tables: vec![],
                    broken: Some("t"),
                }),
                None,
            )
            .unwrap();
        router.add_connection(fixed("b", &["t"]), None).unwrap();

        let err = router.table("t").await.unwrap_err();
        assert!(matches!(err, EngineError::ConnectionFailed { .. }));
    }

    #[tokio::test]
    async fn list_tables_concatenates_in_candidate_order() {
        let mut router = router();
        router.add_connection(fixed("a", &["t", "u"]), None).unwrap();
        router.add_connection(fixed("b", &["t"]), None).unwrap();

        let names = router.list_tables(None).await.unwrap();
        assert_eq!(names, vec!["t", "u", "t"]);
    }

    #[tokio::test]
    async fn unsupported_operations_fail() {
        let router = router();
        assert!(matches!(
            router.drop_table("t").unwrap_err(),
            EngineError::UnsupportedOperation { .. }
        ));
        assert!(matches!(
            router.drop_view("v").unwrap_err(),
            EngineError::UnsupportedOperation { .. }
        ));
        assert!(matches!(
            router.create_table("t", None).unwrap_err(),
            EngineError::UnsupportedOperation { .. }
        ));
    }

    #[tokio::test]
    async fn dropped_owner_is_unknown_connection() {
        let mut router = router();
        router.add_connection(fixed("a", &["t"]), None).unwrap();
        let handle = router.table("t").await.unwrap();

        router.drop_connection("a").unwrap();
        let err = router.execute(&handle.to_expr()).await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownConnection { .. }));
    }

    #[tokio::test]
    async fn mixed_owners_are_ambiguous() {
        let mut router = router();
        router.add_connection(fixed("a", &["t"]), None).unwrap();
        router.add_connection(fixed("b", &["u"]), None).unwrap();

        let t = router.table("t").await.unwrap();
        let u = router.table("u").await.unwrap();
        let expr = t.to_expr().join(u.to_expr(), &[("id", "id")]);

        match router.resolve_owner(&expr).unwrap_err() {
            EngineError::AmbiguousProvenance { owners } => {
                assert_eq!(owners, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
