// SPDX-License-Identifier: Apache-2.0

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use federa::{
    Backend, Dialect, DuckDbBackend, EngineError, EngineResult, Expr, NamePattern, Namespace,
    QueryResult, Router, TableHandle,
};

/// Wraps a backend and counts every call that reaches it.
pub struct Counting {
    inner: Arc<dyn Backend>,
    pub resolves: AtomicUsize,
    pub executes: AtomicUsize,
    pub fail_pulls: bool,
}

impl Counting {
    pub fn wrap(inner: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            resolves: AtomicUsize::new(0),
            executes: AtomicUsize::new(0),
            fail_pulls: false,
        })
    }

    /// Resolves normally but refuses to hand over full results.
    pub fn failing_pulls(inner: Arc<dyn Backend>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            resolves: AtomicUsize::new(0),
            executes: AtomicUsize::new(0),
            fail_pulls: true,
        })
    }

    pub fn calls(&self) -> usize {
        self.resolves.load(Ordering::SeqCst) + self.executes.load(Ordering::SeqCst)
    }

    pub fn executes(&self) -> usize {
        self.executes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for Counting {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn driver_id(&self) -> &'static str {
        self.inner.driver_id()
    }

    fn dialect(&self) -> Dialect {
        self.inner.dialect()
    }

    async fn resolve(&self, name: &str, namespace: &Namespace) -> EngineResult<TableHandle> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(name, namespace).await
    }

    async fn list_tables(&self, filter: Option<&NamePattern>) -> EngineResult<Vec<String>> {
        self.inner.list_tables(filter).await
    }

    async fn execute(&self, expr: &Expr) -> EngineResult<QueryResult> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(expr).await
    }

    async fn pull_all(&self, expr: &Expr) -> EngineResult<QueryResult> {
        self.executes.fetch_add(1, Ordering::SeqCst);
        if self.fail_pulls {
            return Err(EngineError::connection_failed("connection reset during transfer"));
        }
        self.inner.pull_all(expr).await
    }
}

/// Backend "a" holding `orders(id INTEGER, total DOUBLE)`.
pub async fn orders_backend() -> DuckDbBackend {
    let backend = DuckDbBackend::in_memory("a").expect("open a");
    backend
        .execute_batch(
            "CREATE TABLE orders (id INTEGER, customer_id INTEGER, total DOUBLE); \
             INSERT INTO orders VALUES \
                 (1, 10, 40.0), (2, 10, 120.5), (3, 20, 99.99), (4, 30, 250.0), (5, 20, 100.0);",
        )
        .await
        .expect("seed a");
    backend
}

/// Backend "b" holding `customers(id INTEGER, name VARCHAR)`.
pub async fn customers_backend() -> DuckDbBackend {
    let backend = DuckDbBackend::in_memory("b").expect("open b");
    backend
        .execute_batch(
            "CREATE TABLE customers (id INTEGER, name VARCHAR); \
             INSERT INTO customers VALUES (10, 'ada'), (20, 'grace'), (30, 'linus');",
        )
        .await
        .expect("seed b");
    backend
}

pub fn local_router() -> Router {
    Router::new(Arc::new(DuckDbBackend::in_memory("local").expect("open local")))
}
