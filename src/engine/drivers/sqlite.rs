// SPDX-License-Identifier: Apache-2.0

//! SQLite Backend
//!
//! Exposes a SQLite database as a federation backend using SQLx.
//!
//! ## SQLite Specifics
//!
//! - Supports `:memory:` for in-memory databases
//! - Uses WAL mode for file databases
//! - Single namespace per file; an attached database is addressed through the
//!   namespace's schema

use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Executor, Row as _, Statement, TypeInfo};
use tracing::{debug, instrument};

use federa_core::{
    ColumnInfo, EngineError, EngineResult, Namespace, QueryResult, Row, TableSchema, Value,
};
use federa_query::{to_sql, Dialect, Expr, TableHandle};

use crate::engine::pattern::{filter_names, NamePattern};
use crate::engine::traits::Backend;

/// SQLite backend over a SQLx pool
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    name: String,
    pool: SqlitePool,
    db_path: String,
}

impl SqliteBackend {
    /// Opens a private in-memory database.
    ///
    /// The pool is pinned to a single connection that never expires, since each
    /// new in-memory connection would see an empty database.
    pub async fn in_memory(name: impl Into<String>) -> EngineResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            pool,
            db_path: ":memory:".to_string(),
        })
    }

    /// Opens (or creates) the database file at `path`.
    pub async fn open(name: impl Into<String>, path: &str) -> EngineResult<Self> {
        let path = path.trim();
        if path.is_empty() {
            return Err(EngineError::connection_failed("SQLite path cannot be empty."));
        }
        if path == ":memory:" {
            return Self::in_memory(name).await;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(opts)
            .await
            .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| EngineError::execution_error(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            pool,
            db_path: path.to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Runs raw statements (DDL, inserts) directly on this database.
    pub async fn execute_batch(&self, sql: &str) -> EngineResult<()> {
        sqlx::raw_sql(sql)
            .execute(&self.pool)
            .await
            .map_err(classify_error)?;
        Ok(())
    }

    /// Runs a raw `SELECT` and returns every row.
    pub async fn query(&self, sql: &str) -> EngineResult<QueryResult> {
        let start = Instant::now();
        let sqlite_rows: Vec<SqliteRow> = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(classify_error)?;

        let rows: Vec<Row> = sqlite_rows.iter().map(convert_row).collect();
        let columns = match sqlite_rows.first() {
            Some(first) => get_column_info(first, &rows),
            None => {
                // no rows to read metadata from; ask the prepared statement
                let stmt = (&self.pool).prepare(sql).await.map_err(classify_error)?;
                stmt.columns()
                    .iter()
                    .map(|c| ColumnInfo::new(c.name(), declared_type(c.type_info().name())))
                    .collect()
            }
        };

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_micros() as f64 / 1000.0,
        })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Converts a SQLx row to our universal Row type
fn convert_row(sqlite_row: &SqliteRow) -> Row {
    let values: Vec<Value> = sqlite_row
        .columns()
        .iter()
        .map(|col| extract_value(sqlite_row, col.ordinal()))
        .collect();

    Row { values }
}

/// Extracts a value from a SqliteRow at the given index
///
/// SQLite has dynamic typing, so we try multiple types in order of likelihood.
/// Integer decoding rejects REAL storage, so floats are never truncated.
fn extract_value(row: &SqliteRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(Value::Int).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::Float).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::Text).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
        return v.map(Value::Bytes).unwrap_or(Value::Null);
    }

    Value::Null
}

/// Gets column info from a SqliteRow, falling back to value types for
/// computed columns that carry no declared type
fn get_column_info(row: &SqliteRow, rows: &[Row]) -> Vec<ColumnInfo> {
    row.columns()
        .iter()
        .map(|col| {
            let declared = col.type_info().name();
            let data_type = if declared.eq_ignore_ascii_case("NULL") {
                rows.iter()
                    .filter_map(|r| r.values.get(col.ordinal()))
                    .find_map(Value::type_name)
                    .unwrap_or("VARCHAR")
            } else {
                declared_type(declared)
            };
            ColumnInfo::new(col.name(), data_type)
        })
        .collect()
}

fn declared_type(name: &str) -> &str {
    if name.is_empty() || name.eq_ignore_ascii_case("NULL") {
        "VARCHAR"
    } else {
        name
    }
}

fn classify_error(e: sqlx::Error) -> EngineError {
    let msg = e.to_string();
    if msg.contains("syntax") {
        EngineError::syntax_error(msg)
    } else {
        EngineError::execution_error(msg)
    }
}

#[async_trait]
impl Backend for SqliteBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver_id(&self) -> &'static str {
        "sqlite"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    #[instrument(skip(self, namespace), fields(backend = %self.name))]
    async fn resolve(&self, name: &str, namespace: &Namespace) -> EngineResult<TableHandle> {
        let table_ident = Dialect::Sqlite.quote_ident(name);
        let pragma_query = match &namespace.schema {
            Some(schema) => format!(
                "PRAGMA {}.table_info({table_ident})",
                Dialect::Sqlite.quote_ident(schema)
            ),
            None => format!("PRAGMA table_info({table_ident})"),
        };

        let column_rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
            sqlx::query_as(&pragma_query)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| EngineError::execution_error(e.to_string()))?;

        if column_rows.is_empty() {
            debug!(table = name, "not found in SQLite catalog");
            return Err(EngineError::object_not_found(name, &self.name));
        }

        let columns = column_rows
            .into_iter()
            .map(|(_cid, column, data_type, notnull, _dflt_value, _pk)| ColumnInfo {
                data_type: declared_type(&data_type).into(),
                name: column.into(),
                nullable: notnull == 0,
            })
            .collect();

        Ok(TableHandle::physical(
            &self.name,
            name,
            namespace.clone(),
            TableSchema::new(columns),
        ))
    }

    async fn list_tables(&self, filter: Option<&NamePattern>) -> EngineResult<Vec<String>> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| EngineError::execution_error(e.to_string()))?;

        Ok(filter_names(names.into_iter().map(|(n,)| n).collect(), filter))
    }

    #[instrument(skip(self, expr), fields(backend = %self.name))]
    async fn execute(&self, expr: &Expr) -> EngineResult<QueryResult> {
        let sql = to_sql(expr, Dialect::Sqlite)?;
        debug!(%sql, "executing on SQLite");
        self.query(&sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use federa_query::{col, lit, SortKey};

    async fn seeded() -> SqliteBackend {
        let backend = SqliteBackend::in_memory("lite").await.unwrap();
        backend
            .execute_batch(
                "CREATE TABLE customers (id INTEGER NOT NULL, name TEXT, score REAL); \
                 INSERT INTO customers VALUES (1, 'ada', 9.5), (2, 'bob', 3.0), (3, NULL, 7.25);",
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_resolve_reads_declared_columns() {
        let backend = seeded().await;
        let handle = backend.resolve("customers", &Namespace::default()).await.unwrap();

        let schema = handle.schema();
        assert_eq!(schema.names().collect::<Vec<_>>(), vec!["id", "name", "score"]);
        assert_eq!(schema.column("id").unwrap().data_type, "INTEGER");
        assert!(!schema.column("id").unwrap().nullable);
        assert!(schema.column("name").unwrap().nullable);
    }

    #[tokio::test]
    async fn test_resolve_missing_is_object_not_found() {
        let backend = seeded().await;
        let err = backend.resolve("orders", &Namespace::default()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_execute_keeps_real_values() {
        let backend = seeded().await;
        let handle = backend.resolve("customers", &Namespace::default()).await.unwrap();
        let expr = handle
            .to_expr()
            .filter(col("score").gt(lit(5)))
            .order_by(vec![SortKey::asc("id")]);

        let result = backend.execute(&expr).await.unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(
            result.column_values("score").unwrap(),
            vec![&Value::Float(9.5), &Value::Float(7.25)]
        );
        assert_eq!(result.rows[1].values[1], Value::Null);
    }

    #[tokio::test]
    async fn test_empty_result_keeps_columns() {
        let backend = seeded().await;
        let result = backend
            .query("SELECT id, name FROM customers WHERE id > 100")
            .await
            .unwrap();
        assert_eq!(result.row_count(), 0);
        let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);
    }

    #[tokio::test]
    async fn test_list_tables() {
        let backend = seeded().await;
        backend
            .execute_batch("CREATE VIEW top AS SELECT * FROM customers WHERE score > 5")
            .await
            .unwrap();
        assert_eq!(backend.list_tables(None).await.unwrap(), vec!["customers", "top"]);
    }

    #[tokio::test]
    async fn test_file_database_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federa.db");
        let path = path.to_str().unwrap();

        let backend = SqliteBackend::open("disk", path).await.unwrap();
        backend
            .execute_batch("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('x');")
            .await
            .unwrap();
        backend.close().await;

        let reopened = SqliteBackend::open("disk", path).await.unwrap();
        let result = reopened.query("SELECT v FROM t").await.unwrap();
        assert_eq!(result.rows[0].values[0], Value::from("x"));
    }

    #[tokio::test]
    async fn test_syntax_error_classified() {
        let backend = seeded().await;
        let err = backend.query("SELEC 1").await.unwrap_err();
        assert!(matches!(err, EngineError::SyntaxError { .. }));
    }
}
