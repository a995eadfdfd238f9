// SPDX-License-Identifier: Apache-2.0

//! DuckDB Backend
//!
//! Embedded DuckDB exposed as a federation backend. The same type serves as the
//! router's local engine (it implements [`LocalEngine`]) and as a registrable
//! connection.
//!
//! ## Concurrency Model
//!
//! The `duckdb` crate provides a synchronous API. All operations are wrapped
//! in `tokio::task::spawn_blocking`. The `Connection` is `Send` but `!Sync`,
//! so it is protected by a mutex shared by every clone of the backend.
//!
//! ## Catalog lookups
//!
//! Tables are resolved through `duckdb_columns()`, which also sees temporary
//! tables. An unqualified name prefers the temporary catalog, matching how
//! DuckDB itself binds the name in a query.

use std::sync::Arc;
use std::time::Instant;

use ::duckdb::arrow::datatypes::DataType;
use ::duckdb::types::Value as DuckValue;
use ::duckdb::{params_from_iter, Connection, Statement};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use federa_core::{
    ColumnInfo, EngineError, EngineResult, Namespace, QueryResult, Row, TableSchema, Value,
};
use federa_query::{to_sql, Dialect, Expr, TableHandle};

use crate::engine::pattern::{filter_names, NamePattern};
use crate::engine::traits::{Backend, LocalEngine};

const MEMORY_PATH: &str = ":memory:";

/// Decimals with fewer digits than this survive an f64 round trip.
const MAX_EXACT_DECIMAL_MANTISSA: u128 = 1_000_000_000_000_000;

/// DuckDB backend over a single shared connection
#[derive(Clone)]
pub struct DuckDbBackend {
    name: String,
    conn: Arc<Mutex<Connection>>,
    /// The file path to the database (or ":memory:").
    db_path: String,
}

impl DuckDbBackend {
    /// Opens a private in-memory database.
    pub fn in_memory(name: impl Into<String>) -> EngineResult<Self> {
        Self::open(name, MEMORY_PATH)
    }

    /// Opens (or creates) the database file at `path`.
    pub fn open(name: impl Into<String>, path: &str) -> EngineResult<Self> {
        let path = path.trim();
        let conn = if path == MEMORY_PATH || path.is_empty() {
            Connection::open_in_memory().map_err(|e| {
                EngineError::connection_failed(format!("Failed to open DuckDB in-memory: {e}"))
            })?
        } else {
            Connection::open(path).map_err(|e| {
                EngineError::connection_failed(format!("Failed to open DuckDB file '{path}': {e}"))
            })?
        };

        Ok(Self {
            name: name.into(),
            conn: Arc::new(Mutex::new(conn)),
            db_path: if path.is_empty() { MEMORY_PATH.to_string() } else { path.to_string() },
        })
    }

    /// Caps the worker threads DuckDB uses for this database.
    pub async fn set_threads(&self, threads: usize) -> EngineResult<()> {
        if threads == 0 {
            return Err(EngineError::config("DuckDB thread count must be at least 1"));
        }
        self.execute_batch(&format!("SET threads TO {threads}")).await
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Runs raw statements (DDL, inserts) directly on this database.
    pub async fn execute_batch(&self, sql: &str) -> EngineResult<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute_batch(&sql).map_err(|e| classify_error(e.to_string())))
            .await
    }

    /// Runs a raw `SELECT` and returns every row.
    pub async fn query(&self, sql: &str) -> EngineResult<QueryResult> {
        let sql = sql.to_string();
        self.with_conn(move |conn| execute_select(conn, &sql, Instant::now()))
            .await
    }

    /// Runs a synchronous closure on the connection inside spawn_blocking.
    async fn with_conn<F, R>(&self, f: F) -> EngineResult<R>
    where
        F: FnOnce(&Connection) -> EngineResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&guard)
        })
        .await
        .map_err(|e| EngineError::internal(format!("DuckDB task panicked: {e}")))?
    }
}

impl std::fmt::Debug for DuckDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbBackend")
            .field("name", &self.name)
            .field("db_path", &self.db_path)
            .finish()
    }
}

// ==================== Type Conversion ====================

/// Converts a federation Value to a DuckDB Value for parameter binding.
fn value_to_duckdb(value: &Value) -> DuckValue {
    match value {
        Value::Null => DuckValue::Null,
        Value::Bool(b) => DuckValue::Boolean(*b),
        Value::Int(i) => DuckValue::BigInt(*i),
        Value::Float(f) => DuckValue::Double(*f),
        Value::Text(s) => DuckValue::Text(s.clone()),
        Value::Bytes(b) => DuckValue::Blob(b.clone()),
        Value::Array(arr) => DuckValue::Text(serde_json::to_string(arr).unwrap_or_default()),
    }
}

/// Converts a value read from DuckDB into a federation Value.
fn duckdb_to_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(b) => Value::Bool(b),
        DuckValue::TinyInt(i) => Value::Int(i.into()),
        DuckValue::SmallInt(i) => Value::Int(i.into()),
        DuckValue::Int(i) => Value::Int(i.into()),
        DuckValue::BigInt(i) => Value::Int(i),
        DuckValue::UTinyInt(i) => Value::Int(i.into()),
        DuckValue::USmallInt(i) => Value::Int(i.into()),
        DuckValue::UInt(i) => Value::Int(i.into()),
        DuckValue::UBigInt(i) => match i64::try_from(i) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Text(i.to_string()),
        },
        DuckValue::HugeInt(i) => match i64::try_from(i) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Text(i.to_string()),
        },
        DuckValue::Float(f) => Value::Float(f.into()),
        DuckValue::Double(f) => Value::Float(f),
        DuckValue::Decimal(d) => {
            let text = d.to_string();
            // beyond f64's exact range the digits travel as text
            if d.value().unsigned_abs() >= MAX_EXACT_DECIMAL_MANTISSA {
                return Value::Text(text);
            }
            text.parse::<f64>().map(Value::Float).unwrap_or(Value::Text(text))
        }
        DuckValue::Text(s) | DuckValue::Enum(s) => Value::Text(s),
        DuckValue::Blob(b) => Value::Bytes(b),
        DuckValue::Timestamp(unit, raw) => {
            let micros = unit.to_micros(raw);
            match DateTime::from_timestamp_micros(micros) {
                Some(ts) => Value::Text(ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f").to_string()),
                None => Value::Int(raw),
            }
        }
        DuckValue::Date32(days) => {
            let date = NaiveDate::from_ymd_opt(1970, 1, 1)
                .and_then(|epoch| epoch.checked_add_signed(chrono::Duration::days(days.into())));
            match date {
                Some(d) => Value::Text(d.format("%Y-%m-%d").to_string()),
                None => Value::Int(days.into()),
            }
        }
        DuckValue::Time64(unit, raw) => {
            let micros = unit.to_micros(raw);
            let secs = u32::try_from(micros.div_euclid(1_000_000)).unwrap_or(0);
            let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).unwrap_or(0);
            match NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos) {
                Some(t) => Value::Text(t.format("%H:%M:%S%.f").to_string()),
                None => Value::Int(raw),
            }
        }
        DuckValue::List(items) | DuckValue::Array(items) => {
            Value::Array(items.into_iter().map(duckdb_to_value).collect())
        }
        other => Value::Text(format!("{other:?}")),
    }
}

/// Maps a column type name from any backend to a DuckDB column type.
fn map_type_to_duckdb(data_type: &str) -> String {
    let lower = data_type.to_lowercase();
    let normalized = lower.trim();

    let mapped = match normalized {
        "boolean" | "bool" => "BOOLEAN",
        "tinyint" | "smallint" | "integer" | "int" | "int4" | "bigint" | "int8" | "utinyint"
        | "usmallint" | "uinteger" => "BIGINT",
        "ubigint" => "UBIGINT",
        "hugeint" | "int128" => "HUGEINT",
        "real" | "float" | "float4" | "double" | "double precision" | "float8" | "numeric"
        | "decimal" => "DOUBLE",
        "blob" | "bytea" | "binary" | "varbinary" => "BLOB",
        "date" => "DATE",
        "time" => "TIME",
        "timestamp" | "timestamp without time zone" => "TIMESTAMP",
        "timestamptz" | "timestamp with time zone" => "TIMESTAMPTZ",
        _ if normalized.starts_with("decimal(") || normalized.starts_with("numeric(") => {
            return decimal_type(normalized).unwrap_or_else(|| "DOUBLE".to_string());
        }
        // lists and anything unrecognized arrive as text
        _ => "VARCHAR",
    };
    mapped.to_string()
}

/// Keeps the precision and scale of `decimal(p,s)` / `numeric(p,s)`.
fn decimal_type(normalized: &str) -> Option<String> {
    let args = normalized.split_once('(')?.1.strip_suffix(')')?;
    let mut parts = args.split(',').map(str::trim);
    let precision: u8 = parts.next()?.parse().ok()?;
    let scale: u8 = parts.next().map_or(Ok(0), str::parse).ok()?;
    if parts.next().is_some() || precision == 0 || precision > 38 || scale > precision {
        return None;
    }
    Some(format!("DECIMAL({precision},{scale})"))
}

/// DuckDB type name for a result column type reported by the statement.
///
/// `None` for types the cache cannot reproduce from the converted values.
fn duckdb_type_name(data_type: &DataType) -> Option<String> {
    let name = match data_type {
        DataType::Boolean => "BOOLEAN",
        DataType::Int8 => "TINYINT",
        DataType::Int16 => "SMALLINT",
        DataType::Int32 => "INTEGER",
        DataType::Int64 => "BIGINT",
        DataType::UInt8 => "UTINYINT",
        DataType::UInt16 => "USMALLINT",
        DataType::UInt32 => "UINTEGER",
        DataType::UInt64 => "UBIGINT",
        DataType::Float16 | DataType::Float32 => "FLOAT",
        DataType::Float64 => "DOUBLE",
        DataType::Decimal128(precision, scale) if *scale >= 0 => {
            return Some(format!("DECIMAL({precision},{scale})"));
        }
        DataType::Utf8 | DataType::LargeUtf8 => "VARCHAR",
        DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_) => "BLOB",
        DataType::Date32 | DataType::Date64 => "DATE",
        DataType::Time32(_) | DataType::Time64(_) => "TIME",
        DataType::Timestamp(_, None) => "TIMESTAMP",
        DataType::Timestamp(_, Some(_)) => "TIMESTAMPTZ",
        _ => return None,
    };
    Some(name.to_string())
}

/// Column type for a result column known only through its values.
fn infer_column_type(rows: &[Row], index: usize) -> &'static str {
    rows.iter()
        .filter_map(|r| r.values.get(index))
        .find_map(Value::type_name)
        .unwrap_or("VARCHAR")
}

/// Result columns of an executed statement.
///
/// Types come from the statement; value-based inference covers the ones
/// [`duckdb_type_name`] cannot name.
fn result_columns(stmt: &Statement<'_>, rows: &[Row]) -> Vec<ColumnInfo> {
    (0..stmt.column_count())
        .map(|i| {
            let name = stmt
                .column_name(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| format!("col_{i}"));
            let data_type = duckdb_type_name(&stmt.column_type(i))
                .unwrap_or_else(|| infer_column_type(rows, i).to_string());
            ColumnInfo::new(name, data_type)
        })
        .collect()
}

/// Executes a SELECT-style query and returns a QueryResult.
///
/// NOTE: DuckDB crate requires that `column_name()` and `column_type()` are
/// called AFTER the statement has been executed (i.e., after iterating rows).
/// We collect rows first, then extract the column list.
fn execute_select(conn: &Connection, sql: &str, start: Instant) -> EngineResult<QueryResult> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| classify_error(e.to_string()))?;

    let rows_iter = stmt
        .query_map([], |row| {
            let col_count = row.as_ref().column_count();
            let mut values = Vec::with_capacity(col_count);
            for i in 0..col_count {
                values.push(duckdb_to_value(row.get::<_, DuckValue>(i)?));
            }
            Ok(Row { values })
        })
        .map_err(|e| classify_error(e.to_string()))?;

    let mut rows = Vec::new();
    for row_result in rows_iter {
        let row = row_result.map_err(|e| EngineError::execution_error(e.to_string()))?;
        rows.push(row);
    }

    Ok(QueryResult {
        columns: result_columns(&stmt, &rows),
        rows,
        execution_time_ms: start.elapsed().as_micros() as f64 / 1000.0,
    })
}

/// Classifies a DuckDB error message into syntax or execution error.
fn classify_error(msg: String) -> EngineError {
    let lower = msg.to_lowercase();
    if lower.contains("syntax") || lower.contains("parser") {
        EngineError::syntax_error(msg)
    } else {
        EngineError::execution_error(msg)
    }
}

/// Reads the column list of `name`, preferring temporary tables when unqualified.
fn describe_table(
    conn: &Connection,
    name: &str,
    namespace: &Namespace,
) -> EngineResult<Option<TableSchema>> {
    // unified param list so optional qualifiers stay positional
    let mut sql = String::from(
        "SELECT database_name, schema_name, column_name, data_type, is_nullable \
         FROM duckdb_columns() WHERE table_name = ?",
    );
    let mut bind: Vec<String> = vec![name.to_string()];
    match &namespace.database {
        Some(database) => {
            sql.push_str(" AND database_name = ?");
            bind.push(database.clone());
        }
        None => sql.push_str(" AND database_name IN ('temp', current_database())"),
    }
    sql.push_str(" AND schema_name = ?");
    bind.push(namespace.schema.clone().unwrap_or_else(|| "main".to_string()));
    sql.push_str(" ORDER BY database_name <> 'temp', database_name, schema_name, column_index");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| EngineError::execution_error(e.to_string()))?;

    let rows = stmt
        .query_map(params_from_iter(bind.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })
        .map_err(|e| EngineError::execution_error(e.to_string()))?;

    let mut owner: Option<(String, String)> = None;
    let mut columns = Vec::new();
    for row in rows {
        let (database, schema, column, data_type, nullable) =
            row.map_err(|e| EngineError::execution_error(e.to_string()))?;
        match &owner {
            None => owner = Some((database, schema)),
            // a shadowed table with the same name
            Some(first) if first.0 != database || first.1 != schema => break,
            Some(_) => {}
        }
        columns.push(ColumnInfo {
            name: column.into(),
            data_type: data_type.into(),
            nullable,
        });
    }

    Ok(owner.map(|_| TableSchema::new(columns)))
}

// ==================== Backend Implementation ====================

#[async_trait]
impl Backend for DuckDbBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn driver_id(&self) -> &'static str {
        "duckdb"
    }

    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    #[instrument(skip(self, namespace), fields(backend = %self.name))]
    async fn resolve(&self, name: &str, namespace: &Namespace) -> EngineResult<TableHandle> {
        let table = name.to_string();
        let ns = namespace.clone();
        let schema = self
            .with_conn(move |conn| describe_table(conn, &table, &ns))
            .await?;

        match schema {
            Some(schema) => Ok(TableHandle::physical(&self.name, name, namespace.clone(), schema)),
            None => {
                debug!(table = name, "not found in DuckDB catalog");
                Err(EngineError::object_not_found(name, &self.name))
            }
        }
    }

    async fn list_tables(&self, filter: Option<&NamePattern>) -> EngineResult<Vec<String>> {
        let names = self
            .with_conn(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT name FROM ( \
                             SELECT table_name AS name FROM duckdb_tables() WHERE NOT internal \
                             UNION ALL \
                             SELECT view_name AS name FROM duckdb_views() WHERE NOT internal \
                         ) ORDER BY name",
                    )
                    .map_err(|e| EngineError::execution_error(e.to_string()))?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(|e| EngineError::execution_error(e.to_string()))?;

                let mut names = Vec::new();
                for row in rows {
                    names.push(row.map_err(|e| EngineError::execution_error(e.to_string()))?);
                }
                Ok(names)
            })
            .await?;

        Ok(filter_names(names, filter))
    }

    #[instrument(skip(self, expr), fields(backend = %self.name))]
    async fn execute(&self, expr: &Expr) -> EngineResult<QueryResult> {
        let sql = to_sql(expr, Dialect::DuckDb)?;
        debug!(%sql, "executing on DuckDB");
        self.query(&sql).await
    }
}

#[async_trait]
impl LocalEngine for DuckDbBackend {
    #[instrument(skip(self, data), fields(rows = data.rows.len()))]
    async fn install_temp_table(&self, name: &str, data: &QueryResult) -> EngineResult<()> {
        if data.columns.is_empty() {
            return Err(EngineError::validation(format!(
                "Cannot create temp table '{name}': no columns"
            )));
        }

        let quoted = Dialect::DuckDb.quote_ident(name);
        let col_defs: Vec<String> = data
            .columns
            .iter()
            .map(|c| {
                format!(
                    "{} {}",
                    Dialect::DuckDb.quote_ident(&c.name),
                    map_type_to_duckdb(&c.data_type)
                )
            })
            .collect();
        let create_sql = format!("CREATE OR REPLACE TEMP TABLE {quoted} ({})", col_defs.join(", "));

        let placeholders: Vec<String> = (1..=data.columns.len()).map(|i| format!("?{i}")).collect();
        let insert_sql = format!("INSERT INTO {quoted} VALUES ({})", placeholders.join(", "));

        let rows = data.rows.clone();
        let width = data.columns.len();
        let table = name.to_string();

        self.with_conn(move |conn| {
            // dropping the transaction on error rolls back, leaving any prior table in place
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| EngineError::internal(format!("DuckDB transaction failed: {e}")))?;

            tx.execute_batch(&create_sql).map_err(|e| {
                EngineError::execution_error(format!("Failed to create temp table '{table}': {e}"))
            })?;

            {
                let mut stmt = tx
                    .prepare_cached(&insert_sql)
                    .map_err(|e| EngineError::internal(format!("DuckDB prepare failed: {e}")))?;

                for row in &rows {
                    if row.values.len() != width {
                        return Err(EngineError::validation(format!(
                            "Row has {} values, expected {width}",
                            row.values.len()
                        )));
                    }
                    let duck_values: Vec<DuckValue> = row.values.iter().map(value_to_duckdb).collect();
                    stmt.execute(params_from_iter(duck_values.iter()))
                        .map_err(|e| EngineError::execution_error(format!("DuckDB insert failed: {e}")))?;
                }
            }

            tx.commit()
                .map_err(|e| EngineError::internal(format!("DuckDB commit failed: {e}")))
        })
        .await
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use federa_query::{col, lit};

    async fn seeded() -> DuckDbBackend {
        let backend = DuckDbBackend::in_memory("a").unwrap();
        backend
            .execute_batch(
                "CREATE TABLE orders (id INTEGER, total DOUBLE); \
                 INSERT INTO orders VALUES (1, 50.0), (2, 150.5), (3, 220.0);",
            )
            .await
            .unwrap();
        backend
    }

    #[tokio::test]
    async fn test_resolve_existing_table() {
        let backend = seeded().await;
        let handle = backend.resolve("orders", &Namespace::default()).await.unwrap();

        assert_eq!(handle.name(), "orders");
        let names: Vec<&str> = handle.schema().names().collect();
        assert_eq!(names, vec!["id", "total"]);
        assert_eq!(handle.schema().column("total").unwrap().data_type, "DOUBLE");
    }

    #[tokio::test]
    async fn test_resolve_missing_is_object_not_found() {
        let backend = seeded().await;
        let err = backend.resolve("nope", &Namespace::default()).await.unwrap_err();
        assert_eq!(err, EngineError::object_not_found("nope", "a"));
    }

    #[tokio::test]
    async fn test_execute_filter_keeps_float_precision() {
        let backend = seeded().await;
        let handle = backend.resolve("orders", &Namespace::default()).await.unwrap();
        let expr = handle.to_expr().filter(col("total").gt(lit(100.0)));

        let result = backend.execute(&expr).await.unwrap();
        assert_eq!(result.row_count(), 2);
        assert_eq!(
            result.column_values("total").unwrap(),
            vec![&Value::Float(150.5), &Value::Float(220.0)]
        );
        assert_eq!(result.columns[0].data_type, "INTEGER");
        assert_eq!(result.columns[1].data_type, "DOUBLE");
    }

    #[tokio::test]
    async fn test_empty_and_null_results_keep_statement_types() {
        let backend = seeded().await;
        let empty = backend
            .query("SELECT id, total FROM orders WHERE total > 10000")
            .await
            .unwrap();
        assert_eq!(empty.row_count(), 0);
        assert_eq!(empty.columns[0].data_type, "INTEGER");
        assert_eq!(empty.columns[1].data_type, "DOUBLE");

        let nulls = backend
            .query("SELECT CAST(NULL AS DOUBLE) AS refund, CAST(1.25 AS DECIMAL(9,2)) AS fee")
            .await
            .unwrap();
        assert_eq!(nulls.columns[0].data_type, "DOUBLE");
        assert_eq!(nulls.columns[1].data_type, "DECIMAL(9,2)");
    }

    #[tokio::test]
    async fn test_installed_empty_result_stays_numeric() {
        let remote = seeded().await;
        let empty = remote
            .query("SELECT id, total FROM orders WHERE total > 10000")
            .await
            .unwrap();

        let local = DuckDbBackend::in_memory("local").unwrap();
        local.install_temp_table("c", &empty).await.unwrap();

        let handle = local.resolve("c", &Namespace::default()).await.unwrap();
        assert_eq!(handle.schema().column("total").unwrap().data_type, "DOUBLE");
        let sum = local.query("SELECT SUM(total) AS s FROM c").await.unwrap();
        assert_eq!(sum.rows[0].values, vec![Value::Null]);
    }

    #[tokio::test]
    async fn test_wide_values_survive_install() {
        let remote = DuckDbBackend::in_memory("a").unwrap();
        let wide = remote
            .query(
                "SELECT CAST('9223372036854775808' AS HUGEINT) AS big, \
                        CAST('12345678901234567.89' AS DECIMAL(38,2)) AS amount",
            )
            .await
            .unwrap();
        assert_eq!(
            wide.rows[0].values[0],
            Value::Text("9223372036854775808".into())
        );

        let local = DuckDbBackend::in_memory("local").unwrap();
        local.install_temp_table("c", &wide).await.unwrap();

        let back = local
            .query("SELECT CAST(big AS VARCHAR) AS big, CAST(amount AS VARCHAR) AS amount FROM c")
            .await
            .unwrap();
        assert_eq!(
            back.rows[0].values,
            vec![
                Value::Text("9223372036854775808".into()),
                Value::Text("12345678901234567.89".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_tables_with_filter() {
        let backend = seeded().await;
        backend
            .execute_batch("CREATE VIEW big_orders AS SELECT * FROM orders WHERE total > 100")
            .await
            .unwrap();

        let all = backend.list_tables(None).await.unwrap();
        assert_eq!(all, vec!["big_orders".to_string(), "orders".to_string()]);

        let pattern = NamePattern::new("big*").unwrap();
        assert_eq!(backend.list_tables(Some(&pattern)).await.unwrap(), vec!["big_orders"]);
    }

    #[tokio::test]
    async fn test_install_temp_table_replaces_previous() {
        let backend = DuckDbBackend::in_memory("local").unwrap();
        let first = QueryResult {
            columns: vec![ColumnInfo::new("x", "BIGINT")],
            rows: vec![Row { values: vec![Value::Int(1)] }, Row { values: vec![Value::Int(2)] }],
            execution_time_ms: 0.0,
        };
        backend.install_temp_table("c", &first).await.unwrap();

        let second = QueryResult {
            columns: vec![ColumnInfo::new("y", "VARCHAR")],
            rows: vec![Row { values: vec![Value::from("only")] }],
            execution_time_ms: 0.0,
        };
        backend.install_temp_table("c", &second).await.unwrap();

        let handle = backend.resolve("c", &Namespace::default()).await.unwrap();
        assert_eq!(handle.schema().names().collect::<Vec<_>>(), vec!["y"]);
        let result = backend.query("SELECT * FROM c").await.unwrap();
        assert_eq!(result.row_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_install_keeps_previous_table() {
        let backend = DuckDbBackend::in_memory("local").unwrap();
        let good = QueryResult {
            columns: vec![ColumnInfo::new("x", "BIGINT")],
            rows: vec![Row { values: vec![Value::Int(7)] }],
            execution_time_ms: 0.0,
        };
        backend.install_temp_table("c", &good).await.unwrap();

        let ragged = QueryResult {
            columns: vec![ColumnInfo::new("x", "BIGINT"), ColumnInfo::new("y", "BIGINT")],
            rows: vec![Row { values: vec![Value::Int(1)] }],
            execution_time_ms: 0.0,
        };
        assert!(backend.install_temp_table("c", &ragged).await.is_err());

        let result = backend.query("SELECT * FROM c").await.unwrap();
        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.rows[0].values, vec![Value::Int(7)]);
    }

    #[tokio::test]
    async fn test_syntax_error_classified() {
        let backend = DuckDbBackend::in_memory("a").unwrap();
        let err = backend.query("SELEC 1").await.unwrap_err();
        assert!(matches!(err, EngineError::SyntaxError { .. }));
    }

    #[test]
    fn test_map_type_to_duckdb() {
        assert_eq!(map_type_to_duckdb("INTEGER"), "BIGINT");
        assert_eq!(map_type_to_duckdb("decimal(10,2)"), "DECIMAL(10,2)");
        assert_eq!(map_type_to_duckdb("NUMERIC(12, 4)"), "DECIMAL(12,4)");
        assert_eq!(map_type_to_duckdb("decimal(99,2)"), "DOUBLE");
        assert_eq!(map_type_to_duckdb("HUGEINT"), "HUGEINT");
        assert_eq!(map_type_to_duckdb("TEXT"), "VARCHAR");
        assert_eq!(map_type_to_duckdb("BLOB"), "BLOB");
        assert_eq!(map_type_to_duckdb("TIMESTAMP"), "TIMESTAMP");
        assert_eq!(map_type_to_duckdb("INTEGER[]"), "VARCHAR");
    }

    #[test]
    fn test_infer_column_type_defaults_to_varchar() {
        let rows = vec![
            Row { values: vec![Value::Null, Value::Int(1)] },
            Row { values: vec![Value::Null, Value::Null] },
        ];
        assert_eq!(infer_column_type(&rows, 0), "VARCHAR");
        assert_eq!(infer_column_type(&rows, 1), "BIGINT");
    }

    #[test]
    fn test_duckdb_type_name() {
        assert_eq!(duckdb_type_name(&DataType::Float64).as_deref(), Some("DOUBLE"));
        assert_eq!(
            duckdb_type_name(&DataType::Decimal128(18, 3)).as_deref(),
            Some("DECIMAL(18,3)")
        );
        assert_eq!(duckdb_type_name(&DataType::Null), None);
    }
}
