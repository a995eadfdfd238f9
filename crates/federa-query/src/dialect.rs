// SPDX-License-Identifier: Apache-2.0

//! SQL dialects understood by the bundled backends.

use std::fmt::Write;

use federa_core::{Namespace, Value};

/// SQL dialect for different backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    DuckDb,
    Sqlite,
}

impl Dialect {
    pub fn from_driver_id(driver_id: &str) -> Option<Self> {
        match driver_id.to_lowercase().as_str() {
            "duckdb" => Some(Dialect::DuckDb),
            "sqlite" | "sqlite3" => Some(Dialect::Sqlite),
            _ => None,
        }
    }

    /// Quote an identifier according to the dialect
    pub fn quote_ident(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Format a possibly qualified table name
    pub fn qualified_table(&self, namespace: &Namespace, table_name: &str) -> String {
        match self {
            Dialect::DuckDb => {
                let mut parts = Vec::with_capacity(3);
                if let Some(database) = &namespace.database {
                    parts.push(self.quote_ident(database));
                }
                if let Some(schema) = &namespace.schema {
                    parts.push(self.quote_ident(schema));
                } else if namespace.database.is_some() {
                    parts.push(self.quote_ident("main"));
                }
                parts.push(self.quote_ident(table_name));
                parts.join(".")
            }
            // Single namespace per file
            Dialect::Sqlite => self.quote_ident(table_name),
        }
    }

    /// Format a value as a SQL literal
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match self {
                Dialect::DuckDb => if *b { "TRUE" } else { "FALSE" }.to_string(),
                Dialect::Sqlite => if *b { "1" } else { "0" }.to_string(),
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => {
                if f.is_finite() {
                    let text = f.to_string();
                    // keep the literal a float so integer division never kicks in
                    if text.contains(['.', 'e', 'E']) {
                        text
                    } else {
                        format!("{text}.0")
                    }
                } else {
                    match self {
                        Dialect::DuckDb if f.is_nan() => "'NaN'::DOUBLE".to_string(),
                        Dialect::DuckDb if *f > 0.0 => "'Infinity'::DOUBLE".to_string(),
                        Dialect::DuckDb => "'-Infinity'::DOUBLE".to_string(),
                        // SQLite has no NaN; infinities overflow to +/-Inf
                        Dialect::Sqlite if f.is_nan() => "NULL".to_string(),
                        Dialect::Sqlite if *f > 0.0 => "9e999".to_string(),
                        Dialect::Sqlite => "-9e999".to_string(),
                    }
                }
            }
            Value::Text(s) => self.escape_string(s),
            Value::Bytes(b) => self.format_bytes(b),
            Value::Array(items) => {
                let elements: Vec<String> = items.iter().map(|v| self.format_value(v)).collect();
                match self {
                    Dialect::DuckDb => format!("[{}]", elements.join(", ")),
                    // SQLite has no list type; store the rendered list as text
                    Dialect::Sqlite => self.escape_string(&format!("[{}]", elements.join(", "))),
                }
            }
        }
    }

    /// Escape a string for SQL
    fn escape_string(&self, s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }

    fn format_bytes(&self, bytes: &[u8]) -> String {
        match self {
            Dialect::DuckDb => {
                let mut out = String::with_capacity(bytes.len() * 4 + 10);
                out.push('\'');
                for b in bytes {
                    let _ = write!(out, "\\x{b:02X}");
                }
                out.push_str("'::BLOB");
                out
            }
            Dialect::Sqlite => {
                let mut out = String::with_capacity(bytes.len() * 2 + 3);
                out.push_str("X'");
                for b in bytes {
                    let _ = write!(out, "{b:02X}");
                }
                out.push('\'');
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(Dialect::DuckDb.quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn qualified_names() {
        let ns = Namespace::new(Some("warehouse"), None);
        assert_eq!(
            Dialect::DuckDb.qualified_table(&ns, "orders"),
            "\"warehouse\".\"main\".\"orders\""
        );
        assert_eq!(
            Dialect::DuckDb.qualified_table(&Namespace::with_schema("sales"), "orders"),
            "\"sales\".\"orders\""
        );
        assert_eq!(Dialect::Sqlite.qualified_table(&ns, "orders"), "\"orders\"");
    }

    #[test]
    fn literals_per_dialect() {
        assert_eq!(Dialect::DuckDb.format_value(&Value::Bool(true)), "TRUE");
        assert_eq!(Dialect::Sqlite.format_value(&Value::Bool(true)), "1");
        assert_eq!(Dialect::DuckDb.format_value(&Value::Float(100.0)), "100.0");
        assert_eq!(Dialect::DuckDb.format_value(&Value::Float(2.5)), "2.5");
        assert_eq!(Dialect::Sqlite.format_value(&Value::Text("it's".into())), "'it''s'");
        assert_eq!(Dialect::Sqlite.format_value(&Value::Bytes(vec![0xAB, 0x01])), "X'AB01'");
        assert_eq!(
            Dialect::DuckDb.format_value(&Value::Bytes(vec![0xAB])),
            "'\\xAB'::BLOB"
        );
    }

    #[test]
    fn dialect_from_driver_id() {
        assert_eq!(Dialect::from_driver_id("DuckDB"), Some(Dialect::DuckDb));
        assert_eq!(Dialect::from_driver_id("sqlite"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_driver_id("oracle"), None);
    }
}
