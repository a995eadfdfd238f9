// SPDX-License-Identifier: Apache-2.0

// Backend drivers module

pub mod duckdb;
pub mod sqlite;

pub use self::duckdb::DuckDbBackend;
pub use self::sqlite::SqliteBackend;
