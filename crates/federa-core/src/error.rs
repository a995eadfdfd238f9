// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the federation layer
//!
//! Driver-specific failures (DuckDB, SQLite) are mapped into these variants at
//! the driver boundary so the router can reason about them uniformly: an
//! `ObjectNotFound` means "try the next candidate", everything else surfaces.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all federation operations
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
pub enum EngineError {
    /// No candidate resolved the name while at least one connection was registered.
    #[error("Table not found: {name}")]
    TableNotFound { name: String },

    /// A single backend does not know the requested object.
    #[error("Object '{name}' not found in backend '{backend}'")]
    ObjectNotFound { name: String, backend: String },

    #[error("Connection already registered: {name}")]
    DuplicateConnection { name: String },

    #[error("Unknown connection: {name}")]
    UnknownConnection { name: String },

    #[error("Operation not supported by the federation layer: {operation}")]
    UnsupportedOperation { operation: String },

    #[error("Failed to materialize '{name}': {reason}")]
    MaterializationFailure { name: String, reason: String },

    #[error("Expression draws from several owners: {}", owners.join(", "))]
    AmbiguousProvenance { owners: Vec<String> },

    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Query syntax error: {message}")]
    SyntaxError { message: String },

    #[error("Query execution error: {message}")]
    ExecutionError { message: String },

    #[error("Invalid expression: {message}")]
    InvalidExpression { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Self::TableNotFound { name: name.into() }
    }

    pub fn object_not_found(name: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::ObjectNotFound {
            name: name.into(),
            backend: backend.into(),
        }
    }

    pub fn duplicate_connection(name: impl Into<String>) -> Self {
        Self::DuplicateConnection { name: name.into() }
    }

    pub fn unknown_connection(name: impl Into<String>) -> Self {
        Self::UnknownConnection { name: name.into() }
    }

    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            operation: operation.into(),
        }
    }

    pub fn materialization(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MaterializationFailure {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn ambiguous_provenance(owners: Vec<String>) -> Self {
        Self::AmbiguousProvenance { owners }
    }

    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn syntax_error(msg: impl Into<String>) -> Self {
        Self::SyntaxError { message: msg.into() }
    }

    pub fn execution_error(msg: impl Into<String>) -> Self {
        Self::ExecutionError { message: msg.into() }
    }

    pub fn invalid_expression(msg: impl Into<String>) -> Self {
        Self::InvalidExpression { message: msg.into() }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError { message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }

    /// True when a backend merely lacks the object; the router keeps probing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }
}

/// Result type alias for federation operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_absence_counts_as_not_found() {
        assert!(EngineError::object_not_found("t", "a").is_not_found());
        assert!(!EngineError::table_not_found("t").is_not_found());
        assert!(!EngineError::connection_failed("refused").is_not_found());
    }

    #[test]
    fn ambiguous_provenance_lists_owners() {
        let err = EngineError::ambiguous_provenance(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Expression draws from several owners: a, b");
    }
}
