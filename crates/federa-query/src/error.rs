// SPDX-License-Identifier: Apache-2.0

use federa_core::EngineError;
use thiserror::Error;

/// Errors raised while validating or rendering an expression tree
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("unknown column '{column}'")]
    UnknownColumn { column: String },

    #[error("projection must name at least one column")]
    EmptyProjection,

    #[error("aggregate must group by or compute at least one column")]
    EmptyAggregate,

    #[error("join requires at least one key pair")]
    EmptyJoinKeys,

    #[error("{func} requires a column argument")]
    MissingMeasureColumn { func: String },
}

impl ExprError {
    pub(crate) fn unknown_column(column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            column: column.into(),
        }
    }
}

impl From<ExprError> for EngineError {
    fn from(err: ExprError) -> Self {
        EngineError::invalid_expression(err.to_string())
    }
}
