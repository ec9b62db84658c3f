//! Error types for momo data tables

use thiserror::Error;

use crate::types::ValueKind;

pub type Result<T> = std::result::Result<T, DataError>;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Data corruption: {0}")]
    Corruption(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("Type mismatch for column '{column}': expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("Row number {number} out of range (row count {count})")]
    RowOutOfRange { number: usize, count: usize },

    #[error("Row handle {0} no longer refers to a row")]
    StaleRow(crate::table::RowId),

    /// The row collides with `existing` on the key columns of `index`.
    #[error("Unique index violation on {index:?} (conflicting row {existing})")]
    UniqueIndexViolation {
        index: crate::index::UniqueHashIndex,
        existing: crate::table::RowId,
    },

    #[error("Index not found")]
    IndexNotFound,

    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    #[error("Cannot add index on mutable column '{0}'")]
    MutableColumnIndex(String),

    #[error("Column '{0}' is not mutable")]
    ImmutableColumn(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<bincode::Error> for DataError {
    fn from(err: bincode::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Serialization(err.to_string())
    }
}
