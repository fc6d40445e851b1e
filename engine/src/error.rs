//! Error types for the table engine.

use crate::{FieldName, RowIndex};
use thiserror::Error;

/// All possible errors from the table engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Configuration errors
    #[error("row is missing unique identifier field '{field}'")]
    MissingRowIdentifier { field: FieldName },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown column: {0}")]
    UnknownColumn(FieldName),

    #[error("column is not editable: {0}")]
    ColumnNotEditable(FieldName),

    // Filter errors
    #[error("invalid condition for '{field}': {reason}")]
    InvalidCondition { field: FieldName, reason: String },

    // Pagination errors
    #[error("rows per page {requested} is not one of {allowed:?}")]
    InvalidRowsPerPage { requested: usize, allowed: Vec<usize> },

    // Selection errors
    #[error("row index {index} out of range (rows: {len})")]
    RowOutOfRange { index: RowIndex, len: usize },

    #[error("row {0} is not selectable")]
    RowNotSelectable(RowIndex),

    // Edit life cycle errors
    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("no save is in progress")]
    NoSaveInProgress,

    #[error("submission failed: {0}")]
    Submission(String),

    // State errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
