//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while executing statements against a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A parameter could not be bound (e.g. an unallocated sequence value).
    #[error("parameter binding failed: {0}")]
    Binding(#[from] recsync_codec::CodecError),

    /// A parameter row does not match the statement's placeholder count.
    #[error("statement expects {expected} parameters, got {actual}")]
    ParameterCount {
        /// Number of placeholders in the statement.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// The statement names a column the table does not have.
    #[error("unknown column '{column}' in table '{table}'")]
    UnknownColumn {
        /// Table the statement targets.
        table: String,
        /// The missing column.
        column: String,
    },

    /// The named sequence has not been defined.
    #[error("unknown sequence: {sequence}")]
    UnknownSequence {
        /// Name of the sequence.
        sequence: String,
    },

    /// The statement kind is not valid for the call it was passed to.
    #[error("invalid statement: {message}")]
    InvalidStatement {
        /// Description of the problem.
        message: String,
    },

    /// The backend rejected the statement.
    #[error("statement failed: {message}")]
    Failed {
        /// Description of the failure.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid statement error.
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement {
            message: message.into(),
        }
    }

    /// Creates a statement failed error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}
