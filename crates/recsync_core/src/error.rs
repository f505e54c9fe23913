//! Error types for recsync core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in recsync core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Store handle error, passed through unmodified.
    #[error("store error: {0}")]
    Store(#[from] recsync_store::StoreError),

    /// Value or snapshot codec error.
    #[error("codec error: {0}")]
    Codec(#[from] recsync_codec::CodecError),

    /// A record was constructed without a value for an identity attribute.
    #[error("record type {record_type}: identity attribute '{attribute}' has no value")]
    MissingIdentity {
        /// The record type being constructed.
        record_type: String,
        /// The identity attribute left empty.
        attribute: String,
    },

    /// An identity attribute was written after construction.
    #[error("record type {record_type}: identity attribute '{attribute}' is write-once")]
    IdentityImmutable {
        /// The record type of the record.
        record_type: String,
        /// The identity attribute.
        attribute: String,
    },

    /// An attribute name is not defined on the record type.
    #[error("record type {record_type} has no attribute '{attribute}'")]
    UnknownAttribute {
        /// The record type searched.
        record_type: String,
        /// The unknown attribute name.
        attribute: String,
    },

    /// Two attributes of one record type share a name.
    #[error("record type {record_type} defines '{attribute}' more than once")]
    DuplicateAttribute {
        /// The record type being defined.
        record_type: String,
        /// The repeated attribute name.
        attribute: String,
    },

    /// A value does not fit the attribute's declared type.
    #[error("attribute '{attribute}' expects {expected}, got {found}")]
    TypeMismatch {
        /// The attribute being assigned.
        attribute: String,
        /// The declared value type.
        expected: String,
        /// The type of the value supplied.
        found: String,
    },

    /// A record or collection of the wrong record type was supplied.
    #[error("incompatible record types: expected {expected}, got {found}")]
    IncompatibleTypes {
        /// What the operation required.
        expected: String,
        /// What it was given.
        found: String,
    },

    /// No record with the given identity is in the collection.
    #[error("no record with identity {identity} in collection of {record_type}")]
    RecordNotFound {
        /// The collection's item type.
        record_type: String,
        /// The identity searched for.
        identity: String,
    },

    /// A positional access was past the end of the collection.
    #[error("position {position} out of bounds for collection of length {len}")]
    PositionOutOfBounds {
        /// The requested position.
        position: usize,
        /// The collection length.
        len: usize,
    },

    /// The store handed out fewer sequence values than requested.
    #[error("sequence '{sequence}' returned {returned} values, {requested} requested")]
    SequenceShortfall {
        /// The sequence name.
        sequence: String,
        /// Number of values requested.
        requested: usize,
        /// Number of values returned.
        returned: usize,
    },

    /// A projection definition is inconsistent.
    #[error("invalid projection {projection}: {message}")]
    InvalidProjection {
        /// Name of the projection.
        projection: String,
        /// Description of the problem.
        message: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },
}

impl CoreError {
    /// Creates an unknown attribute error.
    pub fn unknown_attribute(record_type: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::UnknownAttribute {
            record_type: record_type.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates a missing identity error.
    pub fn missing_identity(record_type: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::MissingIdentity {
            record_type: record_type.into(),
            attribute: attribute.into(),
        }
    }

    /// Creates an incompatible types error.
    pub fn incompatible(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::IncompatibleTypes {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates an invalid projection error.
    pub fn invalid_projection(projection: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidProjection {
            projection: projection.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for the not-found family of errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RecordNotFound { .. } | Self::PositionOutOfBounds { .. }
        )
    }
}
