//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while converting or encoding values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value to CBOR.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode CBOR bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Decoded data does not have the expected shape.
    #[error("invalid structure: {message}")]
    InvalidStructure {
        /// Description of the structural error.
        message: String,
    },

    /// Integer does not fit in an `i64`.
    #[error("integer overflow")]
    IntegerOverflow,

    /// A sequence value was read before it was allocated.
    #[error("sequence value from '{sequence}' is not allocated")]
    Unallocated {
        /// Name of the sequence the cell belongs to.
        sequence: String,
    },

    /// A sequence value was allocated twice.
    #[error("sequence value from '{sequence}' already holds {value}")]
    AlreadyAllocated {
        /// Name of the sequence the cell belongs to.
        sequence: String,
        /// The value the cell already holds.
        value: i64,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid structure error.
    pub fn invalid_structure(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
        }
    }

    /// Create an unallocated sequence error.
    pub fn unallocated(sequence: impl Into<String>) -> Self {
        Self::Unallocated {
            sequence: sequence.into(),
        }
    }
}
