//! CBOR encoding for snapshot documents.
//!
//! Snapshots are plain serde structures written with `ciborium`. Values
//! serialize as their materialized form, so an allocated sequence value
//! is stored as its integer and an unallocated one as null.

use crate::error::{CodecError, CodecResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encode a serializable document to CBOR bytes.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn to_cbor<T: Serialize + ?Sized>(document: &T) -> CodecResult<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(document, &mut buffer)
        .map_err(|e| CodecError::encoding_failed(e.to_string()))?;
    Ok(buffer)
}

/// Decode a document from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid CBOR or do not match `T`.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn values_survive_cbor() {
        let row = vec![
            Value::Integer(-100),
            Value::Text("hello world".into()),
            Value::Bytes(vec![1, 2, 3]),
            Value::Bool(false),
            Value::Null,
        ];
        let bytes = to_cbor(&row).unwrap();
        let decoded: Vec<Value> = from_cbor(&bytes).unwrap();
        assert_eq!(decoded, row);
    }

    #[test]
    fn truncated_input_fails() {
        let bytes = to_cbor(&vec![Value::Text("abcdef".into())]).unwrap();
        let result: CodecResult<Vec<Value>> = from_cbor(&bytes[..bytes.len() - 2]);
        assert!(matches!(result, Err(CodecError::DecodingFailed { .. })));
    }
}
