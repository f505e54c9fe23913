//! # recsync Codec
//!
//! Attribute values for recsync records.
//!
//! This crate provides:
//! - [`Value`], the dynamic value held by every record attribute
//! - [`SequenceValue`], a shared surrogate-key cell that starts
//!   unallocated and is filled in by the store's sequence
//! - CBOR encoding for snapshot documents
//!
//! ## Equality Rules
//!
//! - An allocated sequence value equals the integer it holds
//! - An unallocated sequence value equals only itself
//! - `Hash` agrees with equality, so values can key identity indexes
//!
//! ## Usage
//!
//! ```
//! use recsync_codec::{SequenceValue, Value};
//!
//! let seq = SequenceValue::unallocated("t_seq");
//! let value = Value::Sequence(seq.clone());
//! assert_ne!(value, Value::Integer(10_000));
//!
//! seq.allocate(10_000).unwrap();
//! assert_eq!(value, Value::Integer(10_000));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod sequence;
mod value;

pub use cbor::{from_cbor, to_cbor};
pub use error::{CodecError, CodecResult};
pub use sequence::SequenceValue;
pub use value::Value;
