//! Dynamic attribute value type.

use crate::error::{CodecError, CodecResult};
use crate::sequence::SequenceValue;
use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::ser::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A dynamic attribute value.
///
/// Records hold one `Value` per attribute. Floats are intentionally not
/// supported so that equality and hashing stay total.
#[derive(Debug, Clone)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (supports full i64 range).
    Integer(i64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// Surrogate-key cell, possibly still unallocated.
    Sequence(SequenceValue),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get this value as an integer.
    ///
    /// Allocated sequence values read as their integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            Value::Sequence(seq) => seq.get(),
            _ => None,
        }
    }

    /// Get this value as a string, if it is a text string.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is a byte string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the sequence cell, if this is a sequence value.
    pub fn as_sequence(&self) -> Option<&SequenceValue> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Returns true for a sequence value that has no integer yet.
    pub fn is_unallocated(&self) -> bool {
        matches!(self, Value::Sequence(seq) if !seq.is_allocated())
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Sequence(_) => "sequence",
        }
    }

    /// Returns a plain value suitable for handing to a store.
    ///
    /// Allocated sequence values become integers.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Unallocated`] for an unallocated sequence value.
    pub fn materialize(&self) -> CodecResult<Value> {
        match self {
            Value::Sequence(seq) => seq
                .get()
                .map(Value::Integer)
                .ok_or_else(|| CodecError::unallocated(seq.sequence())),
            other => Ok(other.clone()),
        }
    }

    /// Total ordering used when sorting rows.
    ///
    /// Variants rank `Null < Bool < Integer < Text < Bytes`; allocated
    /// sequence values sort as integers and unallocated ones last.
    pub fn cmp_sort(&self, other: &Self) -> Ordering {
        match self.rank().cmp(&other.rank()) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Sequence(a), Value::Sequence(b)) if !a.is_allocated() => {
                a.cell_addr().cmp(&b.cell_addr())
            }
            _ => match (self.as_integer(), other.as_integer()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            },
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Integer(_) => 2,
            Value::Sequence(seq) if seq.is_allocated() => 2,
            Value::Text(_) => 3,
            Value::Bytes(_) => 4,
            Value::Sequence(_) => 5,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Sequence(a), Value::Sequence(b)) => a == b,
            (Value::Sequence(seq), Value::Integer(n)) | (Value::Integer(n), Value::Sequence(seq)) => {
                seq.get() == Some(*n)
            }
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Allocated sequences must hash like the integer they equal.
        match self {
            Value::Null => 0u8.hash(state),
            Value::Bool(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Integer(n) => {
                2u8.hash(state);
                n.hash(state);
            }
            Value::Text(s) => {
                3u8.hash(state);
                s.hash(state);
            }
            Value::Bytes(b) => {
                4u8.hash(state);
                b.hash(state);
            }
            Value::Sequence(seq) => match seq.get() {
                Some(n) => {
                    2u8.hash(state);
                    n.hash(state);
                }
                None => {
                    5u8.hash(state);
                    seq.cell_addr().hash(state);
                }
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Bytes(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
            Value::Sequence(seq) => match seq.get() {
                Some(n) => write!(f, "{n}"),
                None => write!(f, "nextval('{}')", seq.sequence()),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Integer(n) => serializer.serialize_i64(*n),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_bytes(b),
            Value::Sequence(seq) => match seq.get() {
                Some(n) => serializer.serialize_i64(n),
                None => serializer.serialize_unit(),
            },
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("null, a boolean, an integer, a string or a byte string")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
        Value::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v)
            .map(Value::Integer)
            .map_err(|_| E::custom(CodecError::IntegerOverflow))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::Text(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::Text(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Value, E> {
        Ok(Value::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Value, E> {
        Ok(Value::Bytes(v))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<SequenceValue> for Value {
    fn from(seq: SequenceValue) -> Self {
        Value::Sequence(seq)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(value: &Value) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn allocated_sequence_equals_integer() {
        let seq = Value::Sequence(SequenceValue::allocated("s", 10_000));
        assert_eq!(seq, Value::Integer(10_000));
        assert_eq!(Value::Integer(10_000), seq);
        assert_eq!(hash_of(&seq), hash_of(&Value::Integer(10_000)));
    }

    #[test]
    fn unallocated_sequence_equals_nothing_else() {
        let seq = SequenceValue::unallocated("s");
        let value = Value::Sequence(seq.clone());
        assert_eq!(value, Value::Sequence(seq));
        assert_ne!(value, Value::Null);
        assert_ne!(value, Value::Integer(0));
        assert_ne!(value, Value::Sequence(SequenceValue::unallocated("s")));
    }

    #[test]
    fn materialize_requires_allocation() {
        let seq = SequenceValue::unallocated("s");
        let value = Value::Sequence(seq.clone());
        assert!(matches!(
            value.materialize(),
            Err(CodecError::Unallocated { .. })
        ));

        seq.allocate(3).unwrap();
        assert!(matches!(value.materialize(), Ok(Value::Integer(3))));
        assert_eq!(
            Value::Text("x".into()).materialize().unwrap(),
            Value::Text("x".into())
        );
    }

    #[test]
    fn sort_order_ranks_variants() {
        let mut values = vec![
            Value::Text("b".into()),
            Value::Integer(2),
            Value::Null,
            Value::Sequence(SequenceValue::allocated("s", 1)),
            Value::Bool(true),
            Value::Text("a".into()),
        ];
        values.sort_by(Value::cmp_sort);

        assert_eq!(values[0], Value::Null);
        assert_eq!(values[1], Value::Bool(true));
        assert_eq!(values[2], Value::Integer(1));
        assert_eq!(values[3], Value::Integer(2));
        assert_eq!(values[4], Value::Text("a".into()));
        assert_eq!(values[5], Value::Text("b".into()));
    }

    #[test]
    fn display_renders_literals() {
        assert_eq!(Value::Null.to_string(), "NULL");
        assert_eq!(Value::Text("it's".into()).to_string(), "'it''s'");
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_string(), "x'ab01'");
        assert_eq!(
            Value::Sequence(SequenceValue::unallocated("t_seq")).to_string(),
            "nextval('t_seq')"
        );
    }

    #[test]
    fn json_conversion() {
        let parsed: Vec<Value> = serde_json::from_str(r#"[null, true, 42, "hi"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Integer(42),
                Value::Text("hi".into())
            ]
        );

        let seq = Value::Sequence(SequenceValue::allocated("s", 5));
        assert_eq!(serde_json::to_string(&seq).unwrap(), "5");
    }

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from(42i32), Value::Integer(42));
        assert_eq!(Value::from("hello"), Value::Text("hello".to_string()));
        assert_eq!(Value::from(vec![1u8, 2, 3]), Value::Bytes(vec![1, 2, 3]));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(7i64)), Value::Integer(7));
        assert_eq!(Value::from(()), Value::Null);
    }
}
