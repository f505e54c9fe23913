//! Attribute descriptors.

use crate::error::{CoreError, CoreResult};
use recsync_codec::{SequenceValue, Value};
use std::fmt;

/// Store sequence backing a surrogate-key attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceSpec {
    /// Name of the store sequence.
    pub name: String,
    /// First value the sequence hands out.
    pub start: i64,
    /// Increment between consecutive values.
    pub step: i64,
}

impl SequenceSpec {
    /// Creates a sequence spec.
    pub fn new(name: impl Into<String>, start: i64, step: i64) -> Self {
        Self {
            name: name.into(),
            start,
            step,
        }
    }
}

/// The declared type of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// Any value is accepted unchanged.
    Any,
    /// Signed integer. Sequence cells are accepted so that foreign keys can
    /// share a parent's not-yet-allocated surrogate.
    Integer,
    /// UTF-8 text.
    Text,
    /// Boolean.
    Bool,
    /// Byte string.
    Bytes,
    /// Surrogate key drawn from a store sequence.
    Sequence(SequenceSpec),
}

impl ValueType {
    /// Converts `value` into this type, or fails with `TypeMismatch`.
    ///
    /// - `Null` is accepted by every type; for sequences it becomes a
    ///   fresh unallocated cell
    /// - an integer assigned to a sequence becomes an allocated cell
    pub fn coerce(&self, attribute: &str, value: Value) -> CoreResult<Value> {
        let ok = match (self, &value) {
            (ValueType::Sequence(spec), Value::Null) => {
                return Ok(Value::Sequence(SequenceValue::unallocated(spec.name.as_str())));
            }
            (ValueType::Sequence(spec), Value::Integer(n)) => {
                return Ok(Value::Sequence(SequenceValue::allocated(
                    spec.name.as_str(),
                    *n,
                )));
            }
            (ValueType::Any, _) | (_, Value::Null) => true,
            (ValueType::Integer, Value::Integer(_) | Value::Sequence(_)) => true,
            (ValueType::Text, Value::Text(_)) => true,
            (ValueType::Bool, Value::Bool(_)) => true,
            (ValueType::Bytes, Value::Bytes(_)) => true,
            (ValueType::Sequence(_), Value::Sequence(_)) => true,
            _ => false,
        };

        if ok {
            Ok(value)
        } else {
            Err(CoreError::TypeMismatch {
                attribute: attribute.to_string(),
                expected: self.to_string(),
                found: value.type_name().to_string(),
            })
        }
    }

    /// Returns the sequence spec for sequence types.
    pub fn sequence(&self) -> Option<&SequenceSpec> {
        match self {
            ValueType::Sequence(spec) => Some(spec),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Any => f.write_str("any"),
            ValueType::Integer => f.write_str("integer"),
            ValueType::Text => f.write_str("text"),
            ValueType::Bool => f.write_str("bool"),
            ValueType::Bytes => f.write_str("bytes"),
            ValueType::Sequence(spec) => write!(f, "sequence({})", spec.name),
        }
    }
}

/// Describes one typed attribute of a record type.
///
/// Descriptors are immutable once their record type is built. The
/// `column` is the persisted column name; a projection that renames an
/// attribute keeps the origin's column and remembers the origin attribute
/// name as `source`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    name: String,
    value_type: ValueType,
    default: Option<Value>,
    identity: bool,
    doc: Option<String>,
    column: String,
    source: String,
    transient: bool,
}

impl Attribute {
    /// Creates a value attribute whose column and source equal its name.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            source: name.clone(),
            name,
            value_type,
            default: None,
            identity: false,
            doc: None,
            transient: false,
        }
    }

    /// Sets the default used when a source supplies no value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the documentation string.
    #[must_use]
    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    /// Sets the persisted column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub(crate) fn as_identity(mut self, identity: bool) -> Self {
        self.identity = identity;
        self
    }

    pub(crate) fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub(crate) fn as_transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared value type.
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Whether the attribute is part of the identity key.
    pub fn is_identity(&self) -> bool {
        self.identity
    }

    /// Documentation string, if any.
    pub fn documentation(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Persisted column name.
    pub fn column_name(&self) -> &str {
        &self.column
    }

    /// Name of the attribute this one was derived from (its own name
    /// unless it came from a renaming projection).
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Transient attributes are compared by diff but never persisted.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Value used when a source does not supply one.
    ///
    /// Sequence attributes without a default get a fresh unallocated cell
    /// per call, so records never share a surrogate by accident.
    pub fn default_for_new(&self) -> Value {
        match (&self.default, &self.value_type) {
            (Some(v), _) => v.clone(),
            (None, ValueType::Sequence(spec)) => {
                Value::Sequence(SequenceValue::unallocated(spec.name.as_str()))
            }
            (None, _) => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_integer_into_sequence() {
        let ty = ValueType::Sequence(SequenceSpec::new("t_seq", 10_000, 1));
        let value = ty.coerce("id", Value::Integer(5)).unwrap();
        let seq = value.as_sequence().unwrap();
        assert_eq!(seq.sequence(), "t_seq");
        assert_eq!(seq.get(), Some(5));
    }

    #[test]
    fn coerce_null_into_sequence_is_unallocated() {
        let ty = ValueType::Sequence(SequenceSpec::new("t_seq", 1, 1));
        let value = ty.coerce("id", Value::Null).unwrap();
        assert!(value.is_unallocated());
    }

    #[test]
    fn coerce_rejects_mismatch() {
        let err = ValueType::Integer
            .coerce("a", Value::Text("x".into()))
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { ref attribute, .. } if attribute == "a"));
    }

    #[test]
    fn null_and_any_pass_through() {
        assert_eq!(ValueType::Text.coerce("a", Value::Null).unwrap(), Value::Null);
        assert_eq!(
            ValueType::Any.coerce("a", Value::Bool(true)).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn sequence_defaults_are_distinct() {
        let attr = Attribute::new("id", ValueType::Sequence(SequenceSpec::new("s", 1, 1)));
        let a = attr.default_for_new();
        let b = attr.default_for_new();
        assert!(a.is_unallocated());
        assert_ne!(a, b);
    }

    #[test]
    fn builder_fields() {
        let attr = Attribute::new("f", ValueType::Integer)
            .default_value(0i64)
            .doc("a counter")
            .column("f_col");
        assert_eq!(attr.name(), "f");
        assert_eq!(attr.column_name(), "f_col");
        assert_eq!(attr.source(), "f");
        assert_eq!(attr.documentation(), Some("a counter"));
        assert_eq!(attr.default_for_new(), Value::Integer(0));
        assert!(!attr.is_identity());
        assert!(!attr.is_transient());
    }
}
