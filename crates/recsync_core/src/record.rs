//! Identity-keyed records.

use crate::attribute::Attribute;
use crate::error::{CoreError, CoreResult};
use crate::schema::RecordType;
use recsync_codec::Value;
use recsync_store::Row;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// The tuple of identity values that keys a record.
///
/// Records of a type without identity attributes are keyed by all of
/// their values instead, matching their equality rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(Vec<Value>);

impl IdentityKey {
    /// Creates a key from values in identity-attribute order.
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    /// Returns the key values.
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Consumes the key, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    /// Number of values in the key.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the key is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Into<Value>> FromIterator<V> for IdentityKey {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str(")")
    }
}

/// Where a new record takes its attribute values from.
///
/// Each source is resolved by attribute name; attributes the source has
/// but the target type does not are ignored, which is what lets a record
/// be narrowed into a projection.
#[derive(Debug, Clone, Copy)]
pub enum RecordSource<'a> {
    /// Name/value pairs.
    Pairs(&'a [(&'a str, Value)]),
    /// Another record, of this type, its origin, or a sibling projection.
    Record(&'a Record),
    /// A store row, addressed by persisted column name.
    Row(&'a Row),
}

impl RecordSource<'_> {
    fn lookup(&self, attr: &Attribute) -> Option<Value> {
        match self {
            RecordSource::Pairs(pairs) => {
                let find = |name: &str| pairs.iter().find(|(k, _)| *k == name).map(|(_, v)| v);
                find(attr.name())
                    .or_else(|| find(attr.source()))
                    .cloned()
            }
            RecordSource::Record(record) => record
                .get(attr.name())
                .or_else(|| record.get(attr.source()))
                .or_else(|| {
                    // Both sides derived from the same origin attribute.
                    record
                        .record_type()
                        .attributes()
                        .find(|a| a.source() == attr.name() || a.source() == attr.source())
                        .and_then(|a| record.get(a.name()))
                })
                .cloned(),
            RecordSource::Row(row) => row.get(attr.column_name()).cloned(),
        }
    }
}

/// An instance of a [`RecordType`].
///
/// Identity attributes are fixed at construction; value attributes may be
/// reassigned with [`Record::set`].
///
/// # Equality
///
/// - Types with identity attributes: equal when identity keys are equal
/// - Types without: equal when every value attribute is pairwise equal
#[derive(Clone)]
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
}

impl Record {
    /// Builds a record of type `ty` from `source`.
    ///
    /// Absent attributes take their default. Values are coerced through
    /// each attribute's declared type.
    ///
    /// # Errors
    ///
    /// - `MissingIdentity` if an identity attribute resolves to null
    /// - `TypeMismatch` if a value does not fit its attribute
    pub fn new(ty: &Arc<RecordType>, source: RecordSource<'_>) -> CoreResult<Self> {
        Self::with_overrides(ty, source, &[])
    }

    /// Like [`Self::new`], but `overrides` win over the source. Partitioned
    /// collections pass their partition here so that items need not repeat it.
    pub(crate) fn with_overrides(
        ty: &Arc<RecordType>,
        source: RecordSource<'_>,
        overrides: &[(String, Value)],
    ) -> CoreResult<Self> {
        let mut values = Vec::with_capacity(ty.len());
        for attr in ty.attributes() {
            let raw = overrides
                .iter()
                .find(|(name, _)| name == attr.name())
                .map(|(_, v)| v.clone())
                .or_else(|| source.lookup(attr))
                .unwrap_or_else(|| attr.default_for_new());
            let value = attr.value_type().coerce(attr.name(), raw)?;
            if attr.is_identity() && value.is_null() {
                return Err(CoreError::missing_identity(ty.name(), attr.name()));
            }
            values.push(value);
        }
        Ok(Self {
            ty: Arc::clone(ty),
            values,
        })
    }

    /// Builds a record from name/value pairs.
    pub fn from_pairs(ty: &Arc<RecordType>, pairs: &[(&str, Value)]) -> CoreResult<Self> {
        Self::new(ty, RecordSource::Pairs(pairs))
    }

    /// Builds a record of `ty` from another record, copying known attributes.
    pub fn from_record(ty: &Arc<RecordType>, record: &Record) -> CoreResult<Self> {
        Self::new(ty, RecordSource::Record(record))
    }

    /// Builds a record from a store row.
    pub fn from_row(ty: &Arc<RecordType>, row: &Row) -> CoreResult<Self> {
        Self::new(ty, RecordSource::Row(row))
    }

    /// The record's type.
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// Reads an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.ty.position(name).map(|i| &self.values[i])
    }

    /// Assigns a value attribute.
    ///
    /// # Errors
    ///
    /// - `UnknownAttribute` if the type has no such attribute
    /// - `IdentityImmutable` for identity attributes
    /// - `TypeMismatch` if the value does not fit
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> CoreResult<()> {
        let attr = self.ty.require(name)?;
        if attr.is_identity() {
            return Err(CoreError::IdentityImmutable {
                record_type: self.ty.name().to_string(),
                attribute: name.to_string(),
            });
        }
        self.assign(name, value.into())
    }

    /// Overwrites any attribute, identity included. Used to stamp
    /// partition values before a record is indexed.
    pub(crate) fn stamp(&mut self, name: &str, value: Value) -> CoreResult<()> {
        self.assign(name, value)
    }

    fn assign(&mut self, name: &str, value: Value) -> CoreResult<()> {
        let position = self
            .ty
            .position(name)
            .ok_or_else(|| CoreError::unknown_attribute(self.ty.name(), name))?;
        let attr = self.ty.require(name)?;
        let value = attr.value_type().coerce(name, value)?;
        if attr.is_identity() && value.is_null() {
            return Err(CoreError::missing_identity(self.ty.name(), name));
        }
        self.values[position] = value;
        Ok(())
    }

    /// The record's identity key.
    pub fn identity(&self) -> IdentityKey {
        if self.ty.has_identity() {
            IdentityKey(self.identity_values().to_vec())
        } else {
            IdentityKey(self.values.clone())
        }
    }

    /// Identity attribute values in order.
    pub fn identity_values(&self) -> &[Value] {
        &self.values[..self.ty.identity_len()]
    }

    /// Value attribute values in order.
    pub fn value_values(&self) -> &[Value] {
        &self.values[self.ty.identity_len()..]
    }

    /// All values, identity first.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.ty.attributes().map(Attribute::name).zip(self.values.iter())
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        match (self.ty.has_identity(), other.ty.has_identity()) {
            (true, true) => self.identity_values() == other.identity_values(),
            (false, false) => self.values == other.values,
            _ => false,
        }
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if self.ty.has_identity() {
            self.identity_values().hash(state);
        } else {
            self.values.hash(state);
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.ty.name());
        for (name, value) in self.iter() {
            s.field(name, value);
        }
        s.finish()
    }
}
