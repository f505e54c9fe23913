//! Record type definitions.
//!
//! A [`RecordType`] is the immutable descriptor table for one kind of
//! record: an ordered map of identity attributes followed by an ordered map
//! of value attributes. Types are registered once, at start-up, through
//! [`RecordTypeBuilder`] and shared behind an `Arc`.

use crate::attribute::{Attribute, SequenceSpec, ValueType};
use crate::error::{CoreError, CoreResult};
use indexmap::IndexMap;
use std::sync::Arc;

/// Immutable descriptor table for one record type.
///
/// Record values are stored positionally: identity attributes occupy
/// positions `0..identity_len()`, value attributes follow.
#[derive(Debug)]
pub struct RecordType {
    name: String,
    table: String,
    identity: IndexMap<String, Attribute>,
    values: IndexMap<String, Attribute>,
    origin: Option<Arc<RecordType>>,
}

impl RecordType {
    /// Starts defining a record type persisted to a table of the same name.
    pub fn builder(name: impl Into<String>) -> RecordTypeBuilder {
        let name = name.into();
        RecordTypeBuilder {
            table: name.clone(),
            name,
            attributes: Vec::new(),
        }
    }

    pub(crate) fn from_parts(
        name: String,
        table: String,
        attributes: Vec<Attribute>,
        origin: Option<Arc<RecordType>>,
    ) -> CoreResult<Arc<Self>> {
        let mut identity = IndexMap::new();
        let mut values = IndexMap::new();

        for attr in attributes {
            let key = attr.name().to_string();
            if identity.contains_key(&key) || values.contains_key(&key) {
                return Err(CoreError::DuplicateAttribute {
                    record_type: name,
                    attribute: key,
                });
            }
            if attr.is_identity() {
                identity.insert(key, attr);
            } else {
                values.insert(key, attr);
            }
        }

        Ok(Arc::new(Self {
            name,
            table,
            identity,
            values,
            origin,
        }))
    }

    /// Record type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table the records persist to.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The origin type, for projections.
    pub fn origin(&self) -> Option<&Arc<RecordType>> {
        self.origin.as_ref()
    }

    /// Whether this type is a projection of another.
    pub fn is_projection(&self) -> bool {
        self.origin.is_some()
    }

    /// Identity attributes in declaration order.
    pub fn identity_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.identity.values()
    }

    /// Value attributes in declaration order.
    pub fn value_attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.values.values()
    }

    /// All attributes, identity first.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.identity.values().chain(self.values.values())
    }

    /// Identity attribute names in order.
    pub fn identity_names(&self) -> Vec<&str> {
        self.identity.keys().map(String::as_str).collect()
    }

    /// Value attribute names in order.
    pub fn value_names(&self) -> Vec<&str> {
        self.values.keys().map(String::as_str).collect()
    }

    /// Number of identity attributes.
    pub fn identity_len(&self) -> usize {
        self.identity.len()
    }

    /// Total number of attributes.
    pub fn len(&self) -> usize {
        self.identity.len() + self.values.len()
    }

    /// Whether the type has no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether records of this type have a non-empty identity.
    pub fn has_identity(&self) -> bool {
        !self.identity.is_empty()
    }

    /// Looks up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.identity.get(name).or_else(|| self.values.get(name))
    }

    /// Positional index of an attribute in record storage.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.identity
            .get_index_of(name)
            .or_else(|| self.values.get_index_of(name).map(|i| i + self.identity.len()))
    }

    /// Attribute stored at `position`.
    pub fn attribute_at(&self, position: usize) -> Option<&Attribute> {
        if position < self.identity.len() {
            self.identity.get_index(position).map(|(_, a)| a)
        } else {
            self.values
                .get_index(position - self.identity.len())
                .map(|(_, a)| a)
        }
    }

    /// Like [`Self::attribute`] but fails with `UnknownAttribute`.
    pub fn require(&self, name: &str) -> CoreResult<&Attribute> {
        self.attribute(name)
            .ok_or_else(|| CoreError::unknown_attribute(&self.name, name))
    }

    /// Sequences used by this type's attributes, without duplicates.
    pub fn sequences(&self) -> Vec<&SequenceSpec> {
        let mut specs: Vec<&SequenceSpec> = Vec::new();
        for spec in self.attributes().filter_map(|a| a.value_type().sequence()) {
            if !specs.iter().any(|s| s.name == spec.name) {
                specs.push(spec);
            }
        }
        specs
    }

    /// Whether `other` keys its records by the same identity attributes.
    ///
    /// Diffs are only defined between diff-compatible types.
    pub fn diff_compatible(&self, other: &RecordType) -> bool {
        self.identity.keys().eq(other.identity.keys())
    }
}

/// Builder for [`RecordType`].
///
/// ```rust
/// use recsync_core::{Attribute, RecordType, ValueType};
///
/// let t_a = RecordType::builder("t_a")
///     .identity(Attribute::new("a", ValueType::Integer))
///     .attribute(Attribute::new("b", ValueType::Integer))
///     .build()
///     .unwrap();
/// assert_eq!(t_a.identity_names(), vec!["a"]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: String,
    table: String,
    attributes: Vec<Attribute>,
}

impl RecordTypeBuilder {
    /// Sets the table name (defaults to the type name).
    #[must_use]
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Adds an identity attribute.
    #[must_use]
    pub fn identity(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute.as_identity(true));
        self
    }

    /// Adds a value attribute.
    #[must_use]
    pub fn attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute.as_identity(false));
        self
    }

    /// Shorthand for an identity attribute drawn from a sequence.
    #[must_use]
    pub fn sequence_identity(self, name: impl Into<String>, spec: SequenceSpec) -> Self {
        self.identity(Attribute::new(name, ValueType::Sequence(spec)))
    }

    /// Finishes the definition.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateAttribute` if two attributes share a name, or
    /// `TypeMismatch` if a default does not fit its attribute.
    pub fn build(self) -> CoreResult<Arc<RecordType>> {
        for attr in &self.attributes {
            if attr.value_type().sequence().is_none() {
                attr.value_type().coerce(attr.name(), attr.default_for_new())?;
            }
        }
        RecordType::from_parts(self.name, self.table, self.attributes, None)
    }
}
