//! Record collections.

use crate::error::{CoreError, CoreResult};
use crate::record::{IdentityKey, Record, RecordSource};
use crate::schema::RecordType;
use indexmap::IndexMap;
use recsync_codec::Value;
use std::sync::Arc;

/// An ordered, identity-indexed set of records of one item type.
///
/// # Upsert Semantics
///
/// Adding a record whose identity is already present replaces the earlier
/// record in place; a new identity is appended. Iteration follows this
/// logical order.
///
/// # Partitions
///
/// A partitioned collection carries attribute values inherited from an
/// owning record (typically the parent's identity). Every record added is
/// stamped with them, overriding whatever the record held.
///
/// # Example
///
/// ```rust
/// use recsync_core::{Attribute, Record, RecordCollection, RecordType, ValueType};
///
/// let ty = RecordType::builder("t")
///     .identity(Attribute::new("id", ValueType::Integer))
///     .attribute(Attribute::new("name", ValueType::Text))
///     .build()
///     .unwrap();
///
/// let mut items = RecordCollection::new(&ty);
/// items.upsert(Record::from_pairs(&ty, &[("id", 1.into()), ("name", "a".into())]).unwrap()).unwrap();
/// items.upsert(Record::from_pairs(&ty, &[("id", 2.into()), ("name", "b".into())]).unwrap()).unwrap();
/// items.upsert(Record::from_pairs(&ty, &[("id", 1.into()), ("name", "c".into())]).unwrap()).unwrap();
///
/// let names: Vec<_> = items.iter().map(|r| r.get("name").cloned().unwrap()).collect();
/// assert_eq!(names, vec!["c".into(), "b".into()]);
/// ```
#[derive(Debug, Clone)]
pub struct RecordCollection {
    item_type: Arc<RecordType>,
    records: IndexMap<IdentityKey, Record>,
    partition: Vec<(String, Value)>,
}

impl RecordCollection {
    /// Creates an empty collection.
    pub fn new(item_type: &Arc<RecordType>) -> Self {
        Self {
            item_type: Arc::clone(item_type),
            records: IndexMap::new(),
            partition: Vec::new(),
        }
    }

    /// Creates an empty collection bound to partition values.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAttribute` if a partition name is not an attribute
    /// of the item type, or `TypeMismatch` if a value does not fit.
    pub fn partitioned(
        item_type: &Arc<RecordType>,
        partition: Vec<(String, Value)>,
    ) -> CoreResult<Self> {
        let mut checked = Vec::with_capacity(partition.len());
        for (name, value) in partition {
            let attr = item_type.require(&name)?;
            let value = attr.value_type().coerce(&name, value)?;
            checked.push((name, value));
        }
        Ok(Self {
            item_type: Arc::clone(item_type),
            records: IndexMap::new(),
            partition: checked,
        })
    }

    /// Creates an empty collection partitioned by an owner record.
    ///
    /// `links` pairs each item attribute with the owner attribute it copies,
    /// e.g. `[("parent_id", "id")]`. Values are shared with the owner, so an
    /// owner surrogate allocated later is seen by the items as well.
    pub fn owned_by(
        item_type: &Arc<RecordType>,
        owner: &Record,
        links: &[(&str, &str)],
    ) -> CoreResult<Self> {
        let mut partition = Vec::with_capacity(links.len());
        for &(item_attr, owner_attr) in links {
            let value = owner.get(owner_attr).cloned().ok_or_else(|| {
                CoreError::unknown_attribute(owner.record_type().name(), owner_attr)
            })?;
            partition.push((item_attr.to_string(), value));
        }
        Self::partitioned(item_type, partition)
    }

    /// The item type.
    pub fn item_type(&self) -> &Arc<RecordType> {
        &self.item_type
    }

    /// The partition values stamped onto every item.
    pub fn partition(&self) -> &[(String, Value)] {
        &self.partition
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the collection is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Inserts or replaces a record by identity.
    ///
    /// Returns the record previously stored under the same identity.
    ///
    /// # Errors
    ///
    /// Returns `IncompatibleTypes` if the record is not of the item type.
    pub fn upsert(&mut self, record: Record) -> CoreResult<Option<Record>> {
        if !Arc::ptr_eq(record.record_type(), &self.item_type) {
            return Err(CoreError::incompatible(
                self.item_type.name(),
                record.record_type().name(),
            ));
        }
        let (_, previous) = self.insert_stamped(record)?;
        Ok(previous)
    }

    /// Builds a record of the item type from `source` and upserts it.
    pub fn add(&mut self, source: RecordSource<'_>) -> CoreResult<&Record> {
        let record = Record::with_overrides(&self.item_type, source, &self.partition)?;
        let (position, _) = self.insert_stamped(record)?;
        Ok(&self.records[position])
    }

    fn insert_stamped(&mut self, mut record: Record) -> CoreResult<(usize, Option<Record>)> {
        for (name, value) in &self.partition {
            record.stamp(name, value.clone())?;
        }
        Ok(self.records.insert_full(record.identity(), record))
    }

    /// Upserts every record from an iterator.
    pub fn extend<I: IntoIterator<Item = Record>>(&mut self, records: I) -> CoreResult<()> {
        for record in records {
            self.upsert(record)?;
        }
        Ok(())
    }

    /// Looks up a record by identity.
    pub fn get(&self, identity: &IdentityKey) -> Option<&Record> {
        self.records.get(identity)
    }

    /// Looks up a record by identity values.
    pub fn get_by<I, V>(&self, identity: I) -> Option<&Record>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.get(&identity.into_iter().collect())
    }

    /// Mutable access to a record by identity.
    ///
    /// Only value attributes can change, so the identity index stays valid.
    /// For types without identity attributes, call [`Self::reindex`] after
    /// mutating.
    pub fn get_mut(&mut self, identity: &IdentityKey) -> Option<&mut Record> {
        self.records.get_mut(identity)
    }

    /// Returns the record at `position` in iteration order.
    pub fn get_index(&self, position: usize) -> Option<&Record> {
        self.records.get_index(position).map(|(_, r)| r)
    }

    /// Whether a record with `identity` is present.
    pub fn contains(&self, identity: &IdentityKey) -> bool {
        self.records.contains_key(identity)
    }

    /// Removes a record by identity, preserving the order of the rest.
    ///
    /// # Errors
    ///
    /// Returns `RecordNotFound` if no record has this identity.
    pub fn remove(&mut self, identity: &IdentityKey) -> CoreResult<Record> {
        self.records
            .shift_remove(identity)
            .ok_or_else(|| CoreError::RecordNotFound {
                record_type: self.item_type.name().to_string(),
                identity: identity.to_string(),
            })
    }

    /// Removes the record at `position`.
    ///
    /// # Errors
    ///
    /// Returns `PositionOutOfBounds` if `position >= len()`.
    pub fn remove_at(&mut self, position: usize) -> CoreResult<Record> {
        self.records
            .shift_remove_index(position)
            .map(|(_, r)| r)
            .ok_or(CoreError::PositionOutOfBounds {
                position,
                len: self.records.len(),
            })
    }

    /// Identity keys in iteration order.
    pub fn keys(&self) -> impl Iterator<Item = &IdentityKey> {
        self.records.keys()
    }

    /// Records in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Recomputes every identity key.
    ///
    /// Needed after sequence allocation: an unallocated cell is indexed by
    /// cell, an allocated one by its integer.
    pub fn reindex(&mut self) {
        let records = std::mem::take(&mut self.records);
        self.records = records
            .into_values()
            .map(|r| (r.identity(), r))
            .collect();
    }
}

impl<'a> IntoIterator for &'a RecordCollection {
    type Item = &'a Record;
    type IntoIter = indexmap::map::Values<'a, IdentityKey, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}
