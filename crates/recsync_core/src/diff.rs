//! Attribute-level diff between two record collections.
//!
//! [`diff`] compares a *current* collection against a *past* baseline and
//! reports which records must be inserted, which value attributes changed on
//! records present in both, and which records must be deleted. It performs
//! no I/O and does not mutate its inputs.

use crate::collection::RecordCollection;
use crate::error::{CoreError, CoreResult};
use crate::record::{IdentityKey, Record};
use indexmap::IndexMap;
use recsync_codec::Value;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single attribute change: the new value and the value it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// Value in the current collection.
    pub new: Value,
    /// Value in the past collection.
    pub old: Value,
}

/// A record present only in the current collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertEntry {
    /// Identity values of the record.
    pub identity: IdentityKey,
    /// Value-attribute values, in the item type's declaration order.
    pub values: Vec<Value>,
}

/// A record present in both collections with at least one changed value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEntry {
    /// Identity values of the record.
    pub identity: IdentityKey,
    /// Changed attributes, in the item type's declaration order.
    pub changes: IndexMap<String, Change>,
}

impl ChangeEntry {
    /// The set of changed attribute names, used to group updates.
    pub fn signature(&self) -> Vec<&str> {
        self.changes.keys().map(String::as_str).collect()
    }
}

/// Result of comparing two collections.
///
/// Entry order follows iteration of the current collection for inserts and
/// changes, and of the past collection for deletes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Identity attribute names the keys are expressed in.
    pub identity_names: Vec<String>,
    /// Value attribute names the insert values are expressed in.
    pub value_names: Vec<String>,
    /// Records to insert.
    pub inserts: Vec<InsertEntry>,
    /// Records to update.
    pub changes: Vec<ChangeEntry>,
    /// Identities of records to delete.
    pub deletes: Vec<IdentityKey>,
}

impl Diff {
    /// Whether the diff contains no work.
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.changes.is_empty() && self.deletes.is_empty()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.inserts.len() + self.changes.len() + self.deletes.len()
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.inserts {
            write!(f, "+ {}", entry.identity)?;
            for (name, value) in self.value_names.iter().zip(&entry.values) {
                write!(f, " {name}={value}")?;
            }
            writeln!(f)?;
        }
        for entry in &self.changes {
            write!(f, "~ {}", entry.identity)?;
            for (name, change) in &entry.changes {
                write!(f, " {name}: {} -> {}", change.old, change.new)?;
            }
            writeln!(f)?;
        }
        for identity in &self.deletes {
            writeln!(f, "- {identity}")?;
        }
        Ok(())
    }
}

/// Compares `current` against `past`.
///
/// Only value attributes of the current item type that the past record
/// also exposes are compared; attributes known only to the past type are
/// never reported. Equality is the value's own equality, so an allocated
/// sequence equals its integer.
///
/// # Errors
///
/// Returns `IncompatibleTypes` if the two item types do not share the same
/// identity attribute names.
///
/// # Example
///
/// ```rust
/// use recsync_core::{diff, Attribute, Record, RecordCollection, RecordType, ValueType};
///
/// let ty = RecordType::builder("t")
///     .identity(Attribute::new("id", ValueType::Integer))
///     .attribute(Attribute::new("n", ValueType::Integer))
///     .build()
///     .unwrap();
///
/// let mut past = RecordCollection::new(&ty);
/// past.upsert(Record::from_pairs(&ty, &[("id", 1.into()), ("n", 1.into())]).unwrap()).unwrap();
/// let mut current = past.clone();
/// current.upsert(Record::from_pairs(&ty, &[("id", 1.into()), ("n", 2.into())]).unwrap()).unwrap();
///
/// let d = diff(&current, &past).unwrap();
/// assert_eq!(d.changes.len(), 1);
/// assert_eq!(d.changes[0].signature(), vec!["n"]);
/// ```
pub fn diff(current: &RecordCollection, past: &RecordCollection) -> CoreResult<Diff> {
    let current_type = current.item_type();
    let past_type = past.item_type();
    if !current_type.diff_compatible(past_type) {
        return Err(CoreError::incompatible(current_type.name(), past_type.name()));
    }

    let value_names: Vec<&str> = current_type.value_names();
    let mut result = Diff {
        identity_names: current_type
            .identity_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        value_names: value_names.iter().map(|s| s.to_string()).collect(),
        ..Diff::default()
    };

    // Keys are recomputed rather than taken from the collections' indexes: a
    // sequence cell shared with another collection may have been allocated
    // since the records were indexed.
    let past_index: HashMap<IdentityKey, &Record> =
        past.iter().map(|r| (r.identity(), r)).collect();
    let mut current_keys: HashSet<IdentityKey> = HashSet::with_capacity(current.len());

    for record in current {
        let identity = record.identity();
        current_keys.insert(identity.clone());
        let Some(previous) = past_index.get(&identity) else {
            result.inserts.push(InsertEntry {
                identity,
                values: record.value_values().to_vec(),
            });
            continue;
        };

        let mut changes = IndexMap::new();
        for (&name, new) in value_names.iter().zip(record.value_values()) {
            let Some(old) = previous.get(name) else {
                continue;
            };
            if new != old {
                changes.insert(
                    name.to_string(),
                    Change {
                        new: new.clone(),
                        old: old.clone(),
                    },
                );
            }
        }
        if !changes.is_empty() {
            result.changes.push(ChangeEntry { identity, changes });
        }
    }

    for record in past {
        let identity = record.identity();
        if !current_keys.contains(&identity) {
            result.deletes.push(identity);
        }
    }

    Ok(result)
}
