//! Record type fixtures and store helpers.
//!
//! Provides the record types used across the test suites and a
//! [`TestStore`] whose sequences are defined from those types.

use recsync_core::{
    merge, Attribute, MergeOptions, Record, RecordCollection, RecordType, SequenceSpec, ValueType,
};
use recsync_store::MemoryStore;
use std::sync::Arc;

/// Name of the sequence behind [`sequence_type`].
pub const T_SEQ_SEQUENCE: &str = "t_seq_id";

/// `t_a`: identity `(a, b)`, integer values `c`, `d`, `e`, `f`.
pub fn t_a_type() -> Arc<RecordType> {
    RecordType::builder("t_a")
        .identity(Attribute::new("a", ValueType::Integer))
        .identity(Attribute::new("b", ValueType::Integer))
        .attribute(Attribute::new("c", ValueType::Integer))
        .attribute(Attribute::new("d", ValueType::Integer))
        .attribute(Attribute::new("e", ValueType::Integer))
        .attribute(Attribute::new("f", ValueType::Integer).doc("free-form counter"))
        .build()
        .expect("t_a fixture is valid")
}

/// Builds a `t_a` record; `f` is left at its default.
pub fn t_a_record(ty: &Arc<RecordType>, a: i64, b: i64, c: i64, d: i64, e: i64) -> Record {
    Record::from_pairs(
        ty,
        &[
            ("a", a.into()),
            ("b", b.into()),
            ("c", c.into()),
            ("d", d.into()),
            ("e", e.into()),
        ],
    )
    .expect("t_a record is valid")
}

/// `t_seq`: sequence identity `id` (start 10000, step 1) and text `name`.
pub fn sequence_type() -> Arc<RecordType> {
    RecordType::builder("t_seq")
        .sequence_identity("id", SequenceSpec::new(T_SEQ_SEQUENCE, 10_000, 1))
        .attribute(Attribute::new("name", ValueType::Text))
        .build()
        .expect("t_seq fixture is valid")
}

/// Builds a `t_seq` record with an unallocated identity.
pub fn sequence_record(ty: &Arc<RecordType>, name: &str) -> Record {
    Record::from_pairs(ty, &[("name", name.into())]).expect("t_seq record is valid")
}

/// A parent type with a sequence identity and a child type keyed by
/// `(parent_id, n)`.
pub fn parent_child_types() -> (Arc<RecordType>, Arc<RecordType>) {
    let parent = RecordType::builder("parent")
        .sequence_identity("id", SequenceSpec::new("parent_id_seq", 1, 1))
        .attribute(Attribute::new("title", ValueType::Text))
        .build()
        .expect("parent fixture is valid");
    let child = RecordType::builder("child")
        .identity(Attribute::new("parent_id", ValueType::Integer))
        .identity(Attribute::new("n", ValueType::Integer))
        .attribute(Attribute::new("label", ValueType::Text))
        .build()
        .expect("child fixture is valid");
    (parent, child)
}

/// A memory store with the sequences of the given types defined.
#[derive(Debug, Clone, Default)]
pub struct TestStore {
    /// The store instance.
    pub store: MemoryStore,
}

impl TestStore {
    /// Creates a store defining every sequence used by `types`.
    pub fn for_types(types: &[&Arc<RecordType>]) -> Self {
        let store = MemoryStore::new();
        for ty in types {
            for spec in ty.sequences() {
                store.define_sequence(spec.name.clone(), spec.start, spec.step);
            }
        }
        Self { store }
    }
}

impl std::ops::Deref for TestStore {
    type Target = MemoryStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl std::ops::DerefMut for TestStore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

/// Runs `f` with a store prepared for `types`.
pub fn with_store<F, R>(types: &[&Arc<RecordType>], f: F) -> R
where
    F: FnOnce(&mut MemoryStore) -> R,
{
    let mut test_store = TestStore::for_types(types);
    f(&mut test_store.store)
}

/// Canned states.
pub mod scenarios {
    use super::*;

    /// Merges `count` `t_a` records into a fresh store.
    ///
    /// Returns the store, the merged collection and its type.
    pub fn populated_t_a(count: i64) -> (TestStore, RecordCollection, Arc<RecordType>) {
        let ty = t_a_type();
        let mut test_store = TestStore::for_types(&[&ty]);
        let mut current = RecordCollection::new(&ty);
        for i in 0..count {
            let base = 10_000 + i * 10;
            current
                .upsert(t_a_record(&ty, 1, base, base + 1, base + 2, base + 3))
                .expect("fixture upsert");
        }
        merge(
            &mut test_store.store,
            &mut current,
            &RecordCollection::new(&ty),
            MergeOptions::default(),
        )
        .expect("fixture merge");
        test_store.clear_history();
        (test_store, current, ty)
    }
}
