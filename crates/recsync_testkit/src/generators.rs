//! Property-based test generators using proptest.
//!
//! Strategies produce `t_a` collections (see [`crate::fixtures::t_a_type`])
//! with unique identities, and edit scripts that mutate them.

use proptest::prelude::*;
use recsync_codec::Value;
use recsync_core::{IdentityKey, Record, RecordCollection, RecordType};
use std::sync::Arc;

/// Value attributes of `t_a`, in declaration order.
pub const T_A_VALUES: [&str; 4] = ["c", "d", "e", "f"];

/// One generated `t_a` row: identity `(a, b)` and values `c..f`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaRow {
    /// Identity `a`.
    pub a: i64,
    /// Identity `b`.
    pub b: i64,
    /// Values of `c`, `d`, `e`, `f`.
    pub values: [i64; 4],
}

impl TaRow {
    /// Builds the record.
    pub fn to_record(&self, ty: &Arc<RecordType>) -> Record {
        let mut pairs: Vec<(&str, Value)> = vec![("a", self.a.into()), ("b", self.b.into())];
        pairs.extend(T_A_VALUES.iter().zip(self.values).map(|(&n, v)| (n, v.into())));
        Record::from_pairs(ty, &pairs).expect("generated row is valid")
    }
}

/// Strategy for scalar attribute values of any variant but sequences.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        "[a-z ]{0,12}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Value::Bytes),
    ]
}

/// Strategy for up to `max` rows with distinct identities.
pub fn t_a_rows_strategy(max: usize) -> impl Strategy<Value = Vec<TaRow>> {
    prop::collection::btree_map((0i64..4, 0i64..64), any::<[i64; 4]>(), 0..max).prop_map(|rows| {
        rows.into_iter()
            .map(|((a, b), values)| TaRow { a, b, values })
            .collect()
    })
}

/// Builds a collection from generated rows.
pub fn collection_from_rows(ty: &Arc<RecordType>, rows: &[TaRow]) -> RecordCollection {
    let mut collection = RecordCollection::new(ty);
    for row in rows {
        collection
            .upsert(row.to_record(ty))
            .expect("generated record matches its type");
    }
    collection
}

/// One edit applied to a collection.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Assign `value` to value attribute `attribute` of the record at
    /// `index` (modulo length).
    Set {
        /// Record position.
        index: usize,
        /// Index into [`T_A_VALUES`].
        attribute: usize,
        /// New value.
        value: i64,
    },
    /// Remove the record at `index` (modulo length).
    Remove {
        /// Record position.
        index: usize,
    },
    /// Upsert a new row.
    Insert(TaRow),
}

/// Strategy for a single mutation.
pub fn mutation_strategy() -> impl Strategy<Value = Mutation> {
    prop_oneof![
        3 => (any::<usize>(), 0..T_A_VALUES.len(), any::<i64>())
            .prop_map(|(index, attribute, value)| Mutation::Set { index, attribute, value }),
        1 => any::<usize>().prop_map(|index| Mutation::Remove { index }),
        1 => (4i64..8, 0i64..64, any::<[i64; 4]>())
            .prop_map(|(a, b, values)| Mutation::Insert(TaRow { a, b, values })),
    ]
}

/// Strategy for an edit script.
pub fn mutations_strategy(max: usize) -> impl Strategy<Value = Vec<Mutation>> {
    prop::collection::vec(mutation_strategy(), 0..max)
}

/// Applies `mutations` to `collection`.
pub fn apply_mutations(collection: &mut RecordCollection, mutations: &[Mutation]) {
    let ty = Arc::clone(collection.item_type());
    for mutation in mutations {
        match mutation {
            Mutation::Set {
                index,
                attribute,
                value,
            } => {
                if collection.is_empty() {
                    continue;
                }
                let key: IdentityKey = collection
                    .keys()
                    .nth(index % collection.len())
                    .cloned()
                    .expect("index within bounds");
                if let Some(record) = collection.get_mut(&key) {
                    record
                        .set(T_A_VALUES[*attribute], *value)
                        .expect("t_a value attribute");
                }
            }
            Mutation::Remove { index } => {
                if !collection.is_empty() {
                    let position = index % collection.len();
                    collection.remove_at(position).expect("index within bounds");
                }
            }
            Mutation::Insert(row) => {
                collection
                    .upsert(row.to_record(&ty))
                    .expect("generated record matches its type");
            }
        }
    }
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 128,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
