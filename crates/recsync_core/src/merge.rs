//! Applying a diff to the store.
//!
//! A merge runs three phases in fixed order: insert, update, delete. Every
//! phase issues its statements through the caller's [`StoreHandle`] one after
//! another; nothing is retried and nothing is rolled back here. The caller's
//! unit of work owns the transaction.
//!
//! # Statement Shapes
//!
//! - one INSERT over identity then value columns, chunked by
//!   [`MergeOptions::insert_batch_size`]
//! - one UPDATE per change signature (the exact set of changed columns)
//! - one DELETE keyed by the identity columns

use crate::allocator;
use crate::collection::RecordCollection;
use crate::config::MergeOptions;
use crate::diff::{diff, Diff};
use crate::error::{CoreError, CoreResult};
use crate::record::IdentityKey;
use crate::schema::RecordType;
use indexmap::IndexMap;
use recsync_codec::Value;
use recsync_store::{Statement, StoreHandle};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// Rows inserted, as reported by the store.
    pub inserted: u64,
    /// Rows updated, as reported by the store.
    pub updated: u64,
    /// Rows deleted, as reported by the store.
    pub deleted: u64,
    /// Number of `execute` calls issued.
    pub statements: usize,
    /// Number of sequence values allocated.
    pub allocated: usize,
}

/// Applies diffs through a borrowed store handle.
///
/// # Example
///
/// ```rust
/// use recsync_core::{Attribute, MergeExecutor, Record, RecordCollection, RecordType, ValueType};
/// use recsync_store::MemoryStore;
///
/// let ty = RecordType::builder("t")
///     .identity(Attribute::new("id", ValueType::Integer))
///     .attribute(Attribute::new("name", ValueType::Text))
///     .build()
///     .unwrap();
///
/// let mut current = RecordCollection::new(&ty);
/// current.upsert(Record::from_pairs(&ty, &[("id", 1.into()), ("name", "a".into())]).unwrap()).unwrap();
///
/// let mut store = MemoryStore::new();
/// let report = MergeExecutor::new(&mut store)
///     .merge(&mut current, &RecordCollection::new(&ty))
///     .unwrap();
/// assert_eq!(report.inserted, 1);
/// assert_eq!(store.row_count("t"), 1);
/// ```
pub struct MergeExecutor<'s, S: StoreHandle + ?Sized> {
    store: &'s mut S,
    options: MergeOptions,
}

impl<'s, S: StoreHandle + ?Sized> MergeExecutor<'s, S> {
    /// Creates an executor with default options.
    pub fn new(store: &'s mut S) -> Self {
        Self::with_options(store, MergeOptions::default())
    }

    /// Creates an executor with the given options.
    pub fn with_options(store: &'s mut S, options: MergeOptions) -> Self {
        Self { store, options }
    }

    /// The options in effect.
    pub fn options(&self) -> &MergeOptions {
        &self.options
    }

    /// Diffs `current` against `past` and applies the result.
    ///
    /// Sequence cells in `current` are allocated in place. When any identity
    /// in `current` holds a sequence cell, `current` is reindexed (unless
    /// disabled) so its records are found by their integer keys. This covers
    /// cells shared with an owner that a previous merge allocated.
    pub fn merge(
        &mut self,
        current: &mut RecordCollection,
        past: &RecordCollection,
    ) -> CoreResult<MergeReport> {
        let item_type = Arc::clone(current.item_type());
        let changes = diff(current, past)?;
        let report = self.apply(&item_type, &changes)?;
        if self.options.reindex_after_allocation && has_sequence_identity(current) {
            current.reindex();
        }
        Ok(report)
    }

    /// Applies an existing diff for records of `item_type`.
    ///
    /// # Errors
    ///
    /// - `IncompatibleTypes` if the diff is keyed by other identity names
    /// - `SequenceShortfall` before any INSERT if allocation comes up short
    /// - store errors pass through unchanged
    pub fn apply(&mut self, item_type: &Arc<RecordType>, diff: &Diff) -> CoreResult<MergeReport> {
        let plan = Plan::new(item_type, diff)?;
        let mut report = MergeReport::default();

        self.insert_phase(&plan, diff, &mut report)?;
        self.update_phase(&plan, diff, &mut report)?;
        self.delete_phase(&plan, diff, &mut report)?;

        debug!(
            table = plan.table,
            inserted = report.inserted,
            updated = report.updated,
            deleted = report.deleted,
            statements = report.statements,
            "merge applied"
        );
        Ok(report)
    }

    fn insert_phase(
        &mut self,
        plan: &Plan<'_>,
        diff: &Diff,
        report: &mut MergeReport,
    ) -> CoreResult<()> {
        if diff.inserts.is_empty() {
            return Ok(());
        }

        let scan = diff
            .inserts
            .iter()
            .flat_map(|e| e.identity.values().iter().chain(&e.values));
        report.allocated += allocator::allocate(&mut *self.store, scan)?;

        let identity_columns = if plan.keyed {
            plan.key_columns()
        } else {
            Vec::new()
        };
        let columns: Vec<String> = identity_columns
            .into_iter()
            .chain(plan.value_columns.iter().map(|(_, c)| c.clone()))
            .collect();
        let statement = Statement::insert(plan.table, columns);

        let mut rows = Vec::with_capacity(diff.inserts.len());
        for entry in &diff.inserts {
            let mut row = if plan.keyed {
                plan.key_row(&entry.identity)?
            } else {
                Vec::new()
            };
            for &(i, _) in &plan.value_columns {
                let value = entry.values.get(i).ok_or_else(|| {
                    CoreError::invalid_operation(format!(
                        "insert for {} carries {} values, expected {}",
                        entry.identity,
                        entry.values.len(),
                        diff.value_names.len()
                    ))
                })?;
                row.push(value.materialize()?);
            }
            rows.push(row);
        }

        debug!(table = plan.table, rows = rows.len(), "insert phase");
        for chunk in rows.chunks(self.options.insert_batch_size.max(1)) {
            let affected = self.execute(&statement, chunk, report)?;
            report.inserted += affected;
        }
        Ok(())
    }

    fn update_phase(
        &mut self,
        plan: &Plan<'_>,
        diff: &Diff,
        report: &mut MergeReport,
    ) -> CoreResult<()> {
        if diff.changes.is_empty() {
            return Ok(());
        }

        let scan = diff
            .changes
            .iter()
            .flat_map(|e| e.changes.values().map(|c| &c.new));
        report.allocated += allocator::allocate(&mut *self.store, scan)?;

        // Signature (persisted columns changed) -> parameter rows.
        let mut groups: IndexMap<Vec<String>, Vec<Vec<Value>>> = IndexMap::new();
        for entry in &diff.changes {
            let mut signature = Vec::with_capacity(entry.changes.len());
            let mut row = Vec::with_capacity(entry.changes.len() + plan.key_columns.len());
            for (name, change) in &entry.changes {
                let Some(column) = plan.column_for(name) else {
                    continue;
                };
                signature.push(column.to_string());
                row.push(change.new.materialize()?);
            }
            if signature.is_empty() {
                trace!(identity = %entry.identity, "only transient attributes changed");
                continue;
            }
            row.extend(plan.key_row(&entry.identity)?);
            groups.entry(signature).or_default().push(row);
        }

        debug!(
            table = plan.table,
            records = diff.changes.len(),
            signatures = groups.len(),
            "update phase"
        );
        for (signature, rows) in groups {
            let statement =
                Statement::update(plan.table, signature, plan.key_columns());
            let batched = self.options.batch_updates;
            let affected = self.execute_group(&statement, &rows, batched, report)?;
            report.updated += affected;
        }
        Ok(())
    }

    fn delete_phase(
        &mut self,
        plan: &Plan<'_>,
        diff: &Diff,
        report: &mut MergeReport,
    ) -> CoreResult<()> {
        if diff.deletes.is_empty() {
            return Ok(());
        }

        let statement = Statement::delete(plan.table, plan.key_columns());
        let rows = diff
            .deletes
            .iter()
            .map(|identity| plan.key_row(identity))
            .collect::<CoreResult<Vec<_>>>()?;

        debug!(table = plan.table, rows = rows.len(), "delete phase");
        let batched = self.options.batch_deletes;
        let affected = self.execute_group(&statement, &rows, batched, report)?;
        report.deleted += affected;
        Ok(())
    }

    fn execute_group(
        &mut self,
        statement: &Statement,
        rows: &[Vec<Value>],
        batched: bool,
        report: &mut MergeReport,
    ) -> CoreResult<u64> {
        if batched {
            return self.execute(statement, rows, report);
        }
        let mut affected = 0;
        for row in rows {
            affected += self.execute(statement, std::slice::from_ref(row), report)?;
        }
        Ok(affected)
    }

    fn execute(
        &mut self,
        statement: &Statement,
        rows: &[Vec<Value>],
        report: &mut MergeReport,
    ) -> CoreResult<u64> {
        trace!(sql = %statement, rows = rows.len(), "execute");
        report.statements += 1;
        Ok(self.store.execute(statement, rows)?)
    }
}

/// Column layout for one merge, resolved from the item type.
struct Plan<'a> {
    table: &'a str,
    /// Whether the type has identity attributes. Unkeyed types are keyed
    /// by all their persisted values.
    keyed: bool,
    /// (position in the identity key, column) for the WHERE columns.
    key_columns: Vec<(usize, String)>,
    /// (position in the diff's value list, column) for persisted attributes.
    value_columns: Vec<(usize, String)>,
    item_type: &'a RecordType,
}

impl<'a> Plan<'a> {
    fn new(item_type: &'a Arc<RecordType>, diff: &Diff) -> CoreResult<Self> {
        let identity_names = item_type.identity_names();
        if !diff.identity_names.iter().map(String::as_str).eq(identity_names) {
            return Err(CoreError::incompatible(
                item_type.name(),
                format!("diff keyed by ({})", diff.identity_names.join(", ")),
            ));
        }

        let mut value_columns = Vec::with_capacity(diff.value_names.len());
        for (i, name) in diff.value_names.iter().enumerate() {
            let attr = item_type.require(name)?;
            if !attr.is_transient() {
                value_columns.push((i, attr.column_name().to_string()));
            }
        }

        let keyed = item_type.has_identity();
        let key_columns = if keyed {
            item_type
                .identity_attributes()
                .map(|a| a.column_name().to_string())
                .enumerate()
                .collect()
        } else {
            value_columns.clone()
        };

        Ok(Self {
            table: item_type.table(),
            keyed,
            key_columns,
            value_columns,
            item_type,
        })
    }

    fn key_columns(&self) -> Vec<String> {
        self.key_columns.iter().map(|(_, c)| c.clone()).collect()
    }

    /// Materialized WHERE parameters for a record key.
    fn key_row(&self, identity: &IdentityKey) -> CoreResult<Vec<Value>> {
        let values = identity.values();
        self.key_columns
            .iter()
            .map(|&(i, _)| {
                values
                    .get(i)
                    .ok_or_else(|| {
                        CoreError::invalid_operation(format!(
                            "identity {identity} too short for {}",
                            self.item_type.name()
                        ))
                    })?
                    .materialize()
                    .map_err(CoreError::from)
            })
            .collect()
    }

    /// Persisted column for a changed attribute, `None` if transient.
    fn column_for(&self, name: &str) -> Option<&str> {
        self.item_type
            .attribute(name)
            .filter(|a| !a.is_transient())
            .map(|a| a.column_name())
    }
}

fn has_sequence_identity(collection: &RecordCollection) -> bool {
    collection.iter().any(|r| {
        r.identity_values()
            .iter()
            .any(|v| matches!(v, Value::Sequence(_)))
    })
}

/// Diffs `current` against `past` and applies the result to `store`.
pub fn merge<S: StoreHandle + ?Sized>(
    store: &mut S,
    current: &mut RecordCollection,
    past: &RecordCollection,
    options: MergeOptions,
) -> CoreResult<MergeReport> {
    MergeExecutor::with_options(store, options).merge(current, past)
}

/// Applies an existing diff for records of `item_type` to `store`.
pub fn apply_diff<S: StoreHandle + ?Sized>(
    store: &mut S,
    item_type: &Arc<RecordType>,
    diff: &Diff,
    options: MergeOptions,
) -> CoreResult<MergeReport> {
    MergeExecutor::with_options(store, options).apply(item_type, diff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Attribute, SequenceSpec, ValueType};
    use crate::record::Record;
    use recsync_store::{MemoryStore, StatementKind};

    fn t_a() -> Arc<RecordType> {
        RecordType::builder("t_a")
            .identity(Attribute::new("a", ValueType::Integer))
            .attribute(Attribute::new("b", ValueType::Integer))
            .attribute(Attribute::new("c", ValueType::Integer))
            .attribute(Attribute::new("f", ValueType::Integer).column("f_col"))
            .build()
            .unwrap()
    }

    fn record(ty: &Arc<RecordType>, a: i64, b: i64, c: i64, f: i64) -> Record {
        Record::from_pairs(
            ty,
            &[("a", a.into()), ("b", b.into()), ("c", c.into()), ("f", f.into())],
        )
        .unwrap()
    }

    fn seeded(ty: &Arc<RecordType>, n: i64) -> (MemoryStore, RecordCollection) {
        let mut store = MemoryStore::new();
        let mut current = RecordCollection::new(ty);
        for a in 1..=n {
            current.upsert(record(ty, a, 0, 0, 0)).unwrap();
        }
        merge(&mut store, &mut current, &RecordCollection::new(ty), MergeOptions::default())
            .unwrap();
        store.clear_history();
        (store, current)
    }

    #[test]
    fn insert_uses_identity_then_value_columns() {
        let ty = t_a();
        let (store, _) = seeded(&ty, 3);
        let rows = store.rows("t_a");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].columns(), &["a", "b", "c", "f_col"]);
    }

    #[test]
    fn updates_grouped_by_signature() {
        let ty = t_a();
        let (mut store, past) = seeded(&ty, 4);
        let mut current = past.clone();
        for (a, column) in [(1i64, "b"), (2, "b"), (3, "c")] {
            current
                .get_mut(&IdentityKey::from_iter([a]))
                .unwrap()
                .set(column, 9i64)
                .unwrap();
        }

        let report = merge(&mut store, &mut current, &past, MergeOptions::default()).unwrap();
        assert_eq!(report.updated, 3);
        assert_eq!(report.statements, 2);

        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].statement.text(), "UPDATE t_a SET b = ? WHERE a = ?");
        assert_eq!(history[0].rows, 2);
        assert_eq!(history[1].statement.text(), "UPDATE t_a SET c = ? WHERE a = ?");
    }

    #[test]
    fn unbatched_updates_execute_per_row() {
        let ty = t_a();
        let (mut store, past) = seeded(&ty, 2);
        let mut current = past.clone();
        for a in 1..=2i64 {
            current
                .get_mut(&IdentityKey::from_iter([a]))
                .unwrap()
                .set("f", 100i64)
                .unwrap();
        }

        let options = MergeOptions::new().batch_updates(false);
        let report = merge(&mut store, &mut current, &past, options).unwrap();
        assert_eq!(report.statements, 2);
        assert!(store.history().iter().all(|e| e.rows == 1));
        assert!(store
            .rows("t_a")
            .iter()
            .all(|r| r.get("f_col") == Some(&Value::Integer(100))));
    }

    #[test]
    fn phases_run_in_order() {
        let ty = t_a();
        let (mut store, past) = seeded(&ty, 2);
        let mut current = past.clone();
        current.remove(&IdentityKey::from_iter([1i64])).unwrap();
        current
            .get_mut(&IdentityKey::from_iter([2i64]))
            .unwrap()
            .set("b", 5i64)
            .unwrap();
        current.upsert(record(&ty, 3, 0, 0, 0)).unwrap();

        merge(&mut store, &mut current, &past, MergeOptions::default()).unwrap();
        let kinds: Vec<_> = store.history().iter().map(|e| e.statement.kind()).collect();
        assert_eq!(
            kinds,
            vec![StatementKind::Insert, StatementKind::Update, StatementKind::Delete]
        );
        assert_eq!(store.row_count("t_a"), 2);
    }

    #[test]
    fn inserts_chunked() {
        let ty = t_a();
        let mut store = MemoryStore::new();
        let mut current = RecordCollection::new(&ty);
        for a in 1..=5 {
            current.upsert(record(&ty, a, 0, 0, 0)).unwrap();
        }
        let options = MergeOptions::new().insert_batch_size(2);
        let report =
            merge(&mut store, &mut current, &RecordCollection::new(&ty), options).unwrap();
        assert_eq!(report.inserted, 5);
        assert_eq!(report.statements, 3);
    }

    #[test]
    fn sequence_identities_allocated_before_insert() {
        let ty = RecordType::builder("t_seq")
            .sequence_identity("id", SequenceSpec::new("t_seq_id", 10_000, 1))
            .attribute(Attribute::new("name", ValueType::Text))
            .build()
            .unwrap();
        let mut store = MemoryStore::new();
        store.define_sequence("t_seq_id", 10_000, 1);

        let mut current = RecordCollection::new(&ty);
        for name in ["x", "y"] {
            current
                .upsert(Record::from_pairs(&ty, &[("name", name.into())]).unwrap())
                .unwrap();
        }
        let report = merge(
            &mut store,
            &mut current,
            &RecordCollection::new(&ty),
            MergeOptions::default(),
        )
        .unwrap();

        assert_eq!(report.allocated, 2);
        assert!(current.get_by([10_000i64]).is_some());
        assert!(current.get_by([10_001i64]).is_some());
        let ids: Vec<_> = store.rows("t_seq").iter().map(|r| r.get("id").cloned()).collect();
        assert_eq!(ids, vec![Some(Value::Integer(10_000)), Some(Value::Integer(10_001))]);
    }

    #[test]
    fn changed_sequence_values_allocated_before_update() {
        let ty = RecordType::builder("t_r")
            .identity(Attribute::new("a", ValueType::Integer))
            .attribute(Attribute::new(
                "r",
                ValueType::Sequence(SequenceSpec::new("r_seq", 500, 1)),
            ))
            .build()
            .unwrap();
        let mut store = MemoryStore::new();
        store.define_sequence("r_seq", 500, 1);

        let mut past = RecordCollection::new(&ty);
        past.upsert(Record::from_pairs(&ty, &[("a", 1.into()), ("r", 7.into())]).unwrap())
            .unwrap();
        merge(&mut store, &mut past, &RecordCollection::new(&ty), MergeOptions::default())
            .unwrap();
        assert!(store.sequence_requests().is_empty());
        store.clear_history();

        let mut current = past.clone();
        current
            .get_mut(&IdentityKey::from_iter([1i64]))
            .unwrap()
            .set("r", Value::Null)
            .unwrap();
        let report = merge(&mut store, &mut current, &past, MergeOptions::default()).unwrap();

        assert_eq!((report.allocated, report.updated), (1, 1));
        assert_eq!(store.sequence_requests(), vec![("r_seq".to_string(), 1)]);
        assert_eq!(store.history()[0].statement.text(), "UPDATE t_r SET r = ? WHERE a = ?");
        assert_eq!(store.rows("t_r")[0].get("r"), Some(&Value::Integer(500)));
    }

    #[test]
    fn owned_items_found_by_owner_key_allocated_earlier() {
        let parent = RecordType::builder("parent")
            .sequence_identity("id", SequenceSpec::new("parent_id_seq", 1, 1))
            .build()
            .unwrap();
        let child = RecordType::builder("child")
            .identity(Attribute::new("parent_id", ValueType::Integer))
            .identity(Attribute::new("n", ValueType::Integer))
            .build()
            .unwrap();
        let mut store = MemoryStore::new();
        store.define_sequence("parent_id_seq", 1, 1);

        let mut parents = RecordCollection::new(&parent);
        let owner = parents.add(crate::record::RecordSource::Pairs(&[])).unwrap().clone();
        let mut children =
            RecordCollection::owned_by(&child, &owner, &[("parent_id", "id")]).unwrap();
        children
            .add(crate::record::RecordSource::Pairs(&[("n", 1.into())]))
            .unwrap();

        merge(&mut store, &mut parents, &RecordCollection::new(&parent), MergeOptions::default())
            .unwrap();
        let report = merge(
            &mut store,
            &mut children,
            &RecordCollection::new(&child),
            MergeOptions::default(),
        )
        .unwrap();

        assert_eq!((report.allocated, report.inserted), (0, 1));
        assert!(children.get_by([1i64, 1]).is_some());
    }

    #[test]
    fn short_insert_values_rejected() {
        let ty = t_a();
        let mut current = RecordCollection::new(&ty);
        current.upsert(record(&ty, 1, 2, 3, 4)).unwrap();
        let mut d = diff(&current, &RecordCollection::new(&ty)).unwrap();
        d.inserts[0].values.truncate(1);

        let mut store = MemoryStore::new();
        let err = apply_diff(&mut store, &ty, &d, MergeOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidOperation { .. }));
        assert!(store.history().is_empty());
    }

    #[test]
    fn transient_attributes_not_persisted() {
        let ty = t_a();
        let extra = RecordType::builder("extra")
            .identity(Attribute::new("x", ValueType::Integer))
            .attribute(Attribute::new("note", ValueType::Text))
            .build()
            .unwrap();
        let view = crate::projection::Projection::of(&ty)
            .select(["b"])
            .combine(&extra, ["note"])
            .build()
            .unwrap();

        let mut store = MemoryStore::new();
        let mut current = RecordCollection::new(&view);
        current
            .upsert(
                Record::from_pairs(&view, &[("a", 1.into()), ("b", 2.into()), ("note", "n".into())])
                    .unwrap(),
            )
            .unwrap();
        merge(&mut store, &mut current, &RecordCollection::new(&view), MergeOptions::default())
            .unwrap();
        assert_eq!(store.rows("t_a")[0].columns(), &["a", "b"]);

        let past = current.clone();
        current
            .get_mut(&IdentityKey::from_iter([1i64]))
            .unwrap()
            .set("note", "changed")
            .unwrap();
        store.clear_history();
        let report = merge(&mut store, &mut current, &past, MergeOptions::default()).unwrap();
        assert_eq!(report.statements, 0);
    }

    #[test]
    fn unkeyed_types_match_on_all_columns() {
        let ty = RecordType::builder("tags")
            .attribute(Attribute::new("owner", ValueType::Integer))
            .attribute(Attribute::new("tag", ValueType::Text))
            .build()
            .unwrap();
        let tag = |owner: i64, tag: &str| {
            Record::from_pairs(&ty, &[("owner", owner.into()), ("tag", tag.into())]).unwrap()
        };

        let mut store = MemoryStore::new();
        let mut past = RecordCollection::new(&ty);
        past.extend([tag(1, "x"), tag(1, "y")]).unwrap();
        merge(&mut store, &mut past, &RecordCollection::new(&ty), MergeOptions::default())
            .unwrap();
        assert_eq!(store.rows("tags")[0].columns(), &["owner", "tag"]);
        store.clear_history();

        let mut current = RecordCollection::new(&ty);
        current.extend([tag(1, "x"), tag(2, "z")]).unwrap();
        let report = merge(&mut store, &mut current, &past, MergeOptions::default()).unwrap();
        assert_eq!((report.inserted, report.updated, report.deleted), (1, 0, 1));

        let history = store.history();
        assert_eq!(history[1].statement.text(), "DELETE FROM tags WHERE owner = ? AND tag = ?");
        assert_eq!(store.row_count("tags"), 2);
    }

    #[test]
    fn diff_for_other_identity_rejected() {
        let ty = t_a();
        let other = RecordType::builder("other")
            .identity(Attribute::new("z", ValueType::Integer))
            .build()
            .unwrap();
        let d = diff(&RecordCollection::new(&other), &RecordCollection::new(&other)).unwrap();
        let mut store = MemoryStore::new();
        let err = apply_diff(&mut store, &ty, &d, MergeOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::IncompatibleTypes { .. }));
    }
}
