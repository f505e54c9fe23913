//! Reading persisted state back into collections.

use crate::collection::RecordCollection;
use crate::error::{CoreError, CoreResult};
use crate::record::{IdentityKey, Record};
use crate::schema::RecordType;
use recsync_codec::Value;
use recsync_store::{SortKey, Statement, StoreHandle};
use std::sync::Arc;
use tracing::debug;

/// Ordering and windowing for [`recall`].
///
/// Sort keys name attributes, not columns; they are resolved against the
/// item type when the recall runs, before any I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    order: Vec<(String, bool)>,
    limit: Option<usize>,
    start: Option<usize>,
}

impl Page {
    /// An unordered, unlimited page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sort key.
    #[must_use]
    pub fn order_by(mut self, attribute: impl Into<String>, ascending: bool) -> Self {
        self.order.push((attribute.into(), ascending));
        self
    }

    /// Limits the number of records returned.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips the first `start` records.
    #[must_use]
    pub fn start(mut self, start: usize) -> Self {
        self.start = Some(start);
        self
    }

    /// Sort keys as `(attribute, ascending)`.
    pub fn order(&self) -> &[(String, bool)] {
        &self.order
    }

    /// The record limit, if any.
    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// The starting offset, if any.
    pub fn row_start(&self) -> Option<usize> {
        self.start
    }

    fn sort_keys(&self, item_type: &RecordType) -> CoreResult<Vec<SortKey>> {
        self.order
            .iter()
            .map(|(name, ascending)| {
                let attr = item_type.require(name)?;
                if attr.is_transient() {
                    return Err(CoreError::invalid_operation(format!(
                        "cannot order {} by transient attribute '{name}'",
                        item_type.name()
                    )));
                }
                let column = attr.column_name();
                Ok(if *ascending {
                    SortKey::asc(column)
                } else {
                    SortKey::desc(column)
                })
            })
            .collect()
    }
}

fn persisted_columns(item_type: &RecordType) -> Vec<String> {
    item_type
        .attributes()
        .filter(|a| !a.is_transient())
        .map(|a| a.column_name().to_string())
        .collect()
}

/// Reads the records belonging to `shell` from the store.
///
/// `shell` supplies the item type and partition values; its records are
/// ignored. Rows are filtered by the partition columns, ordered and windowed
/// by `page`, and returned as a new collection with the same partition.
///
/// # Errors
///
/// - `UnknownAttribute` if a sort key names no attribute (before any I/O)
/// - `Codec` if a partition value is an unallocated sequence
/// - store errors pass through unchanged
pub fn recall<S: StoreHandle + ?Sized>(
    store: &mut S,
    shell: &RecordCollection,
    page: &Page,
) -> CoreResult<RecordCollection> {
    let item_type = shell.item_type();
    let order = page.sort_keys(item_type)?;

    let mut keys = Vec::with_capacity(shell.partition().len());
    let mut params = Vec::with_capacity(shell.partition().len());
    for (name, value) in shell.partition() {
        keys.push(item_type.require(name)?.column_name().to_string());
        params.push(value.materialize()?);
    }

    let statement = Statement::select(item_type.table(), persisted_columns(item_type), keys)
        .order_by(order)
        .limit(page.limit)
        .offset(page.start);
    let rows = store.query(&statement, &params)?;
    debug!(table = item_type.table(), rows = rows.len(), "recalled");

    let mut recalled = RecordCollection::partitioned(item_type, shell.partition().to_vec())?;
    for row in &rows {
        recalled.upsert(Record::from_row(item_type, row)?)?;
    }
    Ok(recalled)
}

/// Reads a single record by identity.
///
/// Returns `None` when no row matches.
///
/// # Errors
///
/// Returns `InvalidOperation` if the type has no identity or `identity`
/// has the wrong number of values.
pub fn recall_one<S: StoreHandle + ?Sized>(
    store: &mut S,
    item_type: &Arc<RecordType>,
    identity: &IdentityKey,
) -> CoreResult<Option<Record>> {
    if !item_type.has_identity() || identity.len() != item_type.identity_len() {
        return Err(CoreError::invalid_operation(format!(
            "{} is keyed by {} identity values, got {}",
            item_type.name(),
            item_type.identity_len(),
            identity.len()
        )));
    }

    let keys = item_type
        .identity_attributes()
        .map(|a| a.column_name().to_string())
        .collect();
    let params = identity
        .values()
        .iter()
        .map(Value::materialize)
        .collect::<Result<Vec<_>, _>>()?;

    let statement = Statement::select(item_type.table(), persisted_columns(item_type), keys)
        .limit(Some(1));
    let rows = store.query(&statement, &params)?;
    debug!(table = item_type.table(), found = !rows.is_empty(), "recalled one");

    rows.first()
        .map(|row| Record::from_row(item_type, row))
        .transpose()
}
