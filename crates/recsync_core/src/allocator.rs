//! Batched surrogate-key allocation.

use crate::error::{CoreError, CoreResult};
use indexmap::IndexMap;
use recsync_codec::{SequenceValue, Value};
use recsync_store::StoreHandle;
use std::collections::HashSet;
use tracing::debug;

/// Allocates every unallocated sequence cell among `values`.
///
/// Cells are collected in scan order, a cell shared by several records is
/// counted once, and already-allocated cells are skipped. Each sequence
/// gets exactly one `next_sequence_batch` request; the i-th cell of a
/// sequence receives the i-th value returned.
///
/// All batches are fetched before any cell is written, so a short batch
/// leaves every cell unallocated.
///
/// Returns the number of cells allocated.
///
/// # Errors
///
/// - `SequenceShortfall` if the store returns fewer values than requested
/// - store errors pass through unchanged
pub fn allocate<'v, S, I>(store: &mut S, values: I) -> CoreResult<usize>
where
    S: StoreHandle + ?Sized,
    I: IntoIterator<Item = &'v Value>,
{
    let pending = pending_cells(values);
    if pending.is_empty() {
        return Ok(0);
    }

    let mut batches = Vec::with_capacity(pending.len());
    for (sequence, cells) in &pending {
        debug!(sequence = %sequence, count = cells.len(), "requesting sequence batch");
        let batch = store.next_sequence_batch(sequence, cells.len())?;
        if batch.len() != cells.len() {
            return Err(CoreError::SequenceShortfall {
                sequence: sequence.clone(),
                requested: cells.len(),
                returned: batch.len(),
            });
        }
        batches.push(batch);
    }

    let mut allocated = 0;
    for ((_, cells), batch) in pending.iter().zip(batches) {
        for (cell, value) in cells.iter().zip(batch) {
            cell.allocate(value)?;
            allocated += 1;
        }
    }
    Ok(allocated)
}

/// Unallocated cells grouped by sequence name, in first-seen order.
fn pending_cells<'v, I>(values: I) -> IndexMap<String, Vec<SequenceValue>>
where
    I: IntoIterator<Item = &'v Value>,
{
    let mut seen: HashSet<&Value> = HashSet::new();
    let mut pending: IndexMap<String, Vec<SequenceValue>> = IndexMap::new();
    for value in values {
        let Value::Sequence(cell) = value else {
            continue;
        };
        if cell.is_allocated() || !seen.insert(value) {
            continue;
        }
        pending
            .entry(cell.sequence().to_string())
            .or_default()
            .push(cell.clone());
    }
    pending
}
