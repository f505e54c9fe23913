//! Surrogate-key sequence cells.

use crate::error::{CodecError, CodecResult};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// A surrogate-key cell drawn from a named store sequence.
///
/// A cell is either *unallocated* or holds the integer handed out by the
/// store. Clones share the cell, so allocating through one clone is visible
/// through every record that holds another.
///
/// # Equality
///
/// - Two allocated cells are equal when their integers are equal.
/// - An unallocated cell only equals itself (or a clone of itself).
#[derive(Clone)]
pub struct SequenceValue {
    sequence: Arc<str>,
    cell: Arc<Mutex<Option<i64>>>,
}

impl SequenceValue {
    /// Creates a fresh unallocated cell for `sequence`.
    #[must_use]
    pub fn unallocated(sequence: impl Into<Arc<str>>) -> Self {
        Self {
            sequence: sequence.into(),
            cell: Arc::new(Mutex::new(None)),
        }
    }

    /// Creates a cell that already holds `value`.
    #[must_use]
    pub fn allocated(sequence: impl Into<Arc<str>>, value: i64) -> Self {
        Self {
            sequence: sequence.into(),
            cell: Arc::new(Mutex::new(Some(value))),
        }
    }

    /// Returns the name of the store sequence this cell draws from.
    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Returns the allocated integer, if any.
    #[must_use]
    pub fn get(&self) -> Option<i64> {
        *self.cell.lock()
    }

    /// Returns true once the cell holds a value.
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.cell.lock().is_some()
    }

    /// Stores the allocated integer.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::AlreadyAllocated`] if the cell already holds a value.
    pub fn allocate(&self, value: i64) -> CodecResult<()> {
        let mut cell = self.cell.lock();
        if let Some(existing) = *cell {
            return Err(CodecError::AlreadyAllocated {
                sequence: self.sequence.to_string(),
                value: existing,
            });
        }
        *cell = Some(value);
        Ok(())
    }

    /// Returns true if both handles point at the same cell.
    #[must_use]
    pub fn same_cell(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }

    /// Address of the shared cell, stable for the cell's lifetime.
    pub(crate) fn cell_addr(&self) -> usize {
        Arc::as_ptr(&self.cell) as *const () as usize
    }
}

impl PartialEq for SequenceValue {
    fn eq(&self, other: &Self) -> bool {
        if self.same_cell(other) {
            return true;
        }
        match (self.get(), other.get()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for SequenceValue {}

impl fmt::Debug for SequenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(value) => write!(f, "SequenceValue({}: {})", self.sequence, value),
            None => write!(f, "SequenceValue({}: unallocated)", self.sequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_allocation() {
        let seq = SequenceValue::unallocated("t_seq");
        let clone = seq.clone();
        assert!(!clone.is_allocated());

        seq.allocate(10_000).unwrap();
        assert_eq!(clone.get(), Some(10_000));
    }

    #[test]
    fn unallocated_equals_only_itself() {
        let a = SequenceValue::unallocated("t_seq");
        let b = SequenceValue::unallocated("t_seq");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn allocated_cells_compare_by_value() {
        let a = SequenceValue::allocated("t_seq", 7);
        let b = SequenceValue::unallocated("other");
        b.allocate(7).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn allocate_twice_fails() {
        let seq = SequenceValue::unallocated("t_seq");
        seq.allocate(1).unwrap();
        let err = seq.allocate(2).unwrap_err();
        assert_eq!(
            err,
            CodecError::AlreadyAllocated {
                sequence: "t_seq".into(),
                value: 1
            }
        );
        assert_eq!(seq.get(), Some(1));
    }
}
