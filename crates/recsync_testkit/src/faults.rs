//! Fault-injecting store wrappers.
//!
//! Each wrapper delegates to an inner [`StoreHandle`] and misbehaves in one
//! specific way, so tests can check that failures surface unmodified and
//! that nothing is issued after them.

use recsync_codec::Value;
use recsync_store::{Row, Statement, StatementKind, StoreError, StoreHandle, StoreResult};

/// Returns `shortfall` fewer sequence values than requested.
#[derive(Debug, Clone)]
pub struct ShortSequenceStore<S> {
    inner: S,
    shortfall: usize,
}

impl<S: StoreHandle> ShortSequenceStore<S> {
    /// Wraps `inner`.
    pub fn new(inner: S, shortfall: usize) -> Self {
        Self { inner, shortfall }
    }

    /// Unwraps the inner store.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: StoreHandle> StoreHandle for ShortSequenceStore<S> {
    fn execute(&mut self, statement: &Statement, rows: &[Vec<Value>]) -> StoreResult<u64> {
        self.inner.execute(statement, rows)
    }

    fn query(&mut self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>> {
        self.inner.query(statement, params)
    }

    fn next_sequence_batch(&mut self, sequence: &str, count: usize) -> StoreResult<Vec<i64>> {
        let mut values = self.inner.next_sequence_batch(sequence, count)?;
        values.truncate(count.saturating_sub(self.shortfall));
        Ok(values)
    }
}

/// Fails every `execute` of one statement kind.
#[derive(Debug, Clone)]
pub struct FailingStore<S> {
    inner: S,
    fail_on: StatementKind,
    attempts: usize,
}

impl<S: StoreHandle> FailingStore<S> {
    /// Wraps `inner`, failing statements of kind `fail_on`.
    pub fn new(inner: S, fail_on: StatementKind) -> Self {
        Self {
            inner,
            fail_on,
            attempts: 0,
        }
    }

    /// How many failing statements were attempted.
    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

impl<S: StoreHandle> StoreHandle for FailingStore<S> {
    fn execute(&mut self, statement: &Statement, rows: &[Vec<Value>]) -> StoreResult<u64> {
        if statement.kind() == self.fail_on {
            self.attempts += 1;
            return Err(StoreError::failed(format!("injected failure: {statement}")));
        }
        self.inner.execute(statement, rows)
    }

    fn query(&mut self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>> {
        if self.fail_on == StatementKind::Select {
            self.attempts += 1;
            return Err(StoreError::failed(format!("injected failure: {statement}")));
        }
        self.inner.query(statement, params)
    }

    fn next_sequence_batch(&mut self, sequence: &str, count: usize) -> StoreResult<Vec<i64>> {
        self.inner.next_sequence_batch(sequence, count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recsync_store::MemoryStore;

    #[test]
    fn short_store_truncates() {
        let store = MemoryStore::new();
        store.define_sequence("s", 1, 1);
        let mut short = ShortSequenceStore::new(store, 1);
        assert_eq!(short.next_sequence_batch("s", 3).unwrap(), vec![1, 2]);
    }

    #[test]
    fn failing_store_counts_attempts() {
        let mut failing = FailingStore::new(MemoryStore::new(), StatementKind::Delete);
        let delete = Statement::delete("t", vec!["id".into()]);
        let err = failing.execute(&delete, &[vec![Value::Integer(1)]]).unwrap_err();
        assert!(matches!(err, StoreError::Failed { .. }));
        assert_eq!(failing.attempts(), 1);

        let insert = Statement::insert("t", vec!["id".into()]);
        assert_eq!(failing.execute(&insert, &[vec![Value::Integer(1)]]).unwrap(), 1);
    }
}
