//! Store handle trait definition.

use crate::error::StoreResult;
use crate::row::Row;
use crate::statement::Statement;
use recsync_codec::Value;

/// A ready-to-use handle onto the backing relational store.
///
/// A handle stands for one logical connection inside the caller's unit of
/// work. recsync never begins, commits or rolls back; it only issues
/// statements and sequence requests, strictly one after another.
///
/// # Invariants
///
/// - `execute` applies the statement once per parameter row, in order
/// - `query` returns rows exposing exactly the SELECT columns
/// - `next_sequence_batch` returns `count` increasing values, or fails
/// - key predicates use SQL equality: a NULL key parameter or column value
///   matches no row
///
/// # Implementors
///
/// - [`super::MemoryStore`] - in-process tables, for tests and tooling
pub trait StoreHandle: Send {
    /// Executes an INSERT, UPDATE or DELETE once per parameter row.
    ///
    /// Returns the number of affected rows summed over all parameter rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is malformed for this store, a
    /// parameter cannot be bound, or the backend rejects it. Rows applied
    /// before the failure are not undone; the enclosing transaction is
    /// expected to roll back.
    fn execute(&mut self, statement: &Statement, rows: &[Vec<Value>]) -> StoreResult<u64>;

    /// Runs a SELECT with one set of key parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement is not a SELECT or the backend fails.
    fn query(&mut self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>>;

    /// Draws `count` values from the named sequence in a single request.
    ///
    /// # Errors
    ///
    /// Returns an error if the sequence does not exist or the backend fails.
    fn next_sequence_batch(&mut self, sequence: &str, count: usize) -> StoreResult<Vec<i64>>;
}

impl<S: StoreHandle + ?Sized> StoreHandle for &mut S {
    fn execute(&mut self, statement: &Statement, rows: &[Vec<Value>]) -> StoreResult<u64> {
        (**self).execute(statement, rows)
    }

    fn query(&mut self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>> {
        (**self).query(statement, params)
    }

    fn next_sequence_batch(&mut self, sequence: &str, count: usize) -> StoreResult<Vec<i64>> {
        (**self).next_sequence_batch(sequence, count)
    }
}

impl<S: StoreHandle + ?Sized> StoreHandle for Box<S> {
    fn execute(&mut self, statement: &Statement, rows: &[Vec<Value>]) -> StoreResult<u64> {
        (**self).execute(statement, rows)
    }

    fn query(&mut self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>> {
        (**self).query(statement, params)
    }

    fn next_sequence_batch(&mut self, sequence: &str, count: usize) -> StoreResult<Vec<i64>> {
        (**self).next_sequence_batch(sequence, count)
    }
}
