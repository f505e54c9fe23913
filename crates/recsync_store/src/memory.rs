//! In-memory store for tests and tooling.

use crate::error::{StoreError, StoreResult};
use crate::handle::StoreHandle;
use crate::row::Row;
use crate::statement::{Statement, StatementKind};
use parking_lot::RwLock;
use recsync_codec::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// A statement the store has executed, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    /// The statement as issued.
    pub statement: Statement,
    /// Number of parameter rows it was executed with.
    pub rows: usize,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    fn position(&self, table: &str, column: &str) -> StoreResult<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| StoreError::UnknownColumn {
                table: table.to_string(),
                column: column.to_string(),
            })
    }

    fn positions(&self, table: &str, columns: &[String]) -> StoreResult<Vec<usize>> {
        columns.iter().map(|c| self.position(table, c)).collect()
    }

    fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(i) = self.columns.iter().position(|c| c == column) {
            return i;
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(Value::Null);
        }
        self.columns.len() - 1
    }
}

/// SQL equality: a NULL on either side never matches.
fn matches(row: &[Value], key_idx: &[usize], key_values: &[Value]) -> bool {
    key_idx.iter().zip(key_values).all(|(&i, expected)| {
        !row[i].is_null() && !expected.is_null() && &row[i] == expected
    })
}

#[derive(Debug, Clone, Copy)]
struct Sequence {
    next: i64,
    step: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<String, Table>,
    sequences: HashMap<String, Sequence>,
    history: Vec<Executed>,
    sequence_requests: Vec<(String, usize)>,
}

impl MemoryState {
    fn apply(&mut self, statement: &Statement, row: &[Value]) -> StoreResult<u64> {
        let name = statement.table();
        match statement.kind() {
            StatementKind::Insert => {
                let table = self.tables.entry(name.to_string()).or_default();
                let idx: Vec<usize> = statement
                    .columns()
                    .iter()
                    .map(|c| table.ensure_column(c))
                    .collect();
                let mut stored = vec![Value::Null; table.columns.len()];
                for (&i, value) in idx.iter().zip(row) {
                    stored[i] = value.clone();
                }
                table.rows.push(stored);
                Ok(1)
            }
            StatementKind::Update => {
                let Some(table) = self.tables.get_mut(name) else {
                    return Ok(0);
                };
                let set_idx = table.positions(name, statement.columns())?;
                let key_idx = table.positions(name, statement.keys())?;
                let (set_values, key_values) = row.split_at(set_idx.len());

                let mut affected = 0;
                for stored in &mut table.rows {
                    if matches(stored, &key_idx, key_values) {
                        for (&i, value) in set_idx.iter().zip(set_values) {
                            stored[i] = value.clone();
                        }
                        affected += 1;
                    }
                }
                Ok(affected)
            }
            StatementKind::Delete => {
                let Some(table) = self.tables.get_mut(name) else {
                    return Ok(0);
                };
                let key_idx = table.positions(name, statement.keys())?;
                let before = table.rows.len();
                table.rows.retain(|stored| !matches(stored, &key_idx, row));
                Ok((before - table.rows.len()) as u64)
            }
            StatementKind::Select => Err(StoreError::invalid_statement(
                "SELECT must be run through query",
            )),
        }
    }

    fn select(&self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>> {
        let name = statement.table();
        let Some(table) = self.tables.get(name) else {
            return Ok(Vec::new());
        };
        let key_idx = table.positions(name, statement.keys())?;
        let column_idx = table.positions(name, statement.columns())?;
        let order_idx = statement
            .order()
            .iter()
            .map(|key| Ok((table.position(name, &key.column)?, key.ascending)))
            .collect::<StoreResult<Vec<_>>>()?;

        let mut selected: Vec<&Vec<Value>> = table
            .rows
            .iter()
            .filter(|stored| matches(stored, &key_idx, params))
            .collect();

        // Stable sort keeps insertion order among equal keys.
        selected.sort_by(|a, b| {
            for &(i, ascending) in &order_idx {
                let ord = a[i].cmp_sort(&b[i]);
                let ord = if ascending { ord } else { ord.reverse() };
                if ord.is_ne() {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });

        let columns: Arc<[String]> = statement.columns().to_vec().into();
        Ok(selected
            .into_iter()
            .skip(statement.row_offset().unwrap_or(0))
            .take(statement.row_limit().unwrap_or(usize::MAX))
            .map(|stored| {
                let values = column_idx.iter().map(|&i| stored[i].clone()).collect();
                Row::new(Arc::clone(&columns), values)
            })
            .collect())
    }
}

/// An in-memory relational store.
///
/// Tables are created on first insert and grow new columns as statements
/// mention them. Sequences must be defined before use. Clones share the
/// same tables, so one clone can be handed to a merge while another is
/// used to inspect the result.
///
/// # Example
///
/// ```rust
/// use recsync_codec::Value;
/// use recsync_store::{MemoryStore, Statement, StoreHandle};
///
/// let mut store = MemoryStore::new();
/// let insert = Statement::insert("t", vec!["id".into(), "name".into()]);
/// store
///     .execute(&insert, &[vec![Value::Integer(1), Value::from("one")]])
///     .unwrap();
/// assert_eq!(store.row_count("t"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines (or redefines) a sequence starting at `start`.
    ///
    /// A `step` of zero is treated as one.
    pub fn define_sequence(&self, name: impl Into<String>, start: i64, step: i64) {
        let step = if step == 0 { 1 } else { step };
        self.state
            .write()
            .sequences
            .insert(name.into(), Sequence { next: start, step });
    }

    /// Returns the number of rows in `table` (zero if it does not exist).
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .read()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Returns every row of `table` as a [`Row`], in insertion order.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        let state = self.state.read();
        let Some(t) = state.tables.get(table) else {
            return Vec::new();
        };
        let columns: Arc<[String]> = t.columns.clone().into();
        t.rows
            .iter()
            .map(|r| Row::new(Arc::clone(&columns), r.clone()))
            .collect()
    }

    /// Returns the statements executed so far (queries excluded).
    #[must_use]
    pub fn history(&self) -> Vec<Executed> {
        self.state.read().history.clone()
    }

    /// Returns the `(sequence, count)` requests made so far.
    #[must_use]
    pub fn sequence_requests(&self) -> Vec<(String, usize)> {
        self.state.read().sequence_requests.clone()
    }

    /// Forgets recorded statements and sequence requests.
    pub fn clear_history(&self) {
        let mut state = self.state.write();
        state.history.clear();
        state.sequence_requests.clear();
    }
}

impl StoreHandle for MemoryStore {
    fn execute(&mut self, statement: &Statement, rows: &[Vec<Value>]) -> StoreResult<u64> {
        let mut state = self.state.write();
        let expected = statement.param_count();
        let mut affected = 0;

        for row in rows {
            if row.len() != expected {
                return Err(StoreError::ParameterCount {
                    expected,
                    actual: row.len(),
                });
            }
            let bound = row
                .iter()
                .map(Value::materialize)
                .collect::<Result<Vec<_>, _>>()?;
            affected += state.apply(statement, &bound)?;
        }

        trace!(sql = %statement, rows = rows.len(), affected, "executed");
        state.history.push(Executed {
            statement: statement.clone(),
            rows: rows.len(),
        });
        Ok(affected)
    }

    fn query(&mut self, statement: &Statement, params: &[Value]) -> StoreResult<Vec<Row>> {
        if statement.kind() != StatementKind::Select {
            return Err(StoreError::invalid_statement("query requires a SELECT"));
        }
        if params.len() != statement.param_count() {
            return Err(StoreError::ParameterCount {
                expected: statement.param_count(),
                actual: params.len(),
            });
        }
        let bound = params
            .iter()
            .map(Value::materialize)
            .collect::<Result<Vec<_>, _>>()?;
        self.state.read().select(statement, &bound)
    }

    fn next_sequence_batch(&mut self, sequence: &str, count: usize) -> StoreResult<Vec<i64>> {
        let mut state = self.state.write();
        let seq = state
            .sequences
            .get_mut(sequence)
            .ok_or_else(|| StoreError::UnknownSequence {
                sequence: sequence.to_string(),
            })?;

        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(seq.next);
            seq.next += seq.step;
        }
        state
            .sequence_requests
            .push((sequence.to_string(), count));
        Ok(values)
    }
}
