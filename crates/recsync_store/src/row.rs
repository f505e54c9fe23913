//! Result rows.

use recsync_codec::Value;
use std::sync::Arc;

/// A row returned by a query, addressed by column name.
///
/// All rows of one result share the same column list.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row. `values` must line up with `columns`.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Looks up a column value by name.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Iterates `(column, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_by_name() {
        let columns: Arc<[String]> = vec!["a".to_string(), "b".to_string()].into();
        let row = Row::new(columns, vec![Value::Integer(1), Value::Text("x".into())]);

        assert_eq!(row.get("b"), Some(&Value::Text("x".into())));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.iter().count(), 2);
    }
}
