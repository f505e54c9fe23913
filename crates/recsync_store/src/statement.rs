//! Parameterized statement shapes.
//!
//! Statements are kept structured so that backends which do not speak SQL
//! (such as [`crate::MemoryStore`]) can interpret them directly, while
//! SQL backends render them with [`Statement::text`].
//!
//! # Parameter Layout
//!
//! | kind   | parameters per row                        |
//! |--------|-------------------------------------------|
//! | INSERT | one per column, in column order           |
//! | UPDATE | SET values in order, then key values      |
//! | DELETE | key values in order                       |
//! | SELECT | key values in order                       |

use std::fmt;

/// The kind of a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `INSERT INTO ... VALUES ...`
    Insert,
    /// `UPDATE ... SET ... WHERE ...`
    Update,
    /// `DELETE FROM ... WHERE ...`
    Delete,
    /// `SELECT ... FROM ... WHERE ...`
    Select,
}

/// One ordering term of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    /// Column to order by.
    pub column: String,
    /// Ascending when true, descending otherwise.
    pub ascending: bool,
}

impl SortKey {
    /// Creates an ascending sort key.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    /// Creates a descending sort key.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// A parameterized statement against a single table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    kind: StatementKind,
    table: String,
    columns: Vec<String>,
    keys: Vec<String>,
    order: Vec<SortKey>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Statement {
    fn new(kind: StatementKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            columns: Vec::new(),
            keys: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Creates an INSERT of `columns`.
    pub fn insert(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            columns,
            ..Self::new(StatementKind::Insert, table)
        }
    }

    /// Creates an UPDATE assigning `set` where every `keys` column matches.
    pub fn update(table: impl Into<String>, set: Vec<String>, keys: Vec<String>) -> Self {
        Self {
            columns: set,
            keys,
            ..Self::new(StatementKind::Update, table)
        }
    }

    /// Creates a DELETE where every `keys` column matches.
    pub fn delete(table: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            keys,
            ..Self::new(StatementKind::Delete, table)
        }
    }

    /// Creates a SELECT of `columns` filtered by equality on `keys`.
    pub fn select(table: impl Into<String>, columns: Vec<String>, keys: Vec<String>) -> Self {
        Self {
            columns,
            keys,
            ..Self::new(StatementKind::Select, table)
        }
    }

    /// Appends ordering terms.
    #[must_use]
    pub fn order_by(mut self, order: impl IntoIterator<Item = SortKey>) -> Self {
        self.order.extend(order);
        self
    }

    /// Limits the number of rows returned.
    #[must_use]
    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Skips the first `offset` rows.
    #[must_use]
    pub fn offset(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    /// Returns the statement kind.
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Returns the target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// INSERT columns, UPDATE SET columns, or SELECT result columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns matched by equality in the WHERE clause.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Ordering terms (SELECT only).
    pub fn order(&self) -> &[SortKey] {
        &self.order
    }

    /// Row limit (SELECT only).
    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Row offset (SELECT only).
    pub fn row_offset(&self) -> Option<usize> {
        self.offset
    }

    /// Number of placeholders a parameter row must fill.
    pub fn param_count(&self) -> usize {
        match self.kind {
            StatementKind::Insert => self.columns.len(),
            StatementKind::Update => self.columns.len() + self.keys.len(),
            StatementKind::Delete | StatementKind::Select => self.keys.len(),
        }
    }

    /// Renders the statement as SQL with `?` placeholders.
    pub fn text(&self) -> String {
        self.to_string()
    }

    fn write_where(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.keys.is_empty() {
            return Ok(());
        }
        f.write_str(" WHERE ")?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{key} = ?")?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StatementKind::Insert => {
                let placeholders = vec!["?"; self.columns.len()].join(", ");
                write!(
                    f,
                    "INSERT INTO {} ({}) VALUES ({})",
                    self.table,
                    self.columns.join(", "),
                    placeholders
                )
            }
            StatementKind::Update => {
                write!(f, "UPDATE {} SET ", self.table)?;
                for (i, column) in self.columns.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{column} = ?")?;
                }
                self.write_where(f)
            }
            StatementKind::Delete => {
                write!(f, "DELETE FROM {}", self.table)?;
                self.write_where(f)
            }
            StatementKind::Select => {
                write!(f, "SELECT {} FROM {}", self.columns.join(", "), self.table)?;
                self.write_where(f)?;
                if !self.order.is_empty() {
                    f.write_str(" ORDER BY ")?;
                    for (i, key) in self.order.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        let dir = if key.ascending { "ASC" } else { "DESC" };
                        write!(f, "{} {}", key.column, dir)?;
                    }
                }
                if let Some(limit) = self.limit {
                    write!(f, " LIMIT {limit}")?;
                }
                if let Some(offset) = self.offset {
                    write!(f, " OFFSET {offset}")?;
                }
                Ok(())
            }
        }
    }
}
