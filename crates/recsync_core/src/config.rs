//! Merge configuration.

/// Options controlling how a diff is turned into statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOptions {
    /// Maximum parameter rows per INSERT call; larger insert sets are chunked.
    pub insert_batch_size: usize,

    /// Execute each update signature group as one call with all its rows.
    /// When false, one call is issued per changed record.
    pub batch_updates: bool,

    /// Execute all deletes as one call. When false, one call per identity.
    pub batch_deletes: bool,

    /// Rebuild the current collection's identity index after a merge when
    /// any identity holds a sequence cell, so records are found by their
    /// integer keys.
    pub reindex_after_allocation: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            insert_batch_size: 500,
            batch_updates: true,
            batch_deletes: true,
            reindex_after_allocation: true,
        }
    }
}

impl MergeOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum rows per INSERT call (zero is treated as one).
    #[must_use]
    pub const fn insert_batch_size(mut self, size: usize) -> Self {
        self.insert_batch_size = if size == 0 { 1 } else { size };
        self
    }

    /// Sets whether update groups are executed as one call.
    #[must_use]
    pub const fn batch_updates(mut self, value: bool) -> Self {
        self.batch_updates = value;
        self
    }

    /// Sets whether deletes are executed as one call.
    #[must_use]
    pub const fn batch_deletes(mut self, value: bool) -> Self {
        self.batch_deletes = value;
        self
    }

    /// Sets whether the current collection is reindexed after allocation.
    #[must_use]
    pub const fn reindex_after_allocation(mut self, value: bool) -> Self {
        self.reindex_after_allocation = value;
        self
    }
}
