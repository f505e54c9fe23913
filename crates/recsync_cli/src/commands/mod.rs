//! CLI command implementations.

pub mod diff;
pub mod plan;

use crate::schema::{load_records, load_schema, LoadError};
use recsync_core::{RecordCollection, RecordType};
use std::path::Path;
use std::sync::Arc;

/// A schema with its past and current record files loaded.
pub struct Inputs {
    /// The record type both files are read as.
    pub item_type: Arc<RecordType>,
    /// Previously persisted state.
    pub past: RecordCollection,
    /// Desired state.
    pub current: RecordCollection,
}

impl Inputs {
    /// Loads the schema, then both record files against it.
    pub fn load(schema: &Path, past: &Path, current: &Path) -> Result<Self, LoadError> {
        let item_type = load_schema(schema)?;
        let past = load_records(&item_type, past)?;
        let current = load_records(&item_type, current)?;
        Ok(Self {
            item_type,
            past,
            current,
        })
    }
}
