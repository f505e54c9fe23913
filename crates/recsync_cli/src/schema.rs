//! JSON schema and record files.
//!
//! A schema file describes one record type:
//!
//! ```json
//! {
//!   "name": "t_seq",
//!   "identity": [{ "name": "id", "type": "sequence",
//!                  "sequence": { "name": "t_seq_id", "start": 10000, "step": 1 } }],
//!   "values": [{ "name": "label", "type": "text", "column": "label_col" }]
//! }
//! ```
//!
//! A record file is a JSON array of objects keyed by attribute name.

use recsync_codec::Value;
use recsync_core::{Attribute, CoreError, Record, RecordCollection, RecordType, SequenceSpec, ValueType};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors while loading CLI input files.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid JSON for its role.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// The schema describes an invalid type.
    #[error("schema {name}: {message}")]
    Schema {
        /// Schema name.
        name: String,
        /// Description of the problem.
        message: String,
    },

    /// A record does not fit the schema.
    #[error(transparent)]
    Core(#[from] CoreError),
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    name: String,
    table: Option<String>,
    #[serde(default)]
    identity: Vec<AttributeDef>,
    #[serde(default)]
    values: Vec<AttributeDef>,
}

#[derive(Debug, Deserialize)]
struct AttributeDef {
    name: String,
    #[serde(rename = "type", default = "any_type")]
    kind: String,
    sequence: Option<SequenceDef>,
    default: Option<Value>,
    doc: Option<String>,
    column: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SequenceDef {
    name: String,
    #[serde(default = "one")]
    start: i64,
    #[serde(default = "one")]
    step: i64,
}

fn any_type() -> String {
    "any".to_string()
}

fn one() -> i64 {
    1
}

impl AttributeDef {
    fn into_attribute(self, schema: &str) -> Result<Attribute, LoadError> {
        let value_type = match self.kind.as_str() {
            "any" => ValueType::Any,
            "integer" => ValueType::Integer,
            "text" => ValueType::Text,
            "bool" => ValueType::Bool,
            "bytes" => ValueType::Bytes,
            "sequence" => {
                let seq = self.sequence.ok_or_else(|| LoadError::Schema {
                    name: schema.to_string(),
                    message: format!("attribute '{}' needs a sequence definition", self.name),
                })?;
                ValueType::Sequence(SequenceSpec::new(seq.name, seq.start, seq.step))
            }
            other => {
                return Err(LoadError::Schema {
                    name: schema.to_string(),
                    message: format!("attribute '{}' has unknown type '{other}'", self.name),
                })
            }
        };

        let mut attribute = Attribute::new(self.name, value_type);
        if let Some(default) = self.default {
            attribute = attribute.default_value(default);
        }
        if let Some(doc) = self.doc {
            attribute = attribute.doc(doc);
        }
        if let Some(column) = self.column {
            attribute = attribute.column(column);
        }
        Ok(attribute)
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn parse<T: for<'de> Deserialize<'de>>(path: &Path, text: &str) -> Result<T, LoadError> {
    serde_json::from_str(text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a record type from a schema file.
pub fn load_schema(path: &Path) -> Result<Arc<RecordType>, LoadError> {
    let file: SchemaFile = parse(path, &read(path)?)?;
    let name = file.name.clone();

    let mut builder = RecordType::builder(file.name);
    if let Some(table) = file.table {
        builder = builder.table(table);
    }
    for def in file.identity {
        builder = builder.identity(def.into_attribute(&name)?);
    }
    for def in file.values {
        builder = builder.attribute(def.into_attribute(&name)?);
    }
    Ok(builder.build()?)
}

/// Loads a collection of `item_type` from a record file.
pub fn load_records(item_type: &Arc<RecordType>, path: &Path) -> Result<RecordCollection, LoadError> {
    let rows: Vec<BTreeMap<String, Value>> = parse(path, &read(path)?)?;
    let mut collection = RecordCollection::new(item_type);
    for row in rows {
        let pairs: Vec<(&str, Value)> = row.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        collection.upsert(Record::from_pairs(item_type, &pairs)?)?;
    }
    Ok(collection)
}
