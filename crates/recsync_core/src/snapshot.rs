//! CBOR snapshots of record collections.
//!
//! A snapshot keeps a baseline between diff cycles without a store round
//! trip. It records the item type name, the partition and each record's
//! values by attribute name. Unallocated sequence cells are written as null
//! and come back as fresh unallocated cells.

use crate::collection::RecordCollection;
use crate::error::{CoreError, CoreResult};
use crate::record::Record;
use crate::schema::RecordType;
use recsync_codec::{from_cbor, to_cbor, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::trace;

/// Snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotDoc {
    version: u32,
    record_type: String,
    partition: Vec<(String, Value)>,
    attributes: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Encodes `collection` as CBOR.
///
/// # Errors
///
/// Returns a codec error if encoding fails.
pub fn capture(collection: &RecordCollection) -> CoreResult<Vec<u8>> {
    let item_type = collection.item_type();
    let doc = SnapshotDoc {
        version: SNAPSHOT_VERSION,
        record_type: item_type.name().to_string(),
        partition: collection.partition().to_vec(),
        attributes: item_type
            .attributes()
            .map(|a| a.name().to_string())
            .collect(),
        rows: collection.iter().map(|r| r.values().to_vec()).collect(),
    };
    let bytes = to_cbor(&doc)?;
    trace!(record_type = item_type.name(), rows = doc.rows.len(), bytes = bytes.len(), "captured snapshot");
    Ok(bytes)
}

/// Rebuilds a collection of `item_type` from a snapshot.
///
/// Attributes recorded in the snapshot but unknown to `item_type` are
/// ignored; attributes missing from it take their defaults.
///
/// # Errors
///
/// - `Codec` if the bytes are not a snapshot
/// - `InvalidOperation` for an unsupported snapshot version
/// - `IncompatibleTypes` if the snapshot was taken of another record type
pub fn restore(item_type: &Arc<RecordType>, bytes: &[u8]) -> CoreResult<RecordCollection> {
    let doc: SnapshotDoc = from_cbor(bytes)?;
    if doc.version != SNAPSHOT_VERSION {
        return Err(CoreError::invalid_operation(format!(
            "unsupported snapshot version {}",
            doc.version
        )));
    }
    if doc.record_type != item_type.name() {
        return Err(CoreError::incompatible(item_type.name(), doc.record_type));
    }

    let mut collection = RecordCollection::partitioned(item_type, doc.partition)?;
    for row in doc.rows {
        let pairs: Vec<(&str, Value)> = doc
            .attributes
            .iter()
            .map(String::as_str)
            .zip(row)
            .collect();
        collection.upsert(Record::from_pairs(item_type, &pairs)?)?;
    }
    Ok(collection)
}
