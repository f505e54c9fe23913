//! # recsync Core
//!
//! Snapshot and synchronize collections of identity-keyed records against
//! a relational store.
//!
//! This crate provides:
//! - Record types built once from attribute descriptors
//! - Records and identity-indexed collections with upsert semantics
//! - Projections that narrow, rename or re-key an origin type
//! - An attribute-level diff between a current and a past collection
//! - Batched surrogate allocation from store sequences
//! - A merge executor grouping updates by change signature
//! - Recall of persisted rows back into collections
//! - CBOR snapshots of collections
//!
//! ## Cycle
//!
//! ```rust
//! use recsync_core::{diff, merge, recall, Attribute, MergeOptions, Page, Record,
//!     RecordCollection, RecordType, ValueType};
//! use recsync_store::MemoryStore;
//!
//! let ty = RecordType::builder("t")
//!     .identity(Attribute::new("id", ValueType::Integer))
//!     .attribute(Attribute::new("name", ValueType::Text))
//!     .build()
//!     .unwrap();
//! let mut store = MemoryStore::new();
//!
//! let mut current = RecordCollection::new(&ty);
//! current.upsert(Record::from_pairs(&ty, &[("id", 1.into()), ("name", "a".into())]).unwrap()).unwrap();
//! merge(&mut store, &mut current, &RecordCollection::new(&ty), MergeOptions::default()).unwrap();
//!
//! let baseline = recall(&mut store, &RecordCollection::new(&ty), &Page::new()).unwrap();
//! assert!(diff(&current, &baseline).unwrap().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod attribute;
mod collection;
mod config;
mod diff;
mod error;
mod merge;
mod projection;
mod recall;
mod record;
mod schema;
pub mod snapshot;

pub use allocator::allocate;
pub use attribute::{Attribute, SequenceSpec, ValueType};
pub use collection::RecordCollection;
pub use config::MergeOptions;
pub use diff::{diff, Change, ChangeEntry, Diff, InsertEntry};
pub use error::{CoreError, CoreResult};
pub use merge::{apply_diff, merge, MergeExecutor, MergeReport};
pub use projection::Projection;
pub use recall::{recall, recall_one, Page};
pub use record::{IdentityKey, Record, RecordSource};
pub use schema::{RecordType, RecordTypeBuilder};

pub use recsync_codec::{SequenceValue, Value};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
