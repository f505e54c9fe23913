//! # recsync Testkit
//!
//! Test utilities for recsync.
//!
//! This crate provides:
//! - Record type fixtures and prepared memory stores
//! - Property-based test generators using proptest
//! - Fault-injecting store wrappers
//! - A merge/recall cycle harness for cross-crate tests
//!
//! ## Usage
//!
//! ```rust
//! use recsync_core::RecordCollection;
//! use recsync_testkit::prelude::*;
//!
//! let ty = t_a_type();
//! let mut harness = SyncHarness::new(&ty);
//! let mut current = RecordCollection::new(&ty);
//! current.upsert(t_a_record(&ty, 1, 2, 3, 4, 5)).unwrap();
//! harness.commit(&mut current);
//! harness.verify(&current);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
pub use integration::*;
