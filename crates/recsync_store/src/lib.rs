//! # recsync Store
//!
//! The store handle contract recsync issues statements through, and an
//! in-memory implementation of it.
//!
//! recsync does not own connections, pools or transactions. Callers open a
//! unit of work on their own store and pass a [`StoreHandle`] for it to
//! merge and recall calls.
//!
//! ## Design Principles
//!
//! - Statements are structured values ([`Statement`]); SQL text is one
//!   rendering of them
//! - One handle is one logical connection, used strictly sequentially
//! - Parameters are bound already materialized: sequence values must be
//!   allocated before they reach a store
//!
//! ## Example
//!
//! ```rust
//! use recsync_store::{MemoryStore, StoreHandle};
//!
//! let mut store = MemoryStore::new();
//! store.define_sequence("t_seq", 10_000, 1);
//! assert_eq!(store.next_sequence_batch("t_seq", 2).unwrap(), vec![10_000, 10_001]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod handle;
mod memory;
mod row;
mod statement;

pub use error::{StoreError, StoreResult};
pub use handle::StoreHandle;
pub use memory::{Executed, MemoryStore};
pub use row::Row;
pub use statement::{SortKey, Statement, StatementKind};
