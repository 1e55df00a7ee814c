//! # strata-store
//!
//! The store seam of StrataDB.
//!
//! The SQL core consumes an append-only, transactional key-value store
//! through the [`KvStore`] trait: atomic multi-entry writes tagged with a
//! monotonic transaction id, and consistent read [`Snapshot`]s supporting
//! point lookups and ordered prefix scans.
//!
//! [`MemStore`] is the in-tree reference implementation, used by the
//! engine's tests and by embedders that do not bring their own store.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod kv;
mod memory;
mod snapshot;

pub use error::{StoreError, StoreResult};
pub use kv::KvPair;
pub use memory::{KvStore, MemStore};
pub use snapshot::{Cursor, Snapshot};
