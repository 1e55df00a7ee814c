//! # strata-common
//!
//! Common types and configuration for StrataDB.
//!
//! This crate provides the foundational types shared by the StrataDB
//! components:
//!
//! - **Types**: Core identifiers (`DatabaseId`, `TableId`, `ColumnId`,
//!   `TxId`) and the byte-wrapper `Key`/`Value` pair.
//! - **Constants**: System-wide limits for keys and values.
//! - **Config**: Engine configuration structures.
//!
//! ## Example
//!
//! ```rust
//! use strata_common::types::{DatabaseId, Key, Value};
//!
//! let db_id = DatabaseId::new(1);
//! let key = Key::from_bytes(b"CATALOG.DATABASE.");
//! let value = Value::from_str("db1");
//! assert!(db_id.is_valid());
//! assert!(key.starts_with(b"CATALOG."));
//! assert_eq!(value.len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod constants;
pub mod types;

pub use constants::*;
pub use types::{ColumnId, DatabaseId, Key, TableId, TxId, Value};
