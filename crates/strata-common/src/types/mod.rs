//! Core types for StrataDB.

mod ids;
mod keys;

pub use ids::{ColumnId, DatabaseId, TableId, TxId};
pub use keys::{Key, Value};
