//! Store error types.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a [`crate::KvStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An empty write set was submitted.
    #[error("transaction contains no entries")]
    EmptyTransaction,

    /// An entry carried an empty key.
    #[error("entry key must not be empty")]
    EmptyKey,

    /// A key exceeded the store's size limit.
    #[error("key size {size} exceeds maximum {max_size}")]
    KeyTooLarge {
        /// Actual key size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },

    /// A value exceeded the store's size limit.
    #[error("value size {size} exceeds maximum {max_size}")]
    ValueTooLarge {
        /// Actual value size.
        size: usize,
        /// Maximum allowed size.
        max_size: usize,
    },
}
