//! SQL layer error types.
//!
//! Each failure mode the compiler or resolver can hit is a distinct
//! variant, so embedders can match on kinds rather than parse messages.

use thiserror::Error;

use strata_store::StoreError;

/// Result type for SQL layer operations.
pub type SqlResult<T> = std::result::Result<T, SqlError>;

/// Errors surfaced by statement compilation and query resolution.
#[derive(Debug, Error)]
pub enum SqlError {
    /// A nil/malformed argument reached the resolver (missing snapshot,
    /// malformed ordering column, oversized initial key value).
    #[error("illegal arguments")]
    IllegalArguments,

    /// A statement required an implicit database and none was selected.
    #[error("no database selected")]
    NoDatabaseSelected,

    /// The referenced database does not exist.
    #[error("database '{name}' does not exist")]
    DatabaseDoesNotExist {
        /// The missing database.
        name: String,
    },

    /// CREATE DATABASE collided with an existing name.
    #[error("database '{name}' already exists")]
    DatabaseAlreadyExists {
        /// The conflicting database.
        name: String,
    },

    /// The referenced table does not exist.
    #[error("table '{name}' does not exist")]
    TableDoesNotExist {
        /// The missing table.
        name: String,
    },

    /// CREATE TABLE collided with an existing name.
    #[error("table '{name}' already exists")]
    TableAlreadyExists {
        /// The conflicting table.
        name: String,
    },

    /// The referenced column does not exist.
    #[error("column '{name}' does not exist")]
    ColumnDoesNotExist {
        /// The missing column.
        name: String,
    },

    /// A column was referenced more than once in one statement.
    #[error("column '{name}' is duplicated")]
    DuplicatedColumn {
        /// The repeated column.
        name: String,
    },

    /// A column reference could not be resolved against the statement's
    /// data sources.
    #[error("invalid column '{name}'")]
    InvalidColumn {
        /// The offending column reference.
        name: String,
    },

    /// An ordered scan was requested on a column with no index.
    #[error("column '{name}' is not indexed")]
    ColumnNotIndexed {
        /// The unindexed column.
        name: String,
    },

    /// CREATE INDEX targeted the primary key or an already-indexed
    /// column.
    #[error("index already exists on column '{name}'")]
    IndexAlreadyExists {
        /// The already-indexed column.
        name: String,
    },

    /// An UPSERT row did not provide the primary key column.
    #[error("primary key can not be null")]
    PkCannotBeNull,

    /// CREATE TABLE named a primary key that is not among its columns.
    #[error("invalid primary key '{name}'")]
    InvalidPk {
        /// The offending primary key name.
        name: String,
    },

    /// An UPSERT row's value count did not match its column list.
    #[error("invalid number of values: expected {expected}, got {actual}")]
    InvalidNumberOfValues {
        /// Number of listed columns.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// No column of the join target is bound by the join condition.
    #[error("joint column not found")]
    JointColumnNotFound,

    /// The join condition binds conflicting columns of the join target.
    #[error("invalid joint column")]
    InvalidJointColumn,

    /// ORDER BY named more than one column, a non-table source, or a
    /// column that is neither the primary key nor indexed.
    #[error("order by is limited to one indexed column of a table source")]
    LimitedOrderBy,

    /// A reserved statement or expression form was used.
    #[error("{operation} is not yet supported")]
    NotYetSupported {
        /// The reserved operation.
        operation: &'static str,
    },

    /// A value was used where its type is not compatible.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Expected type name.
        expected: &'static str,
        /// Actual type name.
        actual: &'static str,
    },

    /// A named placeholder had no bound value.
    #[error("parameter '{name}' is not bound")]
    UnboundParameter {
        /// The unbound parameter.
        name: String,
    },

    /// A value encoded as a key exceeded the per-type maximum.
    #[error("encoded key value exceeds {max} bytes")]
    MaxKeyValExceeded {
        /// Maximum encoded size for the type.
        max: usize,
    },

    /// Persisted bytes could not be decoded.
    #[error("corrupted entry: {reason}")]
    Corruption {
        /// What failed to decode.
        reason: String,
    },

    /// An error bubbled up from the underlying store.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SqlError {
    /// Creates a corruption error.
    #[must_use]
    pub fn corruption(reason: impl Into<String>) -> Self {
        Self::Corruption {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SqlError::DatabaseDoesNotExist {
            name: "db1".into(),
        };
        assert_eq!(err.to_string(), "database 'db1' does not exist");

        let err = SqlError::InvalidNumberOfValues {
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid number of values: expected 2, got 3"
        );
    }

    #[test]
    fn test_store_error_wraps_transparently() {
        let err: SqlError = StoreError::EmptyTransaction.into();
        assert_eq!(err.to_string(), "transaction contains no entries");
    }
}
