//! Lazy row-reader pipelines.
//!
//! A query resolves into a stack of readers, each a cursor over the one
//! below. Advancing the outermost reader pulls exactly as many rows as
//! needed from the scan at the bottom; dropping it releases the
//! snapshot.

mod filter;
mod group;
mod joint;
mod limit;
mod raw;

pub use filter::FilterRowReader;
pub use group::GroupRowReader;
pub use joint::JointRowReader;
pub use limit::LimitRowReader;
pub use raw::RawRowReader;

use std::collections::BTreeMap;

use crate::error::{SqlError, SqlResult};
use crate::stmt::expr::ColSelector;
use crate::value::Value;

/// A lazy, restart-free cursor of rows.
///
/// `next` yields rows in the order fixed by the underlying scan; errors
/// terminate iteration but do not poison the snapshot. Cancellation is
/// dropping the reader.
pub trait RowReader {
    /// Advances to the next row, or `None` at end of stream.
    fn next(&mut self) -> SqlResult<Option<Row>>;
}

impl std::fmt::Debug for dyn RowReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<dyn RowReader>")
    }
}

/// A materialized row: fully-qualified `db.table.col` names mapped to
/// values.
///
/// Joins merge rows from several tables into one map, which is why
/// names stay qualified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: BTreeMap<String, Value>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column value.
    pub fn insert(&mut self, qualified: impl Into<String>, value: Value) {
        self.values.insert(qualified.into(), value);
    }

    /// Looks a value up by fully-qualified name.
    #[must_use]
    pub fn get(&self, qualified: &str) -> Option<&Value> {
        self.values.get(qualified)
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates the columns in name order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Absorbs another row's columns.
    pub fn merge(&mut self, other: Row) {
        self.values.extend(other.values);
    }

    /// Resolves a column selector against this row.
    ///
    /// Qualified selectors look up their exact `db.table.col` name;
    /// unqualified ones match by column name and must be unambiguous.
    pub fn value_for(&self, sel: &ColSelector, implicit_db: Option<&str>) -> SqlResult<&Value> {
        let db = sel.db.as_deref().or(implicit_db);

        if let Some(table) = sel.table.as_deref() {
            let db = db.ok_or(SqlError::NoDatabaseSelected)?;
            let qualified = format!("{db}.{table}.{}", sel.col);
            return self
                .values
                .get(&qualified)
                .ok_or_else(|| SqlError::ColumnDoesNotExist {
                    name: sel.col.clone(),
                });
        }

        let suffix = format!(".{}", sel.col);
        let mut found = None;
        for (name, value) in &self.values {
            if !name.ends_with(&suffix) {
                continue;
            }
            if let Some(db) = db {
                if !name.starts_with(&format!("{db}.")) {
                    continue;
                }
            }
            if found.is_some() {
                return Err(SqlError::InvalidColumn {
                    name: sel.col.clone(),
                });
            }
            found = Some(value);
        }

        found.ok_or_else(|| SqlError::ColumnDoesNotExist {
            name: sel.col.clone(),
        })
    }
}
