//! LIMIT truncation.

use crate::error::SqlResult;

use super::{Row, RowReader};

/// Yields at most a fixed number of rows.
pub struct LimitRowReader {
    inner: Box<dyn RowReader>,
    remaining: u64,
}

impl LimitRowReader {
    /// Wraps a reader with a maximum row count.
    #[must_use]
    pub fn new(inner: Box<dyn RowReader>, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
        }
    }
}

impl RowReader for LimitRowReader {
    fn next(&mut self) -> SqlResult<Option<Row>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        match self.inner.next()? {
            Some(row) => {
                self.remaining -= 1;
                Ok(Some(row))
            }
            None => {
                self.remaining = 0;
                Ok(None)
            }
        }
    }
}
