//! WHERE / HAVING filtering.

use crate::error::SqlResult;
use crate::stmt::expr::{BoolExp, EvalContext};

use super::{Row, RowReader};

/// Yields only the rows the predicate accepts.
pub struct FilterRowReader {
    inner: Box<dyn RowReader>,
    predicate: BoolExp,
    ctx: EvalContext,
}

impl FilterRowReader {
    /// Wraps a reader with a predicate.
    #[must_use]
    pub fn new(inner: Box<dyn RowReader>, predicate: BoolExp, ctx: EvalContext) -> Self {
        Self {
            inner,
            predicate,
            ctx,
        }
    }
}

impl RowReader for FilterRowReader {
    fn next(&mut self) -> SqlResult<Option<Row>> {
        loop {
            let Some(row) = self.inner.next()? else {
                return Ok(None);
            };
            if self.predicate.eval(&row, &self.ctx)? {
                return Ok(Some(row));
            }
        }
    }
}
