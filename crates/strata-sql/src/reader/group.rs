//! GROUP BY run collapsing.
//!
//! Aggregation is not executed here; grouping collapses consecutive
//! rows with equal group-by values into one representative row, so the
//! stage exists in the pipeline and HAVING applies to grouped rows.
//! The supported ORDER BY forms make equal values adjacent.

use crate::error::SqlResult;
use crate::stmt::expr::{ColSelector, EvalContext};
use crate::value::Value;

use super::{Row, RowReader};

/// Collapses consecutive rows with equal group-by column values.
pub struct GroupRowReader {
    inner: Box<dyn RowReader>,
    group_by: Vec<ColSelector>,
    ctx: EvalContext,
    current: Option<Vec<Value>>,
}

impl GroupRowReader {
    /// Wraps a reader with a group-by column list.
    #[must_use]
    pub fn new(inner: Box<dyn RowReader>, group_by: Vec<ColSelector>, ctx: EvalContext) -> Self {
        Self {
            inner,
            group_by,
            ctx,
            current: None,
        }
    }

    fn group_key(&self, row: &Row) -> SqlResult<Vec<Value>> {
        self.group_by
            .iter()
            .map(|sel| {
                row.value_for(sel, self.ctx.implicit_db.as_deref())
                    .map(Value::clone)
            })
            .collect()
    }
}

impl RowReader for GroupRowReader {
    fn next(&mut self) -> SqlResult<Option<Row>> {
        loop {
            let Some(row) = self.inner.next()? else {
                return Ok(None);
            };
            let key = self.group_key(&row)?;
            if self.current.as_ref() == Some(&key) {
                continue;
            }
            self.current = Some(key);
            return Ok(Some(row));
        }
    }
}
