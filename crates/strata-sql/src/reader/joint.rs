//! Seek-based joins.
//!
//! Each join is compiled once: the condition is walked over the join
//! target's columns to find the *joint column*, the indexed column (or
//! primary key) the condition equates with an expression over the outer
//! row. Per outer row, that expression's value becomes an `EqualTo`
//! probe into the target's index.

use std::collections::VecDeque;

use strata_store::Snapshot;

use crate::catalog::Table;
use crate::codec::encode_value;
use crate::engine::Engine;
use crate::error::{SqlError, SqlResult};
use crate::stmt::expr::{BoolExp, ColSelector, EvalContext, JointTarget};
use crate::stmt::{Comparison, DataSource, JoinSpec, JoinType};

use super::{RawRowReader, Row, RowReader};

struct CompiledJoin {
    join_type: JoinType,
    db_name: String,
    table: Table,
    /// The target column probed per outer row.
    joint_col: strata_common::types::ColumnId,
    /// Evaluated against the outer row to produce the seek value.
    seek_sel: ColSelector,
    cond: BoolExp,
}

/// Joins an outer reader against one or more data sources.
pub struct JointRowReader {
    snap: Snapshot,
    key_prefix: Vec<u8>,
    left: Box<dyn RowReader>,
    joins: Vec<CompiledJoin>,
    ctx: EvalContext,
    buffer: VecDeque<Row>,
}

impl JointRowReader {
    /// Compiles the join specs and wraps the outer reader.
    ///
    /// Fails with `JointColumnNotFound` when a condition binds no
    /// column of its target, and `InvalidJointColumn` when it binds one
    /// inconsistently. The joint column must be seekable: the target's
    /// primary key or a secondary-indexed column.
    pub fn new(
        engine: &Engine,
        snap: Snapshot,
        left: Box<dyn RowReader>,
        joins: &[JoinSpec],
        ctx: EvalContext,
    ) -> SqlResult<Self> {
        let mut compiled = Vec::with_capacity(joins.len());

        for spec in joins {
            // Seeks are only possible into direct table references.
            let DataSource::Table(table_ref) = &spec.ds else {
                return Err(SqlError::LimitedOrderBy);
            };
            let (db_name, table) = table_ref.referenced_table(engine)?;

            let mut found = None;
            for col in table.columns() {
                if col.id() != table.pk_column().id() && !table.is_indexed(col.id()) {
                    continue;
                }
                let target = JointTarget {
                    db: &db_name,
                    table: table.name(),
                    col: col.name(),
                };
                if let Some(sel) = spec.cond.joint_column_to(&target)? {
                    found = Some((col.id(), sel));
                    break;
                }
            }
            let (joint_col, seek_sel) = found.ok_or(SqlError::JointColumnNotFound)?;

            compiled.push(CompiledJoin {
                join_type: spec.join_type,
                db_name,
                table,
                joint_col,
                seek_sel,
                cond: spec.cond.clone(),
            });
        }

        Ok(Self {
            snap,
            key_prefix: engine.key_prefix().to_vec(),
            left,
            joins: compiled,
            ctx,
            buffer: VecDeque::new(),
        })
    }

    /// Expands one outer row through a join, appending merged rows.
    fn probe(&self, join: &CompiledJoin, row: &Row, out: &mut Vec<Row>) -> SqlResult<()> {
        let seek_val = row
            .value_for(&join.seek_sel, self.ctx.implicit_db.as_deref())?
            .clone();
        let col = join
            .table
            .column_by_id(join.joint_col)
            .ok_or_else(|| SqlError::corruption("joint column missing from table"))?;
        let enc = encode_value(&seek_val, col.sql_type(), true)?;

        let mut right = RawRowReader::new(
            self.snap.clone(),
            self.key_prefix.clone(),
            join.db_name.clone(),
            join.table.clone(),
            join.joint_col,
            Comparison::EqualTo,
            enc,
            false,
        )?;

        let mut matched = false;
        while let Some(right_row) = right.next()? {
            let mut merged = row.clone();
            merged.merge(right_row);
            if join.cond.eval(&merged, &self.ctx)? {
                matched = true;
                out.push(merged);
            }
        }

        // Zero right matches: Left keeps the outer row, Inner and Right
        // drop it.
        if !matched && join.join_type == JoinType::Left {
            out.push(row.clone());
        }
        Ok(())
    }
}

impl RowReader for JointRowReader {
    fn next(&mut self) -> SqlResult<Option<Row>> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Ok(Some(row));
            }

            let Some(left_row) = self.left.next()? else {
                return Ok(None);
            };

            let mut rows = vec![left_row];
            for join in &self.joins {
                let mut expanded = Vec::new();
                for row in &rows {
                    self.probe(join, row, &mut expanded)?;
                }
                rows = expanded;
            }
            self.buffer.extend(rows);
        }
    }
}
