//! Raw index scans.
//!
//! The bottom of every pipeline: a cursor over one index of one table.
//! Primary-index keys carry the row payload directly; secondary-index
//! keys are empty and end in the encoded primary key, which is followed
//! by a point lookup to materialize the row.

use strata_common::types::ColumnId;
use strata_store::Snapshot;

use crate::catalog::Table;
use crate::codec::{decode_row_payload, encode_id, encoded_key_len, ROW_PREFIX};
use crate::error::{SqlError, SqlResult};
use crate::stmt::Comparison;
use crate::value::SqlType;

use super::{Row, RowReader};

/// Scans one index of a table in key order.
pub struct RawRowReader {
    snap: Snapshot,
    cursor: strata_store::Cursor,
    table: Table,
    db_name: String,
    /// Length of the key prefix up to (and excluding) the encoded value.
    base_len: usize,
    /// Full key prefix of the primary index, for point lookups.
    pk_key_base: Vec<u8>,
    scan_type: SqlType,
    is_pk_scan: bool,
    init_key_val: Vec<u8>,
    exclude_init: bool,
}

impl RawRowReader {
    /// Opens a scan over the index of `col_id`.
    ///
    /// `cmp` fixes the direction: `Lower*` scans descend, `Greater*`
    /// ascend, `EqualTo` probes the keys carrying exactly
    /// `init_key_val`. With `exclude_init`, rows whose indexed value
    /// equals `init_key_val` are skipped (strict comparisons).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        snap: Snapshot,
        key_prefix: Vec<u8>,
        db_name: String,
        table: Table,
        col_id: ColumnId,
        cmp: Comparison,
        init_key_val: Vec<u8>,
        exclude_init: bool,
    ) -> SqlResult<Self> {
        let col = table
            .column_by_id(col_id)
            .ok_or_else(|| SqlError::corruption("scan column missing from table"))?;
        let scan_type = col.sql_type();
        let pk = table.pk_column();
        let is_pk_scan = col_id == pk.id();

        let db_id = encode_id(table.database_id().as_u64());
        let table_id = encode_id(table.id().as_u64());

        let base: Vec<u8> = [
            key_prefix.as_slice(),
            ROW_PREFIX,
            db_id.as_slice(),
            table_id.as_slice(),
            encode_id(col_id.as_u64()).as_slice(),
        ]
        .concat();

        let pk_key_base: Vec<u8> = [
            key_prefix.as_slice(),
            ROW_PREFIX,
            db_id.as_slice(),
            table_id.as_slice(),
            encode_id(pk.id().as_u64()).as_slice(),
        ]
        .concat();

        let cursor = match cmp {
            // A probe is a scan bounded to the one encoded value; on a
            // secondary index duplicates share it and differ only in
            // their pk suffix.
            Comparison::EqualTo => {
                let prefix: Vec<u8> = [base.as_slice(), init_key_val.as_slice()].concat();
                snap.scan(&prefix, b"", true)
            }
            Comparison::GreaterThan | Comparison::GreaterOrEqualTo => {
                let seek: Vec<u8> = if init_key_val.is_empty() {
                    Vec::new()
                } else {
                    [base.as_slice(), init_key_val.as_slice()].concat()
                };
                snap.scan(&base, &seek, true)
            }
            Comparison::LowerThan | Comparison::LowerOrEqualTo => {
                let seek: Vec<u8> = if init_key_val.is_empty() {
                    Vec::new()
                } else if is_pk_scan {
                    [base.as_slice(), init_key_val.as_slice()].concat()
                } else {
                    // Secondary keys extend the value with the pk
                    // encoding; pad the seek key above any extension so
                    // rows equal to the start value are reached.
                    let pad = vec![0xFF; crate::codec::max_key_len(pk.sql_type()) + 1];
                    [base.as_slice(), init_key_val.as_slice(), pad.as_slice()].concat()
                };
                snap.scan(&base, &seek, false)
            }
        };

        Ok(Self {
            snap,
            cursor,
            base_len: base.len(),
            pk_key_base,
            db_name,
            table,
            scan_type,
            is_pk_scan,
            init_key_val,
            exclude_init,
        })
    }

    fn decode_row(&self, payload: &[u8]) -> SqlResult<Row> {
        let cols = decode_row_payload(payload, |name| {
            self.table.column_by_name(name).map(|c| c.sql_type())
        })?;

        let mut row = Row::new();
        for (name, value) in cols {
            row.insert(
                format!("{}.{}.{name}", self.db_name, self.table.name()),
                value,
            );
        }
        Ok(row)
    }
}

impl RowReader for RawRowReader {
    fn next(&mut self) -> SqlResult<Option<Row>> {
        loop {
            let Some((key, value)) = self.cursor.next() else {
                return Ok(None);
            };
            let suffix = &key.as_bytes()[self.base_len..];

            if self.is_pk_scan {
                if self.exclude_init && suffix == self.init_key_val {
                    continue;
                }
                return self.decode_row(value.as_bytes()).map(Some);
            }

            let val_len = encoded_key_len(suffix, self.scan_type)?;
            if self.exclude_init && &suffix[..val_len] == self.init_key_val.as_slice() {
                continue;
            }

            let pk_enc = &suffix[val_len..];
            if pk_enc.is_empty() {
                return Err(SqlError::corruption("secondary entry has no pk suffix"));
            }

            let pk_key: Vec<u8> = [self.pk_key_base.as_slice(), pk_enc].concat();
            let payload = self
                .snap
                .get(&pk_key)
                .ok_or_else(|| SqlError::corruption("dangling secondary-index entry"))?;

            return self.decode_row(payload.as_bytes()).map(Some);
        }
    }
}
