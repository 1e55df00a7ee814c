//! SQL statement tree and its compilation into KV write sets.
//!
//! Every statement compiles into two ordered lists of store entries:
//! *catalog entries* (schema changes under `CATALOG.*`) and *data
//! entries* (row and index writes under `ROW.`). The embedder applies
//! both lists as one atomic store transaction.
//!
//! SELECT does not produce entries; its compilation validates the
//! ordering restriction and its resolution (see [`SelectStmt::resolve`])
//! builds the lazy row-reader pipeline.

pub mod expr;

use std::collections::HashMap;

use strata_common::types::ColumnId;
use strata_store::{KvPair, Snapshot};
use tracing::debug;

use crate::catalog::{ColSpec, Table};
use crate::codec::{
    encode_id, encode_row_payload, encode_value, max_key_len, max_key_val,
    CATALOG_COLUMN_PREFIX, CATALOG_DATABASE_PREFIX, CATALOG_INDEX_PREFIX, CATALOG_TABLE_PREFIX,
    ROW_PREFIX,
};
use crate::engine::Engine;
use crate::error::{SqlError, SqlResult};
use crate::reader::{
    FilterRowReader, GroupRowReader, JointRowReader, LimitRowReader, RawRowReader, RowReader,
};
use crate::value::Value;

use self::expr::{BoolExp, ColSelector, EvalContext};

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// A sequence of statements compiled as one transaction.
    Tx(TxStmt),
    /// `CREATE DATABASE db`
    CreateDatabase(CreateDatabaseStmt),
    /// `USE DATABASE db`
    UseDatabase(UseDatabaseStmt),
    /// `USE SNAPSHOT since, up_to` (reserved).
    UseSnapshot(UseSnapshotStmt),
    /// `CREATE TABLE t (cols…, PRIMARY KEY pk)`
    CreateTable(CreateTableStmt),
    /// `CREATE INDEX ON t(col)`
    CreateIndex(CreateIndexStmt),
    /// `ALTER TABLE t ADD COLUMN …` (reserved).
    AddColumn(AddColumnStmt),
    /// `UPSERT INTO t (cols…) VALUES …`
    UpsertInto(UpsertIntoStmt),
    /// `SELECT …`
    Select(Box<SelectStmt>),
}

impl Stmt {
    /// Returns true if the statement changes the catalog.
    #[must_use]
    pub fn is_ddl(&self) -> bool {
        match self {
            Stmt::Tx(tx) => tx.stmts.iter().any(Stmt::is_ddl),
            Stmt::CreateDatabase(_)
            | Stmt::CreateTable(_)
            | Stmt::CreateIndex(_)
            | Stmt::AddColumn(_) => true,
            Stmt::UseDatabase(_) | Stmt::UseSnapshot(_) | Stmt::UpsertInto(_) | Stmt::Select(_) => {
                false
            }
        }
    }

    /// Returns true if compiling the statement produces store entries.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        match self {
            Stmt::Tx(tx) => tx.stmts.iter().any(Stmt::is_mutation),
            Stmt::UpsertInto(_) => true,
            other => other.is_ddl(),
        }
    }

    /// Compiles the statement into catalog entries and data entries.
    pub fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        match self {
            Stmt::Tx(stmt) => stmt.compile(engine),
            Stmt::CreateDatabase(stmt) => stmt.compile(engine),
            Stmt::UseDatabase(stmt) => stmt.compile(engine),
            Stmt::UseSnapshot(stmt) => stmt.compile(engine),
            Stmt::CreateTable(stmt) => stmt.compile(engine),
            Stmt::CreateIndex(stmt) => stmt.compile(engine),
            Stmt::AddColumn(stmt) => stmt.compile(engine),
            Stmt::UpsertInto(stmt) => stmt.compile(engine),
            Stmt::Select(stmt) => stmt.compile(engine).map(|()| (Vec::new(), Vec::new())),
        }
    }
}

/// A sequence of statements compiled as one store transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TxStmt {
    /// The statements, in order.
    pub stmts: Vec<Stmt>,
}

impl TxStmt {
    fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        let mut ces = Vec::new();
        let mut des = Vec::new();
        for stmt in &self.stmts {
            let (cs, ds) = stmt.compile(engine)?;
            ces.extend(cs);
            des.extend(ds);
        }
        Ok((ces, des))
    }
}

/// `CREATE DATABASE db`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDatabaseStmt {
    /// Database name.
    pub db: String,
}

impl CreateDatabaseStmt {
    fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        let mut catalog = engine.catalog_mut();
        let db = catalog.new_database(&self.db)?;

        let ce = KvPair::new(
            engine.map_key(CATALOG_DATABASE_PREFIX, &[&encode_id(db.id().as_u64())]),
            self.db.as_bytes(),
        );
        debug!(db = %self.db, id = %db.id(), "compiled create database");
        Ok((vec![ce], Vec::new()))
    }
}

/// `USE DATABASE db`
///
/// Sets the engine's implicit database. Produces no store entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseDatabaseStmt {
    /// Database name.
    pub db: String,
}

impl UseDatabaseStmt {
    fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        if !engine.catalog().exists_database(&self.db) {
            return Err(SqlError::DatabaseDoesNotExist {
                name: self.db.clone(),
            });
        }
        engine.set_implicit_database(&self.db);
        Ok((Vec::new(), Vec::new()))
    }
}

/// `USE SNAPSHOT since, up_to`: reserved, not yet supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseSnapshotStmt {
    /// Lower transaction bound.
    pub since: Option<u64>,
    /// Upper transaction bound.
    pub up_to: Option<u64>,
}

impl UseSnapshotStmt {
    fn compile(&self, _engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        Err(SqlError::NotYetSupported {
            operation: "USE SNAPSHOT",
        })
    }
}

/// `CREATE TABLE t (cols…, PRIMARY KEY pk)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTableStmt {
    /// Table name.
    pub table: String,
    /// Column definitions, in declaration order.
    pub col_specs: Vec<ColSpec>,
    /// Primary-key column name.
    pub pk: String,
}

impl CreateTableStmt {
    fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        let db_name = engine
            .implicit_database()
            .ok_or(SqlError::NoDatabaseSelected)?;

        let mut catalog = engine.catalog_mut();
        let db = catalog
            .database_by_name_mut(&db_name)
            .ok_or(SqlError::DatabaseDoesNotExist { name: db_name })?;
        let db_id = encode_id(db.id().as_u64());

        let table = db.new_table(&self.table, &self.col_specs, &self.pk)?;
        let table_id = encode_id(table.id().as_u64());

        let mut ces = Vec::new();
        for col in table.columns() {
            ces.push(KvPair::new(
                engine.map_key(
                    CATALOG_COLUMN_PREFIX,
                    &[
                        &db_id,
                        &table_id,
                        &encode_id(col.id().as_u64()),
                        col.sql_type().name().as_bytes(),
                    ],
                ),
                col.name().as_bytes(),
            ));
        }
        ces.push(KvPair::new(
            engine.map_key(
                CATALOG_TABLE_PREFIX,
                &[
                    &db_id,
                    &table_id,
                    &encode_id(table.pk_column().id().as_u64()),
                ],
            ),
            table.name().as_bytes(),
        ));

        debug!(table = %self.table, id = %table.id(), "compiled create table");
        Ok((ces, Vec::new()))
    }
}

/// `CREATE INDEX ON t(col)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateIndexStmt {
    /// Table name.
    pub table: String,
    /// Column to index.
    pub col: String,
}

impl CreateIndexStmt {
    fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        let db_name = engine
            .implicit_database()
            .ok_or(SqlError::NoDatabaseSelected)?;

        let mut catalog = engine.catalog_mut();
        let db = catalog
            .database_by_name_mut(&db_name)
            .ok_or(SqlError::DatabaseDoesNotExist { name: db_name })?;
        let db_id = encode_id(db.id().as_u64());

        let table = db
            .table_by_name_mut(&self.table)
            .ok_or_else(|| SqlError::TableDoesNotExist {
                name: self.table.clone(),
            })?;

        // The primary key carries the implicit primary index.
        if table.pk_column().name() == self.col {
            return Err(SqlError::IndexAlreadyExists {
                name: self.col.clone(),
            });
        }

        let col_id = table
            .column_by_name(&self.col)
            .ok_or_else(|| SqlError::ColumnDoesNotExist {
                name: self.col.clone(),
            })?
            .id();

        if table.is_indexed(col_id) {
            return Err(SqlError::IndexAlreadyExists {
                name: self.col.clone(),
            });
        }
        table.add_index(col_id);

        let ce = KvPair::new(
            engine.map_key(
                CATALOG_INDEX_PREFIX,
                &[
                    &db_id,
                    &encode_id(table.id().as_u64()),
                    &encode_id(col_id.as_u64()),
                ],
            ),
            table.name().as_bytes(),
        );
        debug!(table = %self.table, col = %self.col, "compiled create index");
        Ok((vec![ce], Vec::new()))
    }
}

/// `ALTER TABLE t ADD COLUMN …`: reserved, not yet supported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddColumnStmt {
    /// Table name.
    pub table: String,
    /// Column to add.
    pub col_spec: ColSpec,
}

impl AddColumnStmt {
    fn compile(&self, _engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        Err(SqlError::NotYetSupported {
            operation: "ADD COLUMN",
        })
    }
}

/// One row of an UPSERT.
#[derive(Debug, Clone, PartialEq)]
pub struct RowSpec {
    /// Values, positionally matching the statement's column list.
    pub values: Vec<Value>,
}

/// `UPSERT INTO t (cols…) VALUES (…), …`
///
/// The only row-mutating statement: the store is append-only, so a row
/// write replaces whatever was previously stored under its primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertIntoStmt {
    /// Target table.
    pub table_ref: TableRef,
    /// Column list.
    pub cols: Vec<String>,
    /// Rows to write.
    pub rows: Vec<RowSpec>,
}

impl UpsertIntoStmt {
    /// Validates the column list against the table: every column must
    /// exist, none may repeat, and the primary key must be present.
    ///
    /// Returns the value position of each referenced column id.
    fn validate(&self, table: &Table) -> SqlResult<HashMap<ColumnId, usize>> {
        let mut sel_by_col = HashMap::with_capacity(self.cols.len());
        let mut pk_included = false;

        for (i, name) in self.cols.iter().enumerate() {
            let col = table
                .column_by_name(name)
                .ok_or_else(|| SqlError::InvalidColumn { name: name.clone() })?;

            if table.pk_column().id() == col.id() {
                pk_included = true;
            }
            if sel_by_col.insert(col.id(), i).is_some() {
                return Err(SqlError::DuplicatedColumn { name: name.clone() });
            }
        }

        if !pk_included {
            return Err(SqlError::PkCannotBeNull);
        }
        Ok(sel_by_col)
    }

    fn compile(&self, engine: &Engine) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        let (_, table) = self.table_ref.referenced_table(engine)?;
        let sel_by_col = self.validate(&table)?;

        let db_id = encode_id(table.database_id().as_u64());
        let table_id = encode_id(table.id().as_u64());
        let pk = table.pk_column();

        let mut des = Vec::new();
        for row in &self.rows {
            if row.values.len() != self.cols.len() {
                return Err(SqlError::InvalidNumberOfValues {
                    expected: self.cols.len(),
                    actual: row.values.len(),
                });
            }

            let pk_val = &row.values[sel_by_col[&pk.id()]];
            let pk_enc = encode_value(pk_val, pk.sql_type(), true)?;

            let mut payload_cols = Vec::with_capacity(self.cols.len());
            for (i, name) in self.cols.iter().enumerate() {
                let col = table
                    .column_by_name(name)
                    .ok_or_else(|| SqlError::InvalidColumn { name: name.clone() })?;
                payload_cols.push((col.name(), &row.values[i], col.sql_type()));
            }
            let payload = encode_row_payload(&payload_cols)?;

            // Primary entry, keyed by the encoded primary key.
            des.push(KvPair::new(
                engine.map_key(
                    ROW_PREFIX,
                    &[&db_id, &table_id, &encode_id(pk.id().as_u64()), &pk_enc],
                ),
                payload,
            ));

            // One entry per secondary-indexed column present in the row.
            // The trailing pk encoding disambiguates duplicate values
            // and lets readers recover the primary key directly.
            for &col_id in table.indexes() {
                let Some(&idx) = sel_by_col.get(&col_id) else {
                    continue;
                };
                let col = table
                    .column_by_id(col_id)
                    .ok_or_else(|| SqlError::corruption("indexed column missing from table"))?;
                let enc = encode_value(&row.values[idx], col.sql_type(), true)?;
                des.push(KvPair::key_only(engine.map_key(
                    ROW_PREFIX,
                    &[
                        &db_id,
                        &table_id,
                        &encode_id(col_id.as_u64()),
                        &enc,
                        &pk_enc,
                    ],
                )));
            }
        }

        debug!(
            table = %self.table_ref.table,
            rows = self.rows.len(),
            entries = des.len(),
            "compiled upsert"
        );
        Ok((Vec::new(), des))
    }
}

// =============================================================================
// SELECT
// =============================================================================

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Emit only left rows with at least one right match.
    Inner,
    /// Emit left rows without matches as-is.
    Left,
    /// Emit only matching rows; unmatched right rows are not
    /// discoverable through seeks.
    Right,
}

/// Aggregate function. Accepted and forwarded, not computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    /// `COUNT`
    Count,
    /// `SUM`
    Sum,
    /// `MAX`
    Max,
    /// `MIN`
    Min,
    /// `AVG`
    Avg,
}

/// An output selector of a SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// A plain column.
    Col(ColSelector),
    /// An aggregate over a column (or `COUNT(*)` when `col` is absent).
    Agg {
        /// The aggregate function.
        agg: AggregateFn,
        /// The aggregated column.
        col: Option<ColSelector>,
        /// Output alias.
        alias: Option<String>,
    },
}

/// Scan-direction operator of an ordering column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Single-key probe.
    EqualTo,
    /// Descending, strictly below the start key.
    LowerThan,
    /// Descending from the start key.
    LowerOrEqualTo,
    /// Ascending, strictly above the start key.
    GreaterThan,
    /// Ascending from the start key.
    GreaterOrEqualTo,
}

impl Comparison {
    /// Returns true for ascending scan directions.
    #[must_use]
    pub fn is_ascending(self) -> bool {
        matches!(
            self,
            Comparison::EqualTo | Comparison::GreaterThan | Comparison::GreaterOrEqualTo
        )
    }

    /// Returns true if rows equal to the start key are excluded.
    #[must_use]
    pub fn is_exclusive(self) -> bool {
        matches!(self, Comparison::GreaterThan | Comparison::LowerThan)
    }
}

/// Ordering column of a scan: the column, the direction, and an
/// optional start key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdCol {
    /// The ordering column.
    pub sel: ColSelector,
    /// Scan direction.
    pub cmp: Comparison,
    /// Caller-supplied start key (encoded key form).
    pub init_key_val: Vec<u8>,
    /// Whether `init_key_val` is in effect.
    pub use_init_key_val: bool,
}

impl OrdCol {
    /// Creates an ascending ordering on a column.
    #[must_use]
    pub fn asc(sel: ColSelector) -> Self {
        Self {
            sel,
            cmp: Comparison::GreaterOrEqualTo,
            init_key_val: Vec::new(),
            use_init_key_val: false,
        }
    }

    /// Creates a descending ordering on a column.
    #[must_use]
    pub fn desc(sel: ColSelector) -> Self {
        Self {
            sel,
            cmp: Comparison::LowerOrEqualTo,
            init_key_val: Vec::new(),
            use_init_key_val: false,
        }
    }
}

/// A join of a SELECT against another data source.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinSpec {
    /// Join kind.
    pub join_type: JoinType,
    /// The joined data source.
    pub ds: DataSource,
    /// The join condition.
    pub cond: BoolExp,
}

/// A node that produces rows: a table reference or a nested SELECT.
#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    /// A direct table reference.
    Table(TableRef),
    /// A nested SELECT.
    Select(Box<SelectStmt>),
}

impl DataSource {
    /// Resolves the data source into a row reader.
    pub fn resolve(
        &self,
        engine: &Engine,
        snap: Snapshot,
        ord: Option<&OrdCol>,
        ctx: &EvalContext,
    ) -> SqlResult<Box<dyn RowReader>> {
        match self {
            DataSource::Table(table_ref) => table_ref.resolve(engine, snap, ord),
            DataSource::Select(stmt) => stmt.resolve(engine, snap, ord, ctx),
        }
    }
}

/// A reference to a table, optionally database-qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Database name; defaults to the implicit database.
    pub db: Option<String>,
    /// Table name.
    pub table: String,
    /// Alias.
    pub alias: Option<String>,
}

impl TableRef {
    /// Creates an unqualified table reference.
    #[must_use]
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            db: None,
            table: table.into(),
            alias: None,
        }
    }

    /// Resolves the referenced table: the statement's database if
    /// qualified, the engine's implicit database otherwise.
    ///
    /// Returns the database name and a copy of the table's schema that
    /// stays valid after the catalog lock is released.
    pub fn referenced_table(&self, engine: &Engine) -> SqlResult<(String, Table)> {
        let db_name = match &self.db {
            Some(db) => {
                if !engine.catalog().exists_database(db) {
                    return Err(SqlError::DatabaseDoesNotExist { name: db.clone() });
                }
                db.clone()
            }
            None => engine
                .implicit_database()
                .ok_or(SqlError::NoDatabaseSelected)?,
        };

        let catalog = engine.catalog();
        let db = catalog
            .database_by_name(&db_name)
            .ok_or_else(|| SqlError::DatabaseDoesNotExist {
                name: db_name.clone(),
            })?;
        let table = db
            .table_by_name(&self.table)
            .ok_or_else(|| SqlError::TableDoesNotExist {
                name: self.table.clone(),
            })?;

        Ok((db_name, table.clone()))
    }

    /// Resolves the table into a raw row reader.
    ///
    /// Without an ordering column the primary index is scanned
    /// ascending from the empty key. With one, the ordering column must
    /// belong to this table and be the primary key or secondary-indexed,
    /// and the comparison picks the scan direction and start key.
    pub fn resolve(
        &self,
        engine: &Engine,
        snap: Snapshot,
        ord: Option<&OrdCol>,
    ) -> SqlResult<Box<dyn RowReader>> {
        let (db_name, table) = self.referenced_table(engine)?;

        let mut col_id = table.pk_column().id();
        let mut cmp = Comparison::GreaterOrEqualTo;
        let mut init_key_val = Vec::new();
        let mut exclude_init = false;

        if let Some(ord) = ord {
            if ord.sel.db.as_deref().is_some_and(|db| db != db_name) {
                return Err(SqlError::InvalidColumn {
                    name: ord.sel.col.clone(),
                });
            }
            if ord.sel.table.as_deref().is_some_and(|t| t != table.name()) {
                return Err(SqlError::InvalidColumn {
                    name: ord.sel.col.clone(),
                });
            }

            let col = table.column_by_name(&ord.sel.col).ok_or_else(|| {
                SqlError::ColumnDoesNotExist {
                    name: ord.sel.col.clone(),
                }
            })?;

            // Anything but the pk must carry a secondary index.
            if col.id() != table.pk_column().id() && !table.is_indexed(col.id()) {
                return Err(SqlError::ColumnNotIndexed {
                    name: ord.sel.col.clone(),
                });
            }

            col_id = col.id();
            cmp = ord.cmp;

            if ord.use_init_key_val {
                if ord.init_key_val.len() > max_key_len(col.sql_type()) {
                    return Err(SqlError::IllegalArguments);
                }
                init_key_val = ord.init_key_val.clone();
                exclude_init = cmp.is_exclusive();
            } else if matches!(cmp, Comparison::LowerThan | Comparison::LowerOrEqualTo) {
                init_key_val = max_key_val(col.sql_type());
            }
        }

        Ok(Box::new(RawRowReader::new(
            snap,
            engine.key_prefix().to_vec(),
            db_name,
            table,
            col_id,
            cmp,
            init_key_val,
            exclude_init,
        )?))
    }
}

/// `SELECT …`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    /// DISTINCT flag. Accepted and forwarded.
    pub distinct: bool,
    /// Output selectors.
    pub selectors: Vec<Selector>,
    /// The data source.
    pub ds: DataSource,
    /// Joined sources.
    pub joins: Vec<JoinSpec>,
    /// WHERE predicate.
    pub where_exp: Option<BoolExp>,
    /// GROUP BY columns.
    pub group_by: Vec<ColSelector>,
    /// HAVING predicate.
    pub having: Option<BoolExp>,
    /// Row limit.
    pub limit: Option<u64>,
    /// ORDER BY columns. At most one is supported.
    pub order_by: Vec<OrdCol>,
    /// Statement alias.
    pub alias: Option<String>,
}

impl SelectStmt {
    /// Creates a `SELECT * FROM table` skeleton.
    #[must_use]
    pub fn from_table(table: TableRef) -> Self {
        Self {
            distinct: false,
            selectors: Vec::new(),
            ds: DataSource::Table(table),
            joins: Vec::new(),
            where_exp: None,
            group_by: Vec::new(),
            having: None,
            limit: None,
            order_by: Vec::new(),
            alias: None,
        }
    }

    /// Validates the ordering restriction: ORDER BY may name at most
    /// one column, the source must be a direct table reference, and the
    /// column must be the primary key or secondary-indexed.
    pub fn compile(&self, engine: &Engine) -> SqlResult<()> {
        if self.order_by.len() > 1 {
            return Err(SqlError::LimitedOrderBy);
        }

        if let Some(ord) = self.order_by.first() {
            let DataSource::Table(table_ref) = &self.ds else {
                return Err(SqlError::LimitedOrderBy);
            };
            let (_, table) = table_ref.referenced_table(engine)?;

            let Some(col) = table.column_by_name(&ord.sel.col) else {
                return Err(SqlError::LimitedOrderBy);
            };
            if col.id() != table.pk_column().id() && !table.is_indexed(col.id()) {
                return Err(SqlError::LimitedOrderBy);
            }
        }

        Ok(())
    }

    /// Builds the row-reader pipeline, bottom up:
    ///
    /// ```text
    /// raw scan → joins → where → group by → having → limit
    /// ```
    ///
    /// Each stage is a lazy cursor over the one below; advancing the
    /// outermost reader pulls exactly as many rows as needed.
    pub fn resolve(
        &self,
        engine: &Engine,
        snap: Snapshot,
        ord: Option<&OrdCol>,
        ctx: &EvalContext,
    ) -> SqlResult<Box<dyn RowReader>> {
        // Ordering is only supported at the table level.
        if ord.is_some() {
            return Err(SqlError::LimitedOrderBy);
        }
        self.compile(engine)?;

        let mut reader = self
            .ds
            .resolve(engine, snap.clone(), self.order_by.first(), ctx)?;

        if !self.joins.is_empty() {
            reader = Box::new(JointRowReader::new(
                engine,
                snap,
                reader,
                &self.joins,
                ctx.clone(),
            )?);
        }
        if let Some(where_exp) = &self.where_exp {
            reader = Box::new(FilterRowReader::new(
                reader,
                where_exp.clone(),
                ctx.clone(),
            ));
        }
        if !self.group_by.is_empty() {
            reader = Box::new(GroupRowReader::new(
                reader,
                self.group_by.clone(),
                ctx.clone(),
            ));
        }
        if let Some(having) = &self.having {
            reader = Box::new(FilterRowReader::new(reader, having.clone(), ctx.clone()));
        }
        if let Some(limit) = self.limit {
            reader = Box::new(LimitRowReader::new(reader, limit));
        }

        Ok(reader)
    }
}
