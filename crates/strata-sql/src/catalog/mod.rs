//! The catalog: in-memory model of databases, tables, columns, and
//! indexes.
//!
//! The catalog is the arena that owns every schema entity; entities
//! refer to their parents by id, never by owning reference. Each level
//! keeps a by-name and a by-id map in lockstep. Ids are dense from 1
//! within their enclosing scope and never reused.
//!
//! On startup the catalog is rehydrated from the store's `CATALOG.*`
//! keyspace; the rehydrated model is byte-for-byte equal to the one that
//! produced the entries.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use strata_common::types::{ColumnId, DatabaseId, TableId};
use strata_store::Snapshot;
use tracing::debug;

use crate::codec::{
    parse_column_key, parse_database_key, parse_index_key, parse_table_key,
    CATALOG_COLUMN_PREFIX, CATALOG_DATABASE_PREFIX, CATALOG_INDEX_PREFIX, CATALOG_TABLE_PREFIX,
};
use crate::error::{SqlError, SqlResult};
use crate::value::SqlType;

/// Column definition supplied to CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColSpec {
    /// Column name.
    pub name: String,
    /// Column type.
    pub sql_type: SqlType,
}

impl ColSpec {
    /// Creates a column spec.
    #[must_use]
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
        }
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    id: ColumnId,
    table_id: TableId,
    database_id: DatabaseId,
    name: String,
    sql_type: SqlType,
}

impl Column {
    /// Returns the column id.
    #[must_use]
    pub fn id(&self) -> ColumnId {
        self.id
    }

    /// Returns the column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the column type.
    #[must_use]
    pub fn sql_type(&self) -> SqlType {
        self.sql_type
    }

    /// Returns the owning table id.
    #[must_use]
    pub fn table_id(&self) -> TableId {
        self.table_id
    }
}

/// A table and its columns and indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    id: TableId,
    database_id: DatabaseId,
    name: String,
    pk: ColumnId,
    cols_by_id: BTreeMap<ColumnId, Column>,
    cols_by_name: HashMap<String, ColumnId>,
    indexes: BTreeSet<ColumnId>,
}

impl Table {
    /// Returns the table id.
    #[must_use]
    pub fn id(&self) -> TableId {
        self.id
    }

    /// Returns the owning database id.
    #[must_use]
    pub fn database_id(&self) -> DatabaseId {
        self.database_id
    }

    /// Returns the table name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the primary-key column.
    #[must_use]
    pub fn pk_column(&self) -> &Column {
        self.cols_by_id
            .get(&self.pk)
            .expect("pk column is always present")
    }

    /// Looks a column up by name.
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.cols_by_name
            .get(name)
            .and_then(|id| self.cols_by_id.get(id))
    }

    /// Looks a column up by id.
    #[must_use]
    pub fn column_by_id(&self, id: ColumnId) -> Option<&Column> {
        self.cols_by_id.get(&id)
    }

    /// Returns the columns in id order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.cols_by_id.values()
    }

    /// Returns the secondary-indexed column ids in ascending order.
    #[must_use]
    pub fn indexes(&self) -> &BTreeSet<ColumnId> {
        &self.indexes
    }

    /// Returns true if the column has a secondary index.
    #[must_use]
    pub fn is_indexed(&self, id: ColumnId) -> bool {
        self.indexes.contains(&id)
    }

    /// Records a secondary index on the column.
    pub fn add_index(&mut self, id: ColumnId) {
        self.indexes.insert(id);
    }
}

/// A database and its tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Database {
    id: DatabaseId,
    name: String,
    tables_by_id: BTreeMap<TableId, Table>,
    tables_by_name: HashMap<String, TableId>,
}

impl Database {
    fn new(id: DatabaseId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            tables_by_id: BTreeMap::new(),
            tables_by_name: HashMap::new(),
        }
    }

    /// Returns the database id.
    #[must_use]
    pub fn id(&self) -> DatabaseId {
        self.id
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if a table with the given name exists.
    #[must_use]
    pub fn exists_table(&self, name: &str) -> bool {
        self.tables_by_name.contains_key(name)
    }

    /// Looks a table up by name.
    #[must_use]
    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables_by_name
            .get(name)
            .and_then(|id| self.tables_by_id.get(id))
    }

    /// Looks a table up by name, mutably.
    pub fn table_by_name_mut(&mut self, name: &str) -> Option<&mut Table> {
        let id = *self.tables_by_name.get(name)?;
        self.tables_by_id.get_mut(&id)
    }

    /// Returns the tables in id order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables_by_id.values()
    }

    fn next_table_id(&self) -> TableId {
        self.tables_by_id
            .last_key_value()
            .map_or(TableId::FIRST, |(id, _)| id.next())
    }

    /// Creates a table with a dense id, its columns, and its primary
    /// key.
    pub fn new_table(&mut self, name: &str, cols: &[ColSpec], pk: &str) -> SqlResult<&Table> {
        if self.exists_table(name) {
            return Err(SqlError::TableAlreadyExists { name: name.into() });
        }

        let table_id = self.next_table_id();
        let mut cols_by_id = BTreeMap::new();
        let mut cols_by_name = HashMap::new();
        let mut col_id = ColumnId::FIRST;

        for spec in cols {
            if cols_by_name.contains_key(&spec.name) {
                return Err(SqlError::DuplicatedColumn {
                    name: spec.name.clone(),
                });
            }
            cols_by_name.insert(spec.name.clone(), col_id);
            cols_by_id.insert(
                col_id,
                Column {
                    id: col_id,
                    table_id,
                    database_id: self.id,
                    name: spec.name.clone(),
                    sql_type: spec.sql_type,
                },
            );
            col_id = col_id.next();
        }

        let pk_id = *cols_by_name
            .get(pk)
            .ok_or_else(|| SqlError::InvalidPk { name: pk.into() })?;

        let table = Table {
            id: table_id,
            database_id: self.id,
            name: name.into(),
            pk: pk_id,
            cols_by_id,
            cols_by_name,
            indexes: BTreeSet::new(),
        };

        self.tables_by_name.insert(name.into(), table_id);
        self.tables_by_id.insert(table_id, table);
        Ok(&self.tables_by_id[&table_id])
    }
}

/// The catalog of all databases known to an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    dbs_by_id: BTreeMap<DatabaseId, Database>,
    dbs_by_name: HashMap<String, DatabaseId>,
}

impl Catalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a database with the given name exists.
    #[must_use]
    pub fn exists_database(&self, name: &str) -> bool {
        self.dbs_by_name.contains_key(name)
    }

    /// Looks a database up by name.
    #[must_use]
    pub fn database_by_name(&self, name: &str) -> Option<&Database> {
        self.dbs_by_name
            .get(name)
            .and_then(|id| self.dbs_by_id.get(id))
    }

    /// Looks a database up by name, mutably.
    pub fn database_by_name_mut(&mut self, name: &str) -> Option<&mut Database> {
        let id = *self.dbs_by_name.get(name)?;
        self.dbs_by_id.get_mut(&id)
    }

    /// Looks a database up by id.
    #[must_use]
    pub fn database_by_id(&self, id: DatabaseId) -> Option<&Database> {
        self.dbs_by_id.get(&id)
    }

    /// Returns the databases in id order.
    pub fn databases(&self) -> impl Iterator<Item = &Database> {
        self.dbs_by_id.values()
    }

    fn next_database_id(&self) -> DatabaseId {
        self.dbs_by_id
            .last_key_value()
            .map_or(DatabaseId::FIRST, |(id, _)| id.next())
    }

    /// Creates a database with a dense id.
    pub fn new_database(&mut self, name: &str) -> SqlResult<&Database> {
        if self.exists_database(name) {
            return Err(SqlError::DatabaseAlreadyExists { name: name.into() });
        }

        let id = self.next_database_id();
        self.dbs_by_name.insert(name.into(), id);
        self.dbs_by_id.insert(id, Database::new(id, name));
        Ok(&self.dbs_by_id[&id])
    }

    /// Reconstructs the catalog from the `CATALOG.*` keyspace of a
    /// snapshot.
    ///
    /// Entries are loaded in dependency order: databases, then columns,
    /// then tables (so the primary key can be identified), then
    /// indexes. `key_prefix` is the engine's fixed key prefix, stripped
    /// from every key before parsing.
    pub fn rehydrate(snap: &Snapshot, key_prefix: &[u8]) -> SqlResult<Self> {
        let mut catalog = Catalog::new();
        let scan = |label: &[u8]| {
            let full: Vec<u8> = [key_prefix, label].concat();
            (snap.scan(&full, b"", true), full.len())
        };

        // Databases.
        let (mut cursor, skip) = scan(CATALOG_DATABASE_PREFIX);
        while let Some((key, value)) = cursor.next() {
            let id = parse_database_key(&key.as_bytes()[skip..])?;
            let name = utf8(value.as_bytes(), "database name")?;
            catalog.dbs_by_name.insert(name.clone(), id);
            catalog.dbs_by_id.insert(id, Database::new(id, name));
        }
        debug!(databases = catalog.dbs_by_id.len(), "rehydrated databases");

        // Columns, stashed per table until the table entry arrives.
        type PendingCols = HashMap<(DatabaseId, TableId), Vec<(ColumnId, SqlType, String)>>;
        let mut pending: PendingCols = HashMap::new();
        let (mut cursor, skip) = scan(CATALOG_COLUMN_PREFIX);
        let mut n_cols = 0usize;
        while let Some((key, value)) = cursor.next() {
            let (db_id, table_id, col_id, sql_type) = parse_column_key(&key.as_bytes()[skip..])?;
            let name = utf8(value.as_bytes(), "column name")?;
            pending
                .entry((db_id, table_id))
                .or_default()
                .push((col_id, sql_type, name));
            n_cols += 1;
        }
        debug!(columns = n_cols, "rehydrated columns");

        // Tables.
        let (mut cursor, skip) = scan(CATALOG_TABLE_PREFIX);
        while let Some((key, value)) = cursor.next() {
            let (db_id, table_id, pk_id) = parse_table_key(&key.as_bytes()[skip..])?;
            let name = utf8(value.as_bytes(), "table name")?;
            let cols = pending
                .remove(&(db_id, table_id))
                .ok_or_else(|| SqlError::corruption(format!("table '{name}' has no columns")))?;

            let mut cols_by_id = BTreeMap::new();
            let mut cols_by_name = HashMap::new();
            for (col_id, sql_type, col_name) in cols {
                cols_by_name.insert(col_name.clone(), col_id);
                cols_by_id.insert(
                    col_id,
                    Column {
                        id: col_id,
                        table_id,
                        database_id: db_id,
                        name: col_name,
                        sql_type,
                    },
                );
            }
            if !cols_by_id.contains_key(&pk_id) {
                return Err(SqlError::corruption(format!(
                    "table '{name}' is missing its pk column"
                )));
            }

            let db = catalog
                .dbs_by_id
                .get_mut(&db_id)
                .ok_or_else(|| SqlError::corruption(format!("table '{name}' has no database")))?;
            db.tables_by_name.insert(name.clone(), table_id);
            db.tables_by_id.insert(
                table_id,
                Table {
                    id: table_id,
                    database_id: db_id,
                    name,
                    pk: pk_id,
                    cols_by_id,
                    cols_by_name,
                    indexes: BTreeSet::new(),
                },
            );
        }

        // Indexes.
        let (mut cursor, skip) = scan(CATALOG_INDEX_PREFIX);
        while let Some((key, _)) = cursor.next() {
            let (db_id, table_id, col_id) = parse_index_key(&key.as_bytes()[skip..])?;
            let table = catalog
                .dbs_by_id
                .get_mut(&db_id)
                .and_then(|db| db.tables_by_id.get_mut(&table_id))
                .ok_or_else(|| SqlError::corruption("index entry has no table"))?;
            if !table.cols_by_id.contains_key(&col_id) {
                return Err(SqlError::corruption("index entry has no column"));
            }
            table.indexes.insert(col_id);
        }

        Ok(catalog)
    }
}

fn utf8(bytes: &[u8], what: &str) -> SqlResult<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| SqlError::corruption(format!("{what} is not utf-8")))
}
