//! The SQL engine: compilation entry point and shared state.
//!
//! An engine owns the catalog (the single piece of shared mutable
//! state), a handle to the store, and the per-instance implicit
//! database. Writes serialize on the compile lock and wait for the
//! store's index to catch up to the last catalog transaction; reads
//! take a snapshot and walk it without further locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use strata_common::config::EngineConfig;
use strata_common::types::TxId;
use strata_store::{KvPair, KvStore};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::error::SqlResult;
use crate::reader::RowReader;
use crate::stmt::expr::EvalContext;
use crate::stmt::{SelectStmt, Stmt};
use crate::value::Value;

/// A SQL engine bound to a store.
///
/// Engines sharing a store must share a catalog too; create one engine
/// per store and hand out references. Statement compilation is
/// serialized per engine; queries run against snapshots concurrently.
pub struct Engine {
    store: Arc<dyn KvStore>,
    catalog: RwLock<Catalog>,
    implicit_db: RwLock<Option<String>>,
    compile_lock: Mutex<()>,
    last_catalog_tx: AtomicU64,
    config: EngineConfig,
}

impl Engine {
    /// Opens an engine over a store, rehydrating the catalog from the
    /// current keyspace.
    pub fn open(store: Arc<dyn KvStore>, config: EngineConfig) -> SqlResult<Self> {
        let snap = store.snapshot()?;
        let catalog = Catalog::rehydrate(&snap, &config.key_prefix)?;
        info!(
            databases = catalog.databases().count(),
            tx = %snap.tx_id(),
            "sql engine opened"
        );

        Ok(Self {
            store,
            catalog: RwLock::new(catalog),
            implicit_db: RwLock::new(None),
            compile_lock: Mutex::new(()),
            last_catalog_tx: AtomicU64::new(snap.tx_id().as_u64()),
            config,
        })
    }

    /// Returns the engine's fixed key prefix.
    #[must_use]
    pub fn key_prefix(&self) -> &[u8] {
        &self.config.key_prefix
    }

    /// Read access to the catalog.
    pub fn catalog(&self) -> RwLockReadGuard<'_, Catalog> {
        self.catalog.read()
    }

    pub(crate) fn catalog_mut(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.catalog.write()
    }

    /// Returns the implicit database, if one is selected.
    #[must_use]
    pub fn implicit_database(&self) -> Option<String> {
        self.implicit_db.read().clone()
    }

    pub(crate) fn set_implicit_database(&self, name: &str) {
        *self.implicit_db.write() = Some(name.to_owned());
    }

    /// Builds a full store key: engine prefix, layout prefix, then the
    /// key parts.
    #[must_use]
    pub fn map_key(&self, label: &[u8], parts: &[&[u8]]) -> Vec<u8> {
        let mut key =
            Vec::with_capacity(self.config.key_prefix.len() + label.len() + parts.len() * 8);
        key.extend_from_slice(&self.config.key_prefix);
        key.extend_from_slice(label);
        for part in parts {
            key.extend_from_slice(part);
        }
        key
    }

    /// Compiles a statement into catalog entries and data entries.
    ///
    /// Both lists are meant to be applied as one store transaction.
    /// Mutating statements wait for the store's index to reach the last
    /// catalog transaction before reading the catalog; the compile lock
    /// is released on every path.
    pub fn compile(&self, stmt: &Stmt) -> SqlResult<(Vec<KvPair>, Vec<KvPair>)> {
        let _guard = self.compile_lock.lock();
        if stmt.is_mutation() {
            self.store
                .wait_indexed(TxId::new(self.last_catalog_tx.load(Ordering::SeqCst)))?;
        }
        stmt.compile(self)
    }

    /// Compiles a statement and applies its output to the store as one
    /// transaction.
    ///
    /// Returns `None` for statements with no store output (USE
    /// DATABASE, plain SELECT validation).
    pub fn exec(&self, stmt: &Stmt) -> SqlResult<Option<TxId>> {
        let (ces, des) = self.compile(stmt)?;
        if ces.is_empty() && des.is_empty() {
            return Ok(None);
        }

        let (n_ces, n_des) = (ces.len(), des.len());
        let mut entries = ces;
        entries.extend(des);
        let tx = self.store.apply(entries)?;

        if stmt.is_ddl() {
            self.last_catalog_tx.store(tx.as_u64(), Ordering::SeqCst);
        }
        debug!(
            %tx,
            catalog_entries = n_ces,
            data_entries = n_des,
            "applied statement"
        );
        Ok(Some(tx))
    }

    /// Resolves a SELECT into a row reader over a fresh snapshot.
    ///
    /// `params` binds the statement's named placeholders. The reader is
    /// lazy; dropping it releases the snapshot.
    pub fn query(
        &self,
        stmt: &SelectStmt,
        params: HashMap<String, Value>,
    ) -> SqlResult<Box<dyn RowReader>> {
        let snap = self.store.snapshot()?;
        let ctx = EvalContext {
            implicit_db: self.implicit_database(),
            params,
            query_time: now_micros(),
        };
        stmt.resolve(self, snap, None, &ctx)
    }
}

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or_default()
}
