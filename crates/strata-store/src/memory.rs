//! The store trait and the in-memory reference implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use strata_common::constants::{MAX_KEY_SIZE, MAX_VALUE_SIZE};
use strata_common::types::{Key, TxId, Value};

use crate::error::{StoreError, StoreResult};
use crate::kv::KvPair;
use crate::snapshot::Snapshot;

/// An append-only, transactional key-value store.
///
/// Implementations must guarantee:
/// - `apply` is atomic: either every entry becomes visible or none does.
/// - Transaction ids are allocated monotonically.
/// - Snapshots are consistent and immutable.
///
/// Stores that index asynchronously report their progress through
/// `indexed_up_to` and block callers in `wait_indexed`; the SQL engine
/// uses the pair as its write-ready signal before reading the catalog
/// for a write statement.
pub trait KvStore: Send + Sync {
    /// Atomically applies a write set, returning its transaction id.
    fn apply(&self, entries: Vec<KvPair>) -> StoreResult<TxId>;

    /// Takes a consistent snapshot of the current keyspace.
    fn snapshot(&self) -> StoreResult<Snapshot>;

    /// Returns the highest transaction id visible to new snapshots.
    fn indexed_up_to(&self) -> TxId;

    /// Blocks until the given transaction has been indexed.
    fn wait_indexed(&self, tx: TxId) -> StoreResult<()>;
}

/// In-memory reference store.
///
/// Keeps the latest entry per key in an ordered map that is swapped
/// copy-on-write under each `apply`, so snapshots are O(1) and never
/// observe partial writes. Indexing is synchronous: a write set is
/// visible to snapshots as soon as `apply` returns.
#[derive(Debug, Default)]
pub struct MemStore {
    index: RwLock<Arc<BTreeMap<Key, Value>>>,
    next_tx: AtomicU64,
}

impl MemStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            index: RwLock::new(Arc::new(BTreeMap::new())),
            next_tx: AtomicU64::new(1),
        }
    }

    fn validate(entries: &[KvPair]) -> StoreResult<()> {
        if entries.is_empty() {
            return Err(StoreError::EmptyTransaction);
        }
        for entry in entries {
            if entry.key.is_empty() {
                return Err(StoreError::EmptyKey);
            }
            if entry.key.len() > MAX_KEY_SIZE {
                return Err(StoreError::KeyTooLarge {
                    size: entry.key.len(),
                    max_size: MAX_KEY_SIZE,
                });
            }
            if entry.value.len() > MAX_VALUE_SIZE {
                return Err(StoreError::ValueTooLarge {
                    size: entry.value.len(),
                    max_size: MAX_VALUE_SIZE,
                });
            }
        }
        Ok(())
    }
}

impl KvStore for MemStore {
    fn apply(&self, entries: Vec<KvPair>) -> StoreResult<TxId> {
        Self::validate(&entries)?;

        let mut index = self.index.write();
        let mut next = (**index).clone();
        for entry in entries {
            next.insert(entry.key, entry.value);
        }
        *index = Arc::new(next);

        Ok(TxId::new(self.next_tx.fetch_add(1, Ordering::SeqCst)))
    }

    fn snapshot(&self) -> StoreResult<Snapshot> {
        let index = self.index.read();
        let tx_id = TxId::new(self.next_tx.load(Ordering::SeqCst).saturating_sub(1));
        Ok(Snapshot::new(Arc::clone(&index), tx_id))
    }

    fn indexed_up_to(&self) -> TxId {
        TxId::new(self.next_tx.load(Ordering::SeqCst).saturating_sub(1))
    }

    fn wait_indexed(&self, _tx: TxId) -> StoreResult<()> {
        // Indexing is synchronous with apply.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(key: &[u8], value: &[u8]) -> KvPair {
        KvPair::new(key, value)
    }

    #[test]
    fn test_apply_and_get() {
        let store = MemStore::new();
        let tx = store
            .apply(vec![pair(b"k1", b"v1"), pair(b"k2", b"v2")])
            .unwrap();
        assert_eq!(tx, TxId::new(1));

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.get(b"k1"), Some(Value::from_bytes(b"v1")));
        assert_eq!(snap.get(b"k2"), Some(Value::from_bytes(b"v2")));
        assert_eq!(snap.tx_id(), TxId::new(1));
    }

    #[test]
    fn test_tx_ids_are_monotonic() {
        let store = MemStore::new();
        let t1 = store.apply(vec![pair(b"a", b"")]).unwrap();
        let t2 = store.apply(vec![pair(b"b", b"")]).unwrap();
        assert!(t2 > t1);
    }

    #[test]
    fn test_snapshot_is_immutable_under_later_writes() {
        let store = MemStore::new();
        store.apply(vec![pair(b"k", b"old")]).unwrap();

        let snap = store.snapshot().unwrap();
        store.apply(vec![pair(b"k", b"new")]).unwrap();

        assert_eq!(snap.get(b"k"), Some(Value::from_bytes(b"old")));
        let fresh = store.snapshot().unwrap();
        assert_eq!(fresh.get(b"k"), Some(Value::from_bytes(b"new")));
    }

    #[test]
    fn test_empty_transaction_is_rejected() {
        let store = MemStore::new();
        assert!(matches!(
            store.apply(Vec::new()),
            Err(StoreError::EmptyTransaction)
        ));
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let store = MemStore::new();
        assert!(matches!(
            store.apply(vec![pair(b"", b"v")]),
            Err(StoreError::EmptyKey)
        ));
    }

    #[test]
    fn test_latest_write_wins_per_key() {
        let store = MemStore::new();
        store.apply(vec![pair(b"k", b"1")]).unwrap();
        store.apply(vec![pair(b"k", b"2")]).unwrap();

        let snap = store.snapshot().unwrap();
        assert_eq!(snap.get(b"k"), Some(Value::from_bytes(b"2")));
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn test_wait_indexed_is_immediate() {
        let store = MemStore::new();
        let tx = store.apply(vec![pair(b"k", b"v")]).unwrap();
        assert_eq!(store.indexed_up_to(), tx);
        store.wait_indexed(tx).unwrap();
    }
}
