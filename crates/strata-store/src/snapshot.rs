//! Consistent read snapshots and lazy scan cursors.
//!
//! A snapshot is an immutable view of the store's keyspace as of a
//! transaction id. Cursors step through the snapshot one entry per call;
//! no part of the keyspace is materialized up front, and dropping a
//! cursor or snapshot releases the shared view.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use strata_common::types::{Key, TxId, Value};

/// A read-consistent view of the store at a transaction id.
///
/// Snapshots are immutable: writes applied after the snapshot was taken
/// are not visible through it. Within a snapshot, iteration over any
/// prefix is strictly lexicographic.
#[derive(Debug, Clone)]
pub struct Snapshot {
    entries: Arc<BTreeMap<Key, Value>>,
    tx_id: TxId,
}

impl Snapshot {
    pub(crate) fn new(entries: Arc<BTreeMap<Key, Value>>, tx_id: TxId) -> Self {
        Self { entries, tx_id }
    }

    /// Returns the transaction id this snapshot was taken at.
    #[must_use]
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// Point lookup.
    #[must_use]
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    /// Opens a cursor over all keys starting with `prefix`.
    ///
    /// `seek_key` is the full key to start at (inclusive) and must itself
    /// extend `prefix`; an empty `seek_key` starts at the low end of the
    /// prefix range for ascending cursors and at the high end for
    /// descending ones.
    #[must_use]
    pub fn scan(&self, prefix: &[u8], seek_key: &[u8], ascending: bool) -> Cursor {
        Cursor {
            entries: Arc::clone(&self.entries),
            prefix: Key::from_bytes(prefix),
            ascending,
            state: CursorState::Pending(Key::from_bytes(seek_key)),
        }
    }

    /// Returns the number of entries visible in this snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the snapshot holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug)]
enum CursorState {
    /// Not yet positioned; holds the seek key.
    Pending(Key),
    /// Last key handed out.
    After(Key),
    /// Past the end of the prefix range.
    Exhausted,
}

/// A lazy cursor over one prefix of a [`Snapshot`].
///
/// Each `next` call performs one ordered-map probe; nothing is buffered.
#[derive(Debug)]
pub struct Cursor {
    entries: Arc<BTreeMap<Key, Value>>,
    prefix: Key,
    ascending: bool,
    state: CursorState,
}

impl Cursor {
    /// Advances the cursor, returning the next entry in scan order or
    /// `None` once the prefix range is exhausted.
    pub fn next(&mut self) -> Option<(Key, Value)> {
        let found = match std::mem::replace(&mut self.state, CursorState::Exhausted) {
            CursorState::Pending(seek) => self.first(&seek),
            CursorState::After(last) => self.step(&last),
            CursorState::Exhausted => None,
        };

        match found {
            Some((key, value)) if key.starts_with(&self.prefix) => {
                self.state = CursorState::After(key.clone());
                Some((key, value))
            }
            _ => None,
        }
    }

    fn first(&self, seek: &Key) -> Option<(Key, Value)> {
        if self.ascending {
            let low = if seek.as_bytes() < self.prefix.as_bytes() {
                self.prefix.clone()
            } else {
                seek.clone()
            };
            self.entry_at((Bound::Included(low), Bound::Unbounded), true)
        } else if seek.is_empty() {
            // Start from the high end of the prefix range.
            match self.prefix.prefix_end() {
                Some(end) => self.entry_at((Bound::Unbounded, Bound::Excluded(end)), false),
                None => self.entry_at((Bound::Unbounded, Bound::Unbounded), false),
            }
        } else {
            self.entry_at((Bound::Unbounded, Bound::Included(seek.clone())), false)
        }
    }

    fn step(&self, last: &Key) -> Option<(Key, Value)> {
        if self.ascending {
            self.entry_at((Bound::Excluded(last.clone()), Bound::Unbounded), true)
        } else {
            self.entry_at((Bound::Unbounded, Bound::Excluded(last.clone())), false)
        }
    }

    fn entry_at(&self, range: (Bound<Key>, Bound<Key>), forward: bool) -> Option<(Key, Value)> {
        let mut iter = self.entries.range(range);
        let entry = if forward {
            iter.next()
        } else {
            iter.next_back()
        };
        entry.map(|(k, v)| (k.clone(), v.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_of(pairs: &[(&[u8], &[u8])]) -> Snapshot {
        let entries = pairs
            .iter()
            .map(|(k, v)| (Key::from_bytes(k), Value::from_bytes(v)))
            .collect();
        Snapshot::new(Arc::new(entries), TxId::new(1))
    }

    #[test]
    fn test_get_point_lookup() {
        let snap = snapshot_of(&[(b"a.1", b"x"), (b"a.2", b"y")]);
        assert_eq!(snap.get(b"a.1"), Some(Value::from_bytes(b"x")));
        assert_eq!(snap.get(b"a.3"), None);
    }

    #[test]
    fn test_ascending_scan_is_lexicographic() {
        let snap = snapshot_of(&[(b"a.2", b""), (b"b.1", b""), (b"a.1", b""), (b"a.3", b"")]);
        let mut cursor = snap.scan(b"a.", b"", true);

        let mut keys = Vec::new();
        while let Some((key, _)) = cursor.next() {
            keys.push(key.as_bytes().to_vec());
        }
        assert_eq!(keys, vec![b"a.1".to_vec(), b"a.2".to_vec(), b"a.3".to_vec()]);
    }

    #[test]
    fn test_descending_scan_from_high_end() {
        let snap = snapshot_of(&[(b"a.1", b""), (b"a.2", b""), (b"b.1", b"")]);
        let mut cursor = snap.scan(b"a.", b"", false);

        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.2");
        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.1");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_ascending_scan_with_seek_key() {
        let snap = snapshot_of(&[(b"a.1", b""), (b"a.2", b""), (b"a.3", b"")]);
        let mut cursor = snap.scan(b"a.", b"a.2", true);

        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.2");
        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.3");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_descending_scan_with_seek_key() {
        let snap = snapshot_of(&[(b"a.1", b""), (b"a.2", b""), (b"a.3", b"")]);
        let mut cursor = snap.scan(b"a.", b"a.2", false);

        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.2");
        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.1");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_scan_stops_at_prefix_boundary() {
        let snap = snapshot_of(&[(b"a.\xFF", b""), (b"b.1", b"")]);
        let mut cursor = snap.scan(b"a.", b"", true);

        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a.\xFF");
        assert!(cursor.next().is_none());
    }

    #[test]
    fn test_empty_prefix_scans_everything() {
        let snap = snapshot_of(&[(b"a", b""), (b"b", b"")]);
        let mut cursor = snap.scan(b"", b"", true);
        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"a");
        assert_eq!(cursor.next().unwrap().0.as_bytes(), b"b");
        assert!(cursor.next().is_none());
    }
}
