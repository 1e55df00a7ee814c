//! Key and value byte wrappers.
//!
//! The store is an ordered map of byte keys; these types wrap the raw
//! bytes moving across that boundary. Both are backed by `bytes::Bytes`
//! so snapshots and cursors can hand them out without copying.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Deref;

/// A store key.
///
/// Keys compare lexicographically; every ordering guarantee the SQL
/// layer relies on reduces to byte order of these keys.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Key(Bytes);

impl Key {
    /// Creates an empty key.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Creates a key from a byte slice.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Creates a key from owned bytes.
    #[inline]
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(Bytes::from(vec))
    }

    /// Returns the length of the key in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the key is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the key as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks if this key starts with the given prefix.
    #[inline]
    #[must_use]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.0.starts_with(prefix)
    }

    /// Returns the smallest key strictly greater than every key with
    /// this key as a prefix.
    ///
    /// Used as the exclusive upper bound of prefix scans. Returns `None`
    /// when no such key exists (all bytes are `0xFF`).
    #[must_use]
    pub fn prefix_end(&self) -> Option<Self> {
        let mut bytes = self.0.to_vec();
        while let Some(last) = bytes.last_mut() {
            if *last < 0xFF {
                *last += 1;
                return Some(Self::from_vec(bytes));
            }
            bytes.pop();
        }
        None
    }
}

impl Deref for Key {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Key {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// Key order is byte order, so borrowing as a slice preserves Ord/Eq and
// lets ordered maps be probed with raw bytes.
impl Borrow<[u8]> for Key {
    #[inline]
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl Ord for Key {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for Key {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(0x{})", hex::encode(&self.0[..self.0.len().min(48)]))?;
        if self.0.len() > 48 {
            write!(f, "…")?;
        }
        Ok(())
    }
}

impl From<&[u8]> for Key {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Key {
    #[inline]
    fn from(vec: Vec<u8>) -> Self {
        Self::from_vec(vec)
    }
}

/// A store value.
///
/// Values carry row payloads and catalog entry names; the store treats
/// them as opaque bytes. Secondary-index entries have empty values.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Value(Bytes);

impl Value {
    /// Creates an empty value.
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(Bytes::new())
    }

    /// Creates a value from a byte slice.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Creates a value from owned bytes.
    #[inline]
    #[must_use]
    pub fn from_vec(vec: Vec<u8>) -> Self {
        Self(Bytes::from(vec))
    }

    /// Creates a value from a string.
    #[inline]
    #[must_use]
    pub fn from_str(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// Returns the length of the value in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the value is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the value as a byte slice.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl Deref for Value {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<[u8]> for Value {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({} bytes)", self.0.len())
    }
}

impl From<&[u8]> for Value {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<Vec<u8>> for Value {
    #[inline]
    fn from(vec: Vec<u8>) -> Self {
        Self::from_vec(vec)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ordering_is_lexicographic() {
        let a = Key::from_bytes(b"aaa");
        let b = Key::from_bytes(b"bbb");
        let aa = Key::from_bytes(b"aa");

        assert!(a < b);
        assert!(aa < a);
        assert!(Key::empty() < aa);
    }

    #[test]
    fn test_prefix_end() {
        let key = Key::from_bytes(b"abc");
        assert_eq!(key.prefix_end().unwrap().as_bytes(), b"abd");

        let key = Key::from_bytes(&[0x01, 0xFF]);
        assert_eq!(key.prefix_end().unwrap().as_bytes(), &[0x02]);

        let key = Key::from_bytes(&[0xFF, 0xFF]);
        assert!(key.prefix_end().is_none());
    }

    #[test]
    fn test_prefix_end_bounds_all_extensions() {
        let prefix = Key::from_bytes(b"ROW.");
        let end = prefix.prefix_end().unwrap();
        let extended = Key::from_bytes(b"ROW.\xFF\xFF\xFF");
        assert!(prefix < extended);
        assert!(extended < end);
    }

    #[test]
    fn test_key_prefix_check() {
        let key = Key::from_bytes(b"CATALOG.TABLE.xyz");
        assert!(key.starts_with(b"CATALOG.TABLE."));
        assert!(!key.starts_with(b"CATALOG.INDEX."));
    }

    #[test]
    fn test_value_roundtrip() {
        let value = Value::from_str("db1");
        assert_eq!(value.as_bytes(), b"db1");
        assert_eq!(value.len(), 3);
        assert!(Value::empty().is_empty());
    }
}
