//! Core identifier types for StrataDB.
//!
//! These types provide type-safe wrappers around numeric identifiers,
//! preventing accidental misuse of different ID types. Catalog ids are
//! dense: they start at 1 within their enclosing scope and are never
//! reused.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! catalog_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Invalid id, used as a sentinel value.
            pub const INVALID: Self = Self(0);

            /// First valid id.
            pub const FIRST: Self = Self(1);

            /// Creates a new id from a raw u64 value.
            #[inline]
            #[must_use]
            pub const fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the raw u64 value.
            #[inline]
            #[must_use]
            pub const fn as_u64(self) -> u64 {
                self.0
            }

            /// Returns the next id.
            #[inline]
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }

            /// Checks if this is a valid id.
            #[inline]
            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 != Self::INVALID.0
            }

            /// Creates an id from bytes (big-endian).
            #[inline]
            #[must_use]
            pub fn from_be_bytes(bytes: [u8; 8]) -> Self {
                Self(u64::from_be_bytes(bytes))
            }

            /// Converts to bytes (big-endian).
            #[inline]
            #[must_use]
            pub fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if *self == Self::INVALID {
                    write!(f, concat!(stringify!($name), "(INVALID)"))
                } else {
                    write!(f, concat!(stringify!($name), "({})"), self.0)
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            #[inline]
            fn from(id: u64) -> Self {
                Self::new(id)
            }
        }

        impl From<$name> for u64 {
            #[inline]
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

catalog_id! {
    /// Database identifier, unique across the engine.
    DatabaseId
}

catalog_id! {
    /// Table identifier, dense within its owning database.
    TableId
}

catalog_id! {
    /// Column identifier, dense within its owning table.
    ColumnId
}

catalog_id! {
    /// Store transaction identifier.
    ///
    /// Transaction ids are allocated monotonically by the store's
    /// transaction counter and are used to:
    /// - Order applied write sets
    /// - Tag read snapshots
    /// - Gate writes on index catch-up
    TxId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_id() {
        let db = DatabaseId::new(42);
        assert_eq!(db.as_u64(), 42);
        assert!(db.is_valid());
        assert!(!DatabaseId::INVALID.is_valid());

        let next = db.next();
        assert_eq!(next.as_u64(), 43);

        let bytes = db.to_be_bytes();
        assert_eq!(DatabaseId::from_be_bytes(bytes), db);
    }

    #[test]
    fn test_first_is_one() {
        assert_eq!(DatabaseId::FIRST.as_u64(), 1);
        assert_eq!(TableId::FIRST.as_u64(), 1);
        assert_eq!(ColumnId::FIRST.as_u64(), 1);
    }

    #[test]
    fn test_ordering() {
        assert!(DatabaseId::new(1) < DatabaseId::new(2));
        assert!(TableId::new(1) < TableId::new(2));
        assert!(ColumnId::new(1) < ColumnId::new(2));
        assert!(TxId::new(1) < TxId::new(2));
    }

    #[test]
    fn test_debug_format() {
        assert_eq!(format!("{:?}", TableId::new(7)), "TableId(7)");
        assert_eq!(format!("{:?}", TableId::INVALID), "TableId(INVALID)");
    }
}
