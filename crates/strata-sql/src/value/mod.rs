//! SQL runtime values and column types.
//!
//! Values appear in statements as literals, placeholders, and system
//! functions, and in rows as decoded column data. Literal numbers are
//! unsigned (the grammar has no negative literal); INTEGER columns are
//! nevertheless signed at the storage layer, so literals are range
//! checked at encode time.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column type of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// 64-bit signed integer.
    Integer,
    /// Boolean.
    Boolean,
    /// UTF-8 string (STRING in the grammar).
    Varchar,
    /// Raw bytes.
    Blob,
    /// Microseconds since the Unix epoch.
    Timestamp,
}

impl SqlType {
    /// Returns the persisted name of this type.
    ///
    /// These names are written into CATALOG.COLUMN keys; changing them
    /// is a breaking change to the on-disk layout.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Varchar => "STRING",
            SqlType::Blob => "BLOB",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }

    /// Parses a persisted type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "INTEGER" => Some(SqlType::Integer),
            "BOOLEAN" => Some(SqlType::Boolean),
            "STRING" => Some(SqlType::Varchar),
            "BLOB" => Some(SqlType::Blob),
            "TIMESTAMP" => Some(SqlType::Timestamp),
            _ => None,
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A SQL value.
///
/// `Number`, `Str`, `Bool`, `Blob`, and `Timestamp` are literal forms;
/// `SysFn` names a system function evaluated at read time and `Param` a
/// named placeholder bound at execution time. Neither of the non-literal
/// forms can be encoded directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Unsigned integer literal.
    Number(u64),
    /// String literal.
    Str(String),
    /// Boolean literal.
    Bool(bool),
    /// Byte-string literal.
    Blob(Vec<u8>),
    /// Timestamp, microseconds since the Unix epoch.
    Timestamp(i64),
    /// Named system function, e.g. `NOW`.
    SysFn(String),
    /// Named placeholder, e.g. `@id`.
    Param(String),
}

impl Value {
    /// Returns a short name for the value's runtime type, for error
    /// reporting.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "NUMBER",
            Value::Str(_) => "STRING",
            Value::Bool(_) => "BOOLEAN",
            Value::Blob(_) => "BLOB",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::SysFn(_) => "SYSFN",
            Value::Param(_) => "PARAM",
        }
    }

    /// Returns true for literal forms (everything except `SysFn` and
    /// `Param`).
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        !matches!(self, Value::SysFn(_) | Value::Param(_))
    }

    /// Compares two literal values of compatible types.
    ///
    /// Returns `None` when the types are not comparable (including any
    /// non-literal operand). Numbers and timestamps compare with each
    /// other on the microsecond axis.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Blob(a), Value::Blob(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Number(a), Value::Timestamp(b)) => {
                Some(i64::try_from(*a).map_or(Ordering::Greater, |a| a.cmp(b)))
            }
            (Value::Timestamp(a), Value::Number(b)) => {
                Some(i64::try_from(*b).map_or(Ordering::Less, |b| a.cmp(&b)))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "'{s}'"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Blob(b) => write!(f, "x'{}'", hex::encode(b)),
            Value::Timestamp(t) => write!(f, "ts:{t}"),
            Value::SysFn(name) => write!(f, "{name}()"),
            Value::Param(name) => write!(f, "@{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_roundtrip() {
        for t in [
            SqlType::Integer,
            SqlType::Boolean,
            SqlType::Varchar,
            SqlType::Blob,
            SqlType::Timestamp,
        ] {
            assert_eq!(SqlType::from_name(t.name()), Some(t));
        }
        assert_eq!(SqlType::from_name("FLOAT"), None);
    }

    #[test]
    fn test_compare_same_types() {
        assert_eq!(
            Value::Number(1).compare(&Value::Number(2)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Str("b".into()).compare(&Value::Str("a".into())),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Bool(true).compare(&Value::Bool(true)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_compare_number_with_timestamp() {
        assert_eq!(
            Value::Number(5).compare(&Value::Timestamp(9)),
            Some(Ordering::Less)
        );
        assert_eq!(
            Value::Timestamp(9).compare(&Value::Number(5)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_incompatible_types_do_not_compare() {
        assert_eq!(Value::Number(1).compare(&Value::Str("1".into())), None);
        assert_eq!(Value::Param("p".into()).compare(&Value::Number(1)), None);
    }

    #[test]
    fn test_literal_forms() {
        assert!(Value::Number(1).is_literal());
        assert!(!Value::Param("id".into()).is_literal());
        assert!(!Value::SysFn("NOW".into()).is_literal());
    }
}
