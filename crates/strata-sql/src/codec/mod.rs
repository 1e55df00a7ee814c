//! Order-preserving key and value encoding.
//!
//! Every SQL artefact lives under one of five key prefixes:
//!
//! ```text
//! CATALOG.DATABASE.{dbID}                       → dbName
//! CATALOG.TABLE.{dbID}{tableID}{pkColID}        → tableName
//! CATALOG.COLUMN.{dbID}{tableID}{colID}{type}   → colName
//! CATALOG.INDEX.{dbID}{tableID}{colID}          → tableName
//! ROW.{dbID}{tableID}{colID}[{encVal}]{pkEnc}   → row payload | empty
//! ```
//!
//! Ids are 8-byte big-endian so byte order matches numeric order. Typed
//! values have two encodings: an order-preserving *key* form (signed
//! integers get their sign bit flipped so negatives sort first) and a
//! plain *payload* form that decodes back to the original value. Both
//! forms of a var-size value carry a 4-byte big-endian length prefix, so
//! a shorter string never sorts between a longer one and its extension.
//!
//! This layout is the on-disk contract; changing any prefix or encoding
//! is a breaking change.

use strata_common::constants::MAX_VAR_KEY_SIZE;
use strata_common::types::{ColumnId, DatabaseId, TableId};

use crate::error::{SqlError, SqlResult};
use crate::value::{SqlType, Value};

/// Key prefix of database catalog entries.
pub const CATALOG_DATABASE_PREFIX: &[u8] = b"CATALOG.DATABASE.";
/// Key prefix of table catalog entries.
pub const CATALOG_TABLE_PREFIX: &[u8] = b"CATALOG.TABLE.";
/// Key prefix of column catalog entries.
pub const CATALOG_COLUMN_PREFIX: &[u8] = b"CATALOG.COLUMN.";
/// Key prefix of secondary-index catalog entries.
pub const CATALOG_INDEX_PREFIX: &[u8] = b"CATALOG.INDEX.";
/// Key prefix of row entries (primary and secondary index).
pub const ROW_PREFIX: &[u8] = b"ROW.";

/// Size in bytes of an encoded identifier.
pub const ID_SIZE: usize = 8;

const SIGN_FLIP: u64 = 1 << 63;

// =============================================================================
// Identifier encoding
// =============================================================================

/// Encodes an identifier as 8 big-endian bytes.
///
/// Lexicographic order of encoded ids equals numeric order.
#[inline]
#[must_use]
pub fn encode_id(id: u64) -> [u8; ID_SIZE] {
    id.to_be_bytes()
}

/// Decodes the identifier at the start of `bytes`.
pub fn decode_id(bytes: &[u8]) -> SqlResult<u64> {
    let raw: [u8; ID_SIZE] = bytes
        .get(..ID_SIZE)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| SqlError::corruption("truncated identifier"))?;
    Ok(u64::from_be_bytes(raw))
}

// =============================================================================
// Typed value encoding
// =============================================================================

/// Returns the maximum encoded key length for a type.
#[must_use]
pub const fn max_key_len(sql_type: SqlType) -> usize {
    match sql_type {
        SqlType::Integer | SqlType::Timestamp => 8,
        SqlType::Boolean => 1,
        SqlType::Varchar | SqlType::Blob => 4 + MAX_VAR_KEY_SIZE,
    }
}

/// Returns the greatest possible encoded key value for a type.
///
/// Descending scans with no explicit start key begin here. For var-size
/// types this is an all-`0xFF` envelope: every real encoding starts with
/// a length prefix whose first byte is zero, so the envelope bounds them
/// all.
#[must_use]
pub fn max_key_val(sql_type: SqlType) -> Vec<u8> {
    match sql_type {
        SqlType::Boolean => vec![0x01],
        _ => vec![0xFF; max_key_len(sql_type)],
    }
}

fn as_i64(value: &Value, sql_type: SqlType) -> SqlResult<i64> {
    match value {
        Value::Number(n) => i64::try_from(*n).map_err(|_| SqlError::TypeMismatch {
            expected: sql_type.name(),
            actual: value.type_name(),
        }),
        Value::Timestamp(t) if sql_type == SqlType::Timestamp => Ok(*t),
        Value::Param(name) => Err(SqlError::UnboundParameter { name: name.clone() }),
        _ => Err(SqlError::TypeMismatch {
            expected: sql_type.name(),
            actual: value.type_name(),
        }),
    }
}

fn var_bytes(value: &Value, sql_type: SqlType) -> SqlResult<&[u8]> {
    match (value, sql_type) {
        (Value::Str(s), SqlType::Varchar) => Ok(s.as_bytes()),
        (Value::Blob(b), SqlType::Blob) => Ok(b),
        (Value::Param(name), _) => Err(SqlError::UnboundParameter { name: name.clone() }),
        _ => Err(SqlError::TypeMismatch {
            expected: sql_type.name(),
            actual: value.type_name(),
        }),
    }
}

/// Encodes a typed value.
///
/// With `as_key` the encoding is order-preserving and bounded by
/// [`max_key_len`]; without, it is the payload form decoded by
/// [`decode_value`]. Type compatibility is enforced; `Param` and `SysFn`
/// values cannot be encoded.
pub fn encode_value(value: &Value, sql_type: SqlType, as_key: bool) -> SqlResult<Vec<u8>> {
    match sql_type {
        SqlType::Integer | SqlType::Timestamp => {
            let raw = as_i64(value, sql_type)?;
            let bits = if as_key {
                (raw as u64) ^ SIGN_FLIP
            } else {
                raw as u64
            };
            Ok(bits.to_be_bytes().to_vec())
        }
        SqlType::Boolean => match value {
            Value::Bool(b) => Ok(vec![u8::from(*b)]),
            Value::Param(name) => Err(SqlError::UnboundParameter { name: name.clone() }),
            _ => Err(SqlError::TypeMismatch {
                expected: sql_type.name(),
                actual: value.type_name(),
            }),
        },
        SqlType::Varchar | SqlType::Blob => {
            let raw = var_bytes(value, sql_type)?;
            if as_key && raw.len() > MAX_VAR_KEY_SIZE {
                return Err(SqlError::MaxKeyValExceeded {
                    max: MAX_VAR_KEY_SIZE,
                });
            }
            let mut out = Vec::with_capacity(4 + raw.len());
            out.extend_from_slice(&(raw.len() as u32).to_be_bytes());
            out.extend_from_slice(raw);
            Ok(out)
        }
    }
}

/// Decodes the payload-form value at the start of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_value(bytes: &[u8], sql_type: SqlType) -> SqlResult<(Value, usize)> {
    match sql_type {
        SqlType::Integer | SqlType::Timestamp => {
            let raw = bytes
                .get(..8)
                .and_then(|b| <[u8; 8]>::try_from(b).ok())
                .ok_or_else(|| SqlError::corruption("truncated integer value"))?;
            let signed = i64::from_be_bytes(raw);
            let value = if sql_type == SqlType::Timestamp {
                Value::Timestamp(signed)
            } else {
                let unsigned = u64::try_from(signed)
                    .map_err(|_| SqlError::corruption("negative integer literal"))?;
                Value::Number(unsigned)
            };
            Ok((value, 8))
        }
        SqlType::Boolean => match bytes.first() {
            Some(0x00) => Ok((Value::Bool(false), 1)),
            Some(0x01) => Ok((Value::Bool(true), 1)),
            _ => Err(SqlError::corruption("invalid boolean value")),
        },
        SqlType::Varchar | SqlType::Blob => {
            let len = decode_u32(bytes)? as usize;
            let raw = bytes
                .get(4..4 + len)
                .ok_or_else(|| SqlError::corruption("truncated var-size value"))?;
            let value = if sql_type == SqlType::Varchar {
                let s = std::str::from_utf8(raw)
                    .map_err(|_| SqlError::corruption("string value is not utf-8"))?;
                Value::Str(s.to_owned())
            } else {
                Value::Blob(raw.to_vec())
            };
            Ok((value, 4 + len))
        }
    }
}

/// Returns the length of the key-form encoding at the start of `bytes`.
///
/// Secondary-index keys embed the encoded column value between the
/// column id and the primary-key suffix; this is how the suffix is
/// located.
pub fn encoded_key_len(bytes: &[u8], sql_type: SqlType) -> SqlResult<usize> {
    match sql_type {
        SqlType::Integer | SqlType::Timestamp => {
            if bytes.len() < 8 {
                return Err(SqlError::corruption("truncated integer key"));
            }
            Ok(8)
        }
        SqlType::Boolean => {
            if bytes.is_empty() {
                return Err(SqlError::corruption("truncated boolean key"));
            }
            Ok(1)
        }
        SqlType::Varchar | SqlType::Blob => {
            let len = decode_u32(bytes)? as usize;
            if bytes.len() < 4 + len {
                return Err(SqlError::corruption("truncated var-size key"));
            }
            Ok(4 + len)
        }
    }
}

fn decode_u32(bytes: &[u8]) -> SqlResult<u32> {
    let raw: [u8; 4] = bytes
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| SqlError::corruption("truncated length prefix"))?;
    Ok(u32::from_be_bytes(raw))
}

// =============================================================================
// Row payload
// =============================================================================

/// Encodes a row payload: `u32 n_cols` followed by `{u32 name_len, name,
/// value}` per column.
///
/// Tagging each value with its column name keeps payloads decodable
/// across column additions.
pub fn encode_row_payload(cols: &[(&str, &Value, SqlType)]) -> SqlResult<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(&(cols.len() as u32).to_be_bytes());

    for (name, value, sql_type) in cols {
        out.extend_from_slice(&(name.len() as u32).to_be_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(&encode_value(value, *sql_type, false)?);
    }

    Ok(out)
}

/// Decodes a row payload, resolving each column's type through
/// `type_of`.
///
/// A column name unknown to `type_of` cannot be skipped (value lengths
/// are type-dependent) and is reported as corruption.
pub fn decode_row_payload(
    bytes: &[u8],
    mut type_of: impl FnMut(&str) -> Option<SqlType>,
) -> SqlResult<Vec<(String, Value)>> {
    let n_cols = decode_u32(bytes)? as usize;
    let mut pos = 4;
    let mut cols = Vec::with_capacity(n_cols);

    for _ in 0..n_cols {
        let name_len = decode_u32(bytes.get(pos..).unwrap_or_default())? as usize;
        pos += 4;
        let name = bytes
            .get(pos..pos + name_len)
            .and_then(|b| std::str::from_utf8(b).ok())
            .ok_or_else(|| SqlError::corruption("truncated column name"))?
            .to_owned();
        pos += name_len;

        let sql_type = type_of(&name)
            .ok_or_else(|| SqlError::corruption(format!("unknown column '{name}' in payload")))?;
        let (value, consumed) = decode_value(&bytes[pos..], sql_type)?;
        pos += consumed;

        cols.push((name, value));
    }

    Ok(cols)
}

// =============================================================================
// Catalog key parsing
// =============================================================================

/// Parses the suffix of a `CATALOG.DATABASE.` key.
pub fn parse_database_key(suffix: &[u8]) -> SqlResult<DatabaseId> {
    if suffix.len() != ID_SIZE {
        return Err(SqlError::corruption("malformed database key"));
    }
    Ok(DatabaseId::new(decode_id(suffix)?))
}

/// Parses the suffix of a `CATALOG.TABLE.` key into
/// `(db, table, pk column)`.
pub fn parse_table_key(suffix: &[u8]) -> SqlResult<(DatabaseId, TableId, ColumnId)> {
    if suffix.len() != 3 * ID_SIZE {
        return Err(SqlError::corruption("malformed table key"));
    }
    Ok((
        DatabaseId::new(decode_id(suffix)?),
        TableId::new(decode_id(&suffix[ID_SIZE..])?),
        ColumnId::new(decode_id(&suffix[2 * ID_SIZE..])?),
    ))
}

/// Parses the suffix of a `CATALOG.COLUMN.` key into
/// `(db, table, column, type)`.
pub fn parse_column_key(suffix: &[u8]) -> SqlResult<(DatabaseId, TableId, ColumnId, SqlType)> {
    if suffix.len() <= 3 * ID_SIZE {
        return Err(SqlError::corruption("malformed column key"));
    }
    let type_name = std::str::from_utf8(&suffix[3 * ID_SIZE..])
        .map_err(|_| SqlError::corruption("column type is not utf-8"))?;
    let sql_type = SqlType::from_name(type_name)
        .ok_or_else(|| SqlError::corruption(format!("unknown column type '{type_name}'")))?;
    Ok((
        DatabaseId::new(decode_id(suffix)?),
        TableId::new(decode_id(&suffix[ID_SIZE..])?),
        ColumnId::new(decode_id(&suffix[2 * ID_SIZE..])?),
        sql_type,
    ))
}

/// Parses the suffix of a `CATALOG.INDEX.` key into
/// `(db, table, column)`.
pub fn parse_index_key(suffix: &[u8]) -> SqlResult<(DatabaseId, TableId, ColumnId)> {
    if suffix.len() != 3 * ID_SIZE {
        return Err(SqlError::corruption("malformed index key"));
    }
    Ok((
        DatabaseId::new(decode_id(suffix)?),
        TableId::new(decode_id(&suffix[ID_SIZE..])?),
        ColumnId::new(decode_id(&suffix[2 * ID_SIZE..])?),
    ))
}
