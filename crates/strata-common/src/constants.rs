//! System-wide constants for StrataDB.
//!
//! These limits bound what the SQL layer will hand to the underlying
//! store; the store may impose stricter limits of its own.

// =============================================================================
// Key and Value Limits
// =============================================================================

/// Maximum total key size in bytes handed to the store (16 KB).
pub const MAX_KEY_SIZE: usize = 16 * 1024;

/// Maximum value (row payload) size in bytes (1 MB).
pub const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// Maximum raw length of a variable-size value (VARCHAR/BLOB) when it is
/// encoded as part of a key.
///
/// Var-size key encodings carry a 4-byte length prefix; bounding the raw
/// length keeps every index key within a fixed envelope so descending
/// scans can start from a known maximum.
pub const MAX_VAR_KEY_SIZE: usize = 256;

/// Size in bytes of an encoded identifier (big-endian u64).
pub const ENCODED_ID_SIZE: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_consistent() {
        assert!(MAX_VAR_KEY_SIZE + 4 < MAX_KEY_SIZE);
        assert!(ENCODED_ID_SIZE == std::mem::size_of::<u64>());
    }
}
