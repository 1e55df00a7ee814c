//! Engine configuration structures.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_VAR_KEY_SIZE;

/// Configuration for a SQL engine instance.
///
/// # Example
///
/// ```rust
/// use strata_common::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert!(config.key_prefix.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Fixed prefix prepended to every key the engine generates.
    ///
    /// Lets several engines share one store (multi-tenancy). Must stay
    /// stable for the lifetime of the data: keys written under one
    /// prefix are invisible under another.
    pub key_prefix: Vec<u8>,

    /// Maximum raw length of a VARCHAR/BLOB value encoded as a key.
    pub max_var_key_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_prefix: Vec::new(),
            max_var_key_size: MAX_VAR_KEY_SIZE,
        }
    }
}

impl EngineConfig {
    /// Returns a config with the given key prefix.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<Vec<u8>>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.key_prefix.is_empty());
        assert_eq!(config.max_var_key_size, MAX_VAR_KEY_SIZE);
    }

    #[test]
    fn test_with_key_prefix() {
        let config = EngineConfig::default().with_key_prefix(b"tenant1.".to_vec());
        assert_eq!(config.key_prefix, b"tenant1.");
    }
}
