//! Storage subsystem configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the SQLite version store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of read connections in the pool.
    pub read_pool_size: usize,
    pub busy_timeout_ms: u64,
    /// Ignored for in-memory databases.
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            read_pool_size: 4,
            busy_timeout_ms: 5000,
            wal_mode: true,
        }
    }
}
