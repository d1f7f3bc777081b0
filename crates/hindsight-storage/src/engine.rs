//! StorageEngine: owns the write connection and the read pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use hindsight_core::config::StorageConfig;
use hindsight_core::errors::HindsightResult;
use hindsight_core::SchemaRegistry;

use crate::migrations;
use crate::pool::{DatabaseLocation, ReadPool, WriteConnection};
use crate::recorder::Recorder;

pub struct StorageEngine {
    writer: Arc<WriteConnection>,
    readers: Arc<ReadPool>,
    path: Option<PathBuf>,
}

impl StorageEngine {
    /// Open a file-backed store with default settings.
    pub fn open(path: &Path) -> HindsightResult<Self> {
        Self::open_with_config(path, &StorageConfig::default())
    }

    pub fn open_with_config(path: &Path, config: &StorageConfig) -> HindsightResult<Self> {
        let location = DatabaseLocation::File(path.to_path_buf());
        // The writer must migrate before read-only connections can see the tables.
        let writer = WriteConnection::open_at(&location, config)?;
        writer.with_conn_sync(migrations::run_migrations)?;
        let readers = ReadPool::open_at(&location, config)?;

        info!("storage opened at {}", path.display());
        Ok(Self {
            writer: Arc::new(writer),
            readers: Arc::new(readers),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory store. Readers share it through a named
    /// shared-cache database that lives as long as any connection does.
    pub fn open_in_memory() -> HindsightResult<Self> {
        Self::open_in_memory_with_config(&StorageConfig::default())
    }

    pub fn open_in_memory_with_config(config: &StorageConfig) -> HindsightResult<Self> {
        let uri = format!(
            "file:hindsight_mem_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4().simple()
        );
        let location = DatabaseLocation::Memory(uri);
        let writer = WriteConnection::open_at(&location, config)?;
        writer.with_conn_sync(migrations::run_migrations)?;
        let readers = ReadPool::open_at(&location, config)?;

        Ok(Self {
            writer: Arc::new(writer),
            readers: Arc::new(readers),
            path: None,
        })
    }

    pub fn writer(&self) -> Arc<WriteConnection> {
        Arc::clone(&self.writer)
    }

    pub fn readers(&self) -> Arc<ReadPool> {
        Arc::clone(&self.readers)
    }

    /// `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// A recorder writing through this engine's write connection.
    pub fn recorder(&self, schema: Arc<SchemaRegistry>) -> Recorder {
        Recorder::new(self.writer(), schema)
    }

    pub fn schema_version(&self) -> HindsightResult<u32> {
        self.writer.with_conn_sync(migrations::current_version)
    }
}
