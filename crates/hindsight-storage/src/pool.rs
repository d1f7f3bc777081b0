//! Connection management: one serialized writer, a round-robin read pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use hindsight_core::config::StorageConfig;
use hindsight_core::errors::HindsightResult;

use crate::{to_storage_err, to_unavailable_err};

/// Where the database lives.
#[derive(Debug, Clone)]
pub enum DatabaseLocation {
    File(std::path::PathBuf),
    /// Shared-cache in-memory database addressed by URI.
    Memory(String),
}

impl DatabaseLocation {
    fn open(&self, read_only: bool) -> HindsightResult<Connection> {
        let conn = match self {
            Self::File(path) => {
                if read_only {
                    Connection::open_with_flags(
                        path,
                        OpenFlags::SQLITE_OPEN_READ_ONLY
                            | OpenFlags::SQLITE_OPEN_NO_MUTEX
                            | OpenFlags::SQLITE_OPEN_URI,
                    )
                } else {
                    Connection::open(path)
                }
            }
            Self::Memory(uri) => Connection::open_with_flags(
                uri,
                OpenFlags::SQLITE_OPEN_READ_WRITE
                    | OpenFlags::SQLITE_OPEN_CREATE
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX
                    | OpenFlags::SQLITE_OPEN_URI,
            ),
        };
        conn.map_err(|e| to_unavailable_err(format!("open {self:?}: {e}")))
    }

    fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

fn apply_pragmas(
    conn: &Connection,
    location: &DatabaseLocation,
    config: &StorageConfig,
    read_only: bool,
) -> HindsightResult<()> {
    conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| to_storage_err(format!("busy_timeout: {e}")))?;
    if location.is_file() && config.wal_mode && !read_only {
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")
            .map_err(|e| to_storage_err(format!("journal_mode: {e}")))?;
    }
    if read_only {
        conn.execute_batch("PRAGMA query_only = ON;")
            .map_err(|e| to_storage_err(format!("query_only: {e}")))?;
    }
    Ok(())
}

/// The single write connection. All mutations are serialized through it.
pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn open_at(location: &DatabaseLocation, config: &StorageConfig) -> HindsightResult<Self> {
        let conn = location.open(false)?;
        apply_pragmas(&conn, location, config, false)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the write connection.
    pub fn with_conn_sync<F, T>(&self, f: F) -> HindsightResult<T>
    where
        F: FnOnce(&Connection) -> HindsightResult<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| to_unavailable_err(format!("write connection poisoned: {e}")))?;
        f(&guard)
    }
}

/// Pool of read connections handed out round-robin.
pub struct ReadPool {
    conns: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl ReadPool {
    pub fn open_at(location: &DatabaseLocation, config: &StorageConfig) -> HindsightResult<Self> {
        let size = config.read_pool_size.max(1);
        let mut conns = Vec::with_capacity(size);
        for _ in 0..size {
            let conn = location.open(location.is_file())?;
            apply_pragmas(&conn, location, config, true)?;
            conns.push(Mutex::new(conn));
        }
        debug!("opened read pool with {size} connection(s)");
        Ok(Self {
            conns,
            next: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.conns.len()
    }

    /// Run `f` on the next read connection.
    pub fn with_conn<F, T>(&self, f: F) -> HindsightResult<T>
    where
        F: FnOnce(&Connection) -> HindsightResult<T>,
    {
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.conns.len();
        let guard = self.conns[idx]
            .lock()
            .map_err(|e| to_unavailable_err(format!("read connection {idx} poisoned: {e}")))?;
        f(&guard)
    }
}
