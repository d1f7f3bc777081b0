//! Migration runner: version tracking, forward-only, transactional per migration.

mod v001_version_log;
mod v002_live_entities;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use hindsight_core::errors::HindsightResult;

use crate::to_storage_err;

/// Total number of migrations.
pub const LATEST_VERSION: u32 = 2;

type MigrationFn = fn(&Connection) -> HindsightResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 2] = [
    (1, "version_log", v001_version_log::migrate),
    (2, "live_entities", v002_live_entities::migrate),
];

/// Get the current schema version from the database.
/// Returns 0 if the schema_version table doesn't exist yet.
pub fn current_version(conn: &Connection) -> HindsightResult<u32> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(|e| to_storage_err(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| to_storage_err(e.to_string()))
}

/// Run all pending migrations. Returns how many were applied.
pub fn run_migrations(conn: &Connection) -> HindsightResult<u32> {
    let current = current_version(conn)?;
    if current >= LATEST_VERSION {
        debug!("database schema is up to date (v{current})");
        return Ok(0);
    }

    info!("running migrations: v{current} → v{LATEST_VERSION}");
    let mut applied = 0;

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| to_storage_err(format!("begin transaction for v{version:03}: {e}")))?;

        let outcome = migrate_fn(conn).and_then(|()| {
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
                .map(|_| ())
                .map_err(|e| to_storage_err(format!("record version v{version:03}: {e}")))
        });

        match outcome {
            Ok(()) => {
                conn.execute_batch("COMMIT")
                    .map_err(|e| to_storage_err(format!("commit v{version:03}: {e}")))?;
                info!("applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(hindsight_core::HindsightError::StorageError(
                    hindsight_core::errors::StorageError::MigrationFailed {
                        version,
                        reason: e.to_string(),
                    },
                ));
            }
        }
    }

    info!("applied {applied} migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}
