//! v001: schema_version bookkeeping and the append-only version log.

use rusqlite::Connection;

use hindsight_core::errors::HindsightResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> HindsightResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        );

        CREATE TABLE IF NOT EXISTS versions (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            item_type  TEXT NOT NULL,
            item_id    INTEGER NOT NULL,
            event      TEXT NOT NULL CHECK (event IN ('create', 'update', 'destroy')),
            object     TEXT,
            created_at TEXT NOT NULL,
            whodunnit  TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_versions_item_time
            ON versions(item_type, item_id, created_at, id);
        CREATE INDEX IF NOT EXISTS idx_versions_type_time
            ON versions(item_type, created_at);
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(())
}
