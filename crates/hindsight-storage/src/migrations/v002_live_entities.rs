//! v002: current-state rows for every tracked kind.

use rusqlite::Connection;

use hindsight_core::errors::HindsightResult;

use crate::to_storage_err;

pub fn migrate(conn: &Connection) -> HindsightResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS live_entities (
            item_type  TEXT NOT NULL,
            item_id    INTEGER NOT NULL,
            attributes TEXT NOT NULL,
            PRIMARY KEY (item_type, item_id)
        ) WITHOUT ROWID;
        ",
    )
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(())
}
