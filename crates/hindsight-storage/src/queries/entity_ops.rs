//! Raw SQL operations for the live_entities table.

use rusqlite::{params, Connection, OptionalExtension};

use hindsight_core::errors::HindsightResult;

use super::json_field_path;
use crate::from_sqlite_err;

/// Insert or replace the current attributes of an entity.
pub fn upsert_live(
    conn: &Connection,
    item_type: &str,
    item_id: i64,
    attributes: &str,
) -> HindsightResult<()> {
    conn.execute(
        "INSERT INTO live_entities (item_type, item_id, attributes) VALUES (?1, ?2, ?3)
         ON CONFLICT (item_type, item_id) DO UPDATE SET attributes = excluded.attributes",
        params![item_type, item_id, attributes],
    )
    .map_err(from_sqlite_err)?;
    Ok(())
}

/// Remove the live row. Returns whether a row existed.
pub fn delete_live(conn: &Connection, item_type: &str, item_id: i64) -> HindsightResult<bool> {
    conn.execute(
        "DELETE FROM live_entities WHERE item_type = ?1 AND item_id = ?2",
        params![item_type, item_id],
    )
    .map(|n| n > 0)
    .map_err(from_sqlite_err)
}

/// Current attribute JSON, if the entity is live.
pub fn get_live(conn: &Connection, item_type: &str, item_id: i64) -> HindsightResult<Option<String>> {
    conn.prepare_cached("SELECT attributes FROM live_entities WHERE item_type = ?1 AND item_id = ?2")
        .and_then(|mut stmt| {
            stmt.query_row(params![item_type, item_id], |row| row.get(0))
                .optional()
        })
        .map_err(from_sqlite_err)
}

/// Ids of live `item_type` entities whose `field` currently equals `value`.
pub fn live_ids_referencing(
    conn: &Connection,
    item_type: &str,
    field: &str,
    value: i64,
) -> HindsightResult<Vec<i64>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT item_id FROM live_entities
             WHERE item_type = ?1 AND json_extract(attributes, ?2) = ?3
             ORDER BY item_id ASC",
        )
        .map_err(from_sqlite_err)?;

    let rows = stmt
        .query_map(params![item_type, json_field_path(field), value], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(from_sqlite_err)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(from_sqlite_err)
}

/// Highest live item id for a kind, 0 if none.
pub fn max_live_item_id(conn: &Connection, item_type: &str) -> HindsightResult<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(item_id), 0) FROM live_entities WHERE item_type = ?1",
        params![item_type],
        |row| row.get(0),
    )
    .map_err(from_sqlite_err)
}

/// Number of live rows of a kind.
pub fn count_live(conn: &Connection, item_type: &str) -> HindsightResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM live_entities WHERE item_type = ?1",
        params![item_type],
        |row| row.get::<_, i64>(0),
    )
    .map(|c| c as u64)
    .map_err(from_sqlite_err)
}
