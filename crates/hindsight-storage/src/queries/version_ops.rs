//! Raw SQL operations for the versions table.

use rusqlite::{params, Connection, OptionalExtension, Row};

use hindsight_core::errors::HindsightResult;

use super::json_field_path;
use crate::from_sqlite_err;

const VERSION_COLUMNS: &str = "id, item_type, item_id, event, object, created_at, whodunnit";

/// Raw version row from the database.
#[derive(Debug, Clone)]
pub struct RawVersion {
    pub id: u64,
    pub item_type: String,
    pub item_id: i64,
    pub event: String,
    pub object: Option<String>,
    pub created_at: String,
    pub whodunnit: Option<String>,
}

/// Append a version row. Returns the assigned sequence.
#[allow(clippy::too_many_arguments)]
pub fn insert_version(
    conn: &Connection,
    item_type: &str,
    item_id: i64,
    event: &str,
    object: Option<&str>,
    created_at: &str,
    whodunnit: Option<&str>,
) -> HindsightResult<u64> {
    conn.execute(
        "INSERT INTO versions (item_type, item_id, event, object, created_at, whodunnit)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![item_type, item_id, event, object, created_at, whodunnit],
    )
    .map_err(from_sqlite_err)?;

    Ok(conn.last_insert_rowid() as u64)
}

/// All versions of one entity in chronological order (created_at, then sequence).
pub fn get_versions_for_item(
    conn: &Connection,
    item_type: &str,
    item_id: i64,
) -> HindsightResult<Vec<RawVersion>> {
    let mut stmt = conn
        .prepare_cached(&format!(
            "SELECT {VERSION_COLUMNS} FROM versions
             WHERE item_type = ?1 AND item_id = ?2
             ORDER BY created_at ASC, id ASC"
        ))
        .map_err(from_sqlite_err)?;

    let rows = stmt
        .query_map(params![item_type, item_id], row_to_raw_version)
        .map_err(from_sqlite_err)?;

    rows.collect::<Result<Vec<_>, _>>()
        .map_err(from_sqlite_err)
}

/// Look up a single version by its sequence.
pub fn get_version(conn: &Connection, id: u64) -> HindsightResult<Option<RawVersion>> {
    conn.query_row(
        &format!("SELECT {VERSION_COLUMNS} FROM versions WHERE id = ?1"),
        params![id as i64],
        row_to_raw_version,
    )
    .optional()
    .map_err(from_sqlite_err)
}

/// Ids of `item_type` entities whose recorded pre-state ever held `value` in `field`.
pub fn ids_with_historical_reference(
    conn: &Connection,
    item_type: &str,
    field: &str,
    value: i64,
) -> HindsightResult<Vec<i64>> {
    let mut stmt = conn
        .prepare_cached(
            "SELECT DISTINCT item_id FROM versions
             WHERE item_type = ?1 AND object IS NOT NULL
               AND json_extract(object, ?2) = ?3
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

/// Highest item id ever recorded for a kind, 0 if none.
pub fn max_recorded_item_id(conn: &Connection, item_type: &str) -> HindsightResult<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(item_id), 0) FROM versions WHERE item_type = ?1",
        params![item_type],
        |row| row.get(0),
    )
    .map_err(from_sqlite_err)
}

/// Number of versions recorded for one entity.
pub fn get_version_count(conn: &Connection, item_type: &str, item_id: i64) -> HindsightResult<u64> {
    conn.query_row(
        "SELECT COUNT(*) FROM versions WHERE item_type = ?1 AND item_id = ?2",
        params![item_type, item_id],
        |row| row.get::<_, i64>(0),
    )
    .map(|c| c as u64)
    .map_err(from_sqlite_err)
}

fn row_to_raw_version(row: &Row<'_>) -> rusqlite::Result<RawVersion> {
    Ok(RawVersion {
        id: row.get::<_, i64>(0)? as u64,
        item_type: row.get(1)?,
        item_id: row.get(2)?,
        event: row.get(3)?,
        object: row.get(4)?,
        created_at: row.get(5)?,
        whodunnit: row.get(6)?,
    })
}
