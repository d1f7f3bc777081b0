//! SqliteVersionReader: IVersionReader over one borrowed connection.
//!
//! The caller owns the transaction. Every query issued through one reader
//! therefore observes the same committed state, and version lists are
//! memoized per entity for the reader's lifetime.

use std::cell::RefCell;
use std::collections::HashMap;

use rusqlite::Connection;

use hindsight_core::errors::HindsightResult;
use hindsight_core::models::{parse_timestamp, VersionEvent, VersionRecord};
use hindsight_core::traits::IVersionReader;

use crate::queries::{entity_ops, version_ops};
use crate::queries::version_ops::RawVersion;
use crate::to_storage_err;

pub struct SqliteVersionReader<'conn> {
    conn: &'conn Connection,
    versions: RefCell<HashMap<(String, i64), Vec<VersionRecord>>>,
}

impl<'conn> SqliteVersionReader<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            versions: RefCell::new(HashMap::new()),
        }
    }
}

impl IVersionReader for SqliteVersionReader<'_> {
    fn versions_for(&self, item_type: &str, item_id: i64) -> HindsightResult<Vec<VersionRecord>> {
        let key = (item_type.to_string(), item_id);
        if let Some(cached) = self.versions.borrow().get(&key) {
            return Ok(cached.clone());
        }

        let mut records = version_ops::get_versions_for_item(self.conn, item_type, item_id)?
            .into_iter()
            .map(raw_to_version_record)
            .collect::<HindsightResult<Vec<_>>>()?;
        // SQL orders the stored text; rows written with a different RFC 3339
        // precision only sort correctly once parsed.
        records.sort_by(VersionRecord::chronological);

        self.versions.borrow_mut().insert(key, records.clone());
        Ok(records)
    }

    fn version_by_sequence(&self, sequence: u64) -> HindsightResult<Option<VersionRecord>> {
        version_ops::get_version(self.conn, sequence)?
            .map(raw_to_version_record)
            .transpose()
    }

    fn live_attributes(&self, item_type: &str, item_id: i64) -> HindsightResult<Option<String>> {
        entity_ops::get_live(self.conn, item_type, item_id)
    }

    fn live_ids_referencing(
        &self,
        item_type: &str,
        field: &str,
        value: i64,
    ) -> HindsightResult<Vec<i64>> {
        entity_ops::live_ids_referencing(self.conn, item_type, field, value)
    }

    fn historical_ids_referencing(
        &self,
        item_type: &str,
        field: &str,
        value: i64,
    ) -> HindsightResult<Vec<i64>> {
        version_ops::ids_with_historical_reference(self.conn, item_type, field, value)
    }
}

/// Convert a raw row into a typed record. A row that cannot be read faithfully
/// is an error rather than a guess.
pub fn raw_to_version_record(raw: RawVersion) -> HindsightResult<VersionRecord> {
    let event = VersionEvent::parse(&raw.event).ok_or_else(|| {
        to_storage_err(format!("version {}: unknown event '{}'", raw.id, raw.event))
    })?;
    let created_at = parse_timestamp(&raw.created_at).ok_or_else(|| {
        to_storage_err(format!(
            "version {}: unparseable created_at '{}'",
            raw.id, raw.created_at
        ))
    })?;

    Ok(VersionRecord {
        sequence: raw.id,
        item_type: raw.item_type,
        item_id: raw.item_id,
        event,
        attribute_payload: raw.object,
        created_at,
        whodunnit: raw.whodunnit,
    })
}
