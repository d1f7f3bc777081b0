//! Recorder: the reference write path.
//!
//! Every mutation writes the live row and exactly one version row in the
//! same transaction. Create stores no payload; Update and Destroy store the
//! full pre-state. Destroy cascades through `dependent_destroy` has-many
//! relationships, children first, all stamped with the parent's instant.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info};

use hindsight_core::errors::HindsightResult;
use hindsight_core::models::{format_timestamp, AttributeSet, AttributeValue, VersionEvent};
use hindsight_core::schema::{Association, EntityKind, ID_FIELD};
use hindsight_core::{HindsightError, SchemaRegistry};

use crate::pool::WriteConnection;
use crate::queries::{entity_ops, version_ops};
use crate::{from_sqlite_err, to_storage_err};

pub struct Recorder {
    writer: Arc<WriteConnection>,
    schema: Arc<SchemaRegistry>,
    whodunnit: Option<String>,
}

impl Recorder {
    pub fn new(writer: Arc<WriteConnection>, schema: Arc<SchemaRegistry>) -> Self {
        Self {
            writer,
            schema,
            whodunnit: None,
        }
    }

    /// Attribute subsequent versions to `actor`.
    pub fn with_whodunnit(mut self, actor: impl Into<String>) -> Self {
        self.whodunnit = Some(actor.into());
        self
    }

    /// Insert a new entity. Ids are allocated per kind and never reused.
    pub fn create(
        &self,
        item_type: &str,
        attributes: AttributeSet,
        occurred_at: DateTime<Utc>,
    ) -> HindsightResult<i64> {
        self.schema.kind(item_type)?;
        self.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(from_sqlite_err)?;

            let item_id = next_item_id(&tx, item_type)?;
            let mut attributes = attributes;
            attributes.insert(ID_FIELD, item_id);
            entity_ops::upsert_live(&tx, item_type, item_id, &attributes.to_payload())?;
            let sequence = version_ops::insert_version(
                &tx,
                item_type,
                item_id,
                VersionEvent::Create.as_str(),
                None,
                &format_timestamp(occurred_at),
                self.whodunnit.as_deref(),
            )?;

            tx.commit().map_err(from_sqlite_err)?;
            debug!("recorded create for {item_type}#{item_id} (version {sequence})");
            Ok(item_id)
        })
    }

    /// Apply `changes` to a live entity. Returns the version sequence, or
    /// `None` when nothing changed and no version was recorded.
    pub fn update(
        &self,
        item_type: &str,
        item_id: i64,
        changes: AttributeSet,
        occurred_at: DateTime<Utc>,
    ) -> HindsightResult<Option<u64>> {
        let kind = self.schema.kind(item_type)?;
        let mut changes = changes;
        changes.remove(ID_FIELD);

        self.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(from_sqlite_err)?;

            let current = load_live(&tx, kind, item_id)?;
            if current.is_unchanged_by(&changes) {
                debug!("update of {item_type}#{item_id} changes nothing, not recorded");
                return Ok(None);
            }

            let mut next = current.clone();
            next.merge(&changes);
            entity_ops::upsert_live(&tx, item_type, item_id, &next.to_payload())?;
            let payload = current.to_payload();
            let sequence = version_ops::insert_version(
                &tx,
                item_type,
                item_id,
                VersionEvent::Update.as_str(),
                Some(&payload),
                &format_timestamp(occurred_at),
                self.whodunnit.as_deref(),
            )?;

            tx.commit().map_err(from_sqlite_err)?;
            debug!("recorded update for {item_type}#{item_id} (version {sequence})");
            Ok(Some(sequence))
        })
    }

    /// Destroy an entity and, depth-first, its cascade dependents. Returns the
    /// sequences of every destroy version written, dependents first.
    pub fn destroy(
        &self,
        item_type: &str,
        item_id: i64,
        occurred_at: DateTime<Utc>,
    ) -> HindsightResult<Vec<u64>> {
        self.schema.kind(item_type)?;
        self.writer.with_conn_sync(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(from_sqlite_err)?;

            let created_at = format_timestamp(occurred_at);
            let mut written = Vec::new();
            self.destroy_cascading(&tx, item_type, item_id, &created_at, &mut written)?;

            tx.commit().map_err(from_sqlite_err)?;
            info!(
                "destroyed {item_type}#{item_id} ({} version(s) recorded)",
                written.len()
            );
            Ok(written)
        })
    }

    /// Write a live row with no version history, as for rows that predate
    /// tracking. Returns the allocated id.
    pub fn insert_untracked(&self, item_type: &str, attributes: AttributeSet) -> HindsightResult<i64> {
        self.schema.kind(item_type)?;
        self.writer.with_conn_sync(|conn| {
            let item_id = next_item_id(conn, item_type)?;
            let mut attributes = attributes;
            attributes.insert(ID_FIELD, item_id);
            entity_ops::upsert_live(conn, item_type, item_id, &attributes.to_payload())?;
            Ok(item_id)
        })
    }

    fn destroy_cascading(
        &self,
        conn: &Connection,
        item_type: &str,
        item_id: i64,
        created_at: &str,
        written: &mut Vec<u64>,
    ) -> HindsightResult<()> {
        let kind = self.schema.kind(item_type)?;
        let current = load_live(conn, kind, item_id)?;

        for rel in &kind.relationships {
            if !rel.is_cascade() {
                continue;
            }
            if let Association::HasMany { foreign_key } = &rel.association {
                for child in entity_ops::live_ids_referencing(conn, &rel.target_kind, foreign_key, item_id)? {
                    self.destroy_cascading(conn, &rel.target_kind, child, created_at, written)?;
                }
            }
        }

        let payload = current.to_payload();
        let sequence = version_ops::insert_version(
            conn,
            item_type,
            item_id,
            VersionEvent::Destroy.as_str(),
            Some(&payload),
            created_at,
            self.whodunnit.as_deref(),
        )?;
        entity_ops::delete_live(conn, item_type, item_id)?;
        debug!("recorded destroy for {item_type}#{item_id} (version {sequence})");
        written.push(sequence);
        Ok(())
    }
}

fn next_item_id(conn: &Connection, item_type: &str) -> HindsightResult<i64> {
    let live = entity_ops::max_live_item_id(conn, item_type)?;
    let recorded = version_ops::max_recorded_item_id(conn, item_type)?;
    Ok(live.max(recorded) + 1)
}

fn load_live(
    conn: &Connection,
    kind: &EntityKind,
    item_id: i64,
) -> HindsightResult<AttributeSet> {
    let item_type = kind.name.as_str();
    let raw = entity_ops::get_live(conn, item_type, item_id)?
        .ok_or_else(|| HindsightError::not_found(item_type, item_id))?;
    let value: serde_json::Value = serde_json::from_str(&raw)?;
    let object = value.as_object().ok_or_else(|| {
        to_storage_err(format!("live row {item_type}#{item_id} is not a JSON object"))
    })?;

    // Declared fields come back typed so comparisons against typed changes hold.
    Ok(object
        .iter()
        .map(|(field, value)| {
            let typed = kind
                .field_type(field)
                .and_then(|ty| AttributeValue::from_typed_json(ty, value).ok())
                .unwrap_or_else(|| AttributeValue::from_json(value));
            (field.clone(), typed)
        })
        .collect())
}
