//! Reconstructed, read-only snapshots of an entity and its nested graph.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AttributeSet, AttributeValue};

/// Where a snapshot's attributes came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Pre-state payload of the version with this sequence.
    Version { sequence: u64 },
    /// The entity's current live row.
    Live,
}

/// An entity as it existed at `as_of`.
///
/// Built once per reification and never mutated afterwards. `associations`
/// is `None` until the graph walk has been attached; lazily loaded
/// relationships are handed back to the caller instead of written in here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEntity {
    item_type: String,
    item_id: i64,
    as_of: DateTime<Utc>,
    source: SnapshotSource,
    attributes: AttributeSet,
    associations: Option<BTreeMap<String, Vec<HistoricalEntity>>>,
}

impl HistoricalEntity {
    pub fn new(
        item_type: impl Into<String>,
        item_id: i64,
        as_of: DateTime<Utc>,
        source: SnapshotSource,
        attributes: AttributeSet,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            item_id,
            as_of,
            source,
            attributes,
            associations: None,
        }
    }

    /// Attach the walked associations. Consumes `self` so that construction
    /// stays the only place the graph is written.
    pub fn with_associations(mut self, associations: BTreeMap<String, Vec<HistoricalEntity>>) -> Self {
        self.associations = Some(associations);
        self
    }

    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn item_id(&self) -> i64 {
        self.item_id
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn source(&self) -> SnapshotSource {
        self.source
    }

    pub fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    pub fn get(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }

    /// Text value of `field`, if it is text.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.attributes.get(field).and_then(AttributeValue::as_str)
    }

    /// Whether nested collections were populated at construction.
    pub fn is_nested_loaded(&self) -> bool {
        self.associations.is_some()
    }

    /// Members of one nested collection, if nested collections were loaded.
    pub fn association(&self, name: &str) -> Option<&[HistoricalEntity]> {
        self.associations
            .as_ref()
            .and_then(|map| map.get(name))
            .map(Vec::as_slice)
    }

    pub fn associations(&self) -> Option<&BTreeMap<String, Vec<HistoricalEntity>>> {
        self.associations.as_ref()
    }
}
