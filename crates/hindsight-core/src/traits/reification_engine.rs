//! IReificationEngine: the query surface exposed to callers.

use chrono::{DateTime, Utc};

use crate::errors::HindsightResult;
use crate::models::{HistoricalEntity, Resolution, VersionRecord};

pub trait IReificationEngine: Send + Sync {
    /// Reconstruct an entity, and optionally its nested graph, as of `as_of`.
    /// `Ok(None)` when the entity did not exist at that instant.
    fn reify(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
        include_nested: bool,
    ) -> HindsightResult<Option<HistoricalEntity>>;

    /// Reconstruct the pre-state captured by one version record, with
    /// associations as they stood just before it was recorded.
    fn reify_version(
        &self,
        sequence: u64,
        include_nested: bool,
    ) -> HindsightResult<Option<HistoricalEntity>>;

    /// Walk one relationship of an already reified entity at its `as_of`.
    fn load_association(
        &self,
        entity: &HistoricalEntity,
        relationship: &str,
    ) -> HindsightResult<Vec<HistoricalEntity>>;

    fn list_versions(&self, item_type: &str, item_id: i64) -> HindsightResult<Vec<VersionRecord>>;

    fn resolve_existence(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
    ) -> HindsightResult<Resolution>;
}
