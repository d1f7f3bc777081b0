//! IVersionReader: read-only view of the version store.
//!
//! Implementations are expected to answer every call from one consistent
//! snapshot of the store for as long as the reader lives.

use crate::errors::HindsightResult;
use crate::models::VersionRecord;

pub trait IVersionReader {
    /// All versions of one entity, ordered by `(created_at, sequence)`.
    fn versions_for(&self, item_type: &str, item_id: i64) -> HindsightResult<Vec<VersionRecord>>;

    fn version_by_sequence(&self, sequence: u64) -> HindsightResult<Option<VersionRecord>>;

    /// Raw attribute payload of the live row, if the entity currently exists.
    fn live_attributes(&self, item_type: &str, item_id: i64) -> HindsightResult<Option<String>>;

    /// Ids of live `item_type` rows whose `field` currently equals `value`.
    fn live_ids_referencing(
        &self,
        item_type: &str,
        field: &str,
        value: i64,
    ) -> HindsightResult<Vec<i64>>;

    /// Ids of `item_type` entities with any version payload whose `field`
    /// equalled `value`.
    fn historical_ids_referencing(
        &self,
        item_type: &str,
        field: &str,
        value: i64,
    ) -> HindsightResult<Vec<i64>>;
}
