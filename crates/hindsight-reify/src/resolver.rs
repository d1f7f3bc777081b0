//! Snapshot resolution: which state was current for one entity at `as_of`.
//!
//! The boundary record is the first version recorded strictly after `as_of`.
//! Its pre-state is the state at `as_of`, unless it is the entity's Create.
//! Without a boundary the entity is either destroyed or in its live state.

use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use hindsight_core::errors::{HindsightResult, ReifyError};
use hindsight_core::models::{
    AbsenceReason, AttributeSet, Resolution, Snapshot, SnapshotSource, VersionEvent, VersionRecord,
};
use hindsight_core::schema::EntityKind;
use hindsight_core::traits::IVersionReader;
use hindsight_core::SchemaRegistry;

use crate::context::WalkContext;
use crate::rehydrate::Rehydrator;

/// First record with `created_at > as_of` in a chronologically ordered history.
pub fn find_boundary(versions: &[VersionRecord], as_of: DateTime<Utc>) -> Option<&VersionRecord> {
    let idx = versions.partition_point(|v| !v.is_after(as_of));
    versions.get(idx)
}

pub struct SnapshotResolver<'a, R: IVersionReader + ?Sized> {
    reader: &'a R,
    registry: &'a SchemaRegistry,
}

impl<'a, R: IVersionReader + ?Sized> SnapshotResolver<'a, R> {
    pub fn new(reader: &'a R, registry: &'a SchemaRegistry) -> Self {
        Self { reader, registry }
    }

    pub fn resolve(
        &self,
        item_type: &str,
        item_id: i64,
        ctx: &WalkContext,
    ) -> HindsightResult<Resolution> {
        ctx.check_deadline()?;
        let kind = self.registry.kind(item_type)?;
        let versions = self.reader.versions_for(item_type, item_id)?;

        let resolution = match find_boundary(&versions, ctx.as_of) {
            Some(boundary) if boundary.event == VersionEvent::Create => {
                Resolution::absent(AbsenceReason::NotYetCreated)
            }
            Some(boundary) => Resolution::Existed(self.pre_state(kind, boundary, ctx)?),
            None => match versions.last() {
                Some(last) if last.event == VersionEvent::Destroy => {
                    Resolution::absent(AbsenceReason::Destroyed)
                }
                last => match self.live(kind, item_id)? {
                    Some(attributes) => Resolution::Existed(Snapshot {
                        attributes,
                        source: SnapshotSource::Live,
                    }),
                    None if last.is_none() => Resolution::absent(AbsenceReason::NeverExisted),
                    None => {
                        warn!(
                            "{item_type}#{item_id} has history but no live row and no destroy; treating as absent"
                        );
                        Resolution::absent(AbsenceReason::Untracked)
                    }
                },
            },
        };

        trace!(
            "resolved {item_type}#{item_id} at {}: existed={}",
            ctx.as_of,
            resolution.existed()
        );
        Ok(resolution)
    }

    /// Rehydrate the pre-state captured by `record`.
    pub fn pre_state(
        &self,
        kind: &EntityKind,
        record: &VersionRecord,
        ctx: &WalkContext,
    ) -> HindsightResult<Snapshot> {
        let payload = record.attribute_payload.as_deref().ok_or_else(|| {
            ReifyError::MissingPayload {
                item_type: record.item_type.clone(),
                sequence: record.sequence,
                event: record.event.to_string(),
            }
        })?;

        let attributes = Rehydrator::new(kind, ctx.strict_payloads)
            .rehydrate(record.item_id, payload, || self.live(kind, record.item_id))?;
        Ok(Snapshot {
            attributes,
            source: SnapshotSource::Version {
                sequence: record.sequence,
            },
        })
    }

    fn live(&self, kind: &EntityKind, item_id: i64) -> HindsightResult<Option<AttributeSet>> {
        self.reader
            .live_attributes(&kind.name, item_id)?
            .map(|raw| Rehydrator::new(kind, false).from_live(item_id, &raw))
            .transpose()
    }
}
