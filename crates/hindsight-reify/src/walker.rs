//! Relationship graph walker.
//!
//! Membership is decided at `as_of`, never from the live set: candidates are
//! every id that references the owner now or ever did, and each one is kept
//! only if it existed at `as_of` with its key pointing at the owner.
//! Through-relationships resolve the link first, then the far-side target,
//! both gated at the same instant.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use hindsight_core::errors::HindsightResult;
use hindsight_core::models::{
    AttributeValue, HistoricalEntity, Resolution, Snapshot, VersionEvent,
};
use hindsight_core::schema::{Association, RelationshipDescriptor, ThroughTarget};
use hindsight_core::traits::IVersionReader;
use hindsight_core::SchemaRegistry;

use crate::context::WalkContext;
use crate::resolver::SnapshotResolver;

type Member = (i64, Snapshot);

pub struct GraphWalker<'a, R: IVersionReader + ?Sized> {
    reader: &'a R,
    registry: &'a SchemaRegistry,
    resolver: SnapshotResolver<'a, R>,
}

impl<'a, R: IVersionReader + ?Sized> GraphWalker<'a, R> {
    pub fn new(reader: &'a R, registry: &'a SchemaRegistry) -> Self {
        Self {
            reader,
            registry,
            resolver: SnapshotResolver::new(reader, registry),
        }
    }

    pub fn resolver(&self) -> &SnapshotResolver<'a, R> {
        &self.resolver
    }

    /// Wrap a resolved snapshot, attaching its whole graph when `include_nested`.
    pub fn build(
        &self,
        item_type: &str,
        item_id: i64,
        snapshot: Snapshot,
        ctx: &WalkContext,
        include_nested: bool,
    ) -> HindsightResult<HistoricalEntity> {
        let entity = HistoricalEntity::new(
            item_type,
            item_id,
            ctx.as_of,
            snapshot.source,
            snapshot.attributes,
        );
        if !include_nested {
            return Ok(entity);
        }
        let associations = self.walk(item_type, item_id, ctx)?;
        Ok(entity.with_associations(associations))
    }

    /// Every declared relationship of one entity, recursively.
    pub fn walk(
        &self,
        item_type: &str,
        item_id: i64,
        ctx: &WalkContext,
    ) -> HindsightResult<BTreeMap<String, Vec<HistoricalEntity>>> {
        let kind = self.registry.kind(item_type)?;
        let mut associations = BTreeMap::new();
        for rel in &kind.relationships {
            let members = self.relationship(item_type, item_id, rel, ctx, true)?;
            associations.insert(rel.name.clone(), members);
        }
        Ok(associations)
    }

    /// Members of one relationship at `ctx.as_of`, ordered. Children carry
    /// their own graphs only when `nested`.
    pub fn relationship(
        &self,
        owner_type: &str,
        owner_id: i64,
        rel: &RelationshipDescriptor,
        ctx: &WalkContext,
        nested: bool,
    ) -> HindsightResult<Vec<HistoricalEntity>> {
        let child_ctx = ctx.descend(owner_type)?;

        let members = match &rel.association {
            Association::HasMany { foreign_key } => {
                self.has_many(rel, foreign_key, owner_id, &child_ctx)?
            }
            Association::Through {
                link_kind,
                link_foreign_key,
                target,
            } => self.through(rel, link_kind, link_foreign_key, target, owner_id, &child_ctx)?,
        };
        debug!(
            "{owner_type}#{owner_id}.{} at {}: {} member(s), depth {}",
            rel.name,
            ctx.as_of,
            members.len(),
            child_ctx.depth
        );

        order_members(members, rel.order_by.as_deref())
            .into_iter()
            .map(|(id, snapshot)| self.build(&rel.target_kind, id, snapshot, &child_ctx, nested))
            .collect()
    }

    fn has_many(
        &self,
        rel: &RelationshipDescriptor,
        foreign_key: &str,
        owner_id: i64,
        ctx: &WalkContext,
    ) -> HindsightResult<Vec<Member>> {
        let mut members = Vec::new();
        for id in self.candidates(&rel.target_kind, foreign_key, owner_id)? {
            if rel.is_cascade() && self.destroyed_by(&rel.target_kind, id, ctx)? {
                trace!("{}#{id} destroyed by {}, skipped", rel.target_kind, ctx.as_of);
                continue;
            }
            if let Some(snapshot) = self.linked(&rel.target_kind, id, foreign_key, owner_id, ctx)? {
                members.push((id, snapshot));
            }
        }
        Ok(members)
    }

    fn through(
        &self,
        rel: &RelationshipDescriptor,
        link_kind: &str,
        link_foreign_key: &str,
        target: &ThroughTarget,
        owner_id: i64,
        ctx: &WalkContext,
    ) -> HindsightResult<Vec<Member>> {
        let mut links = Vec::new();
        for link_id in self.candidates(link_kind, link_foreign_key, owner_id)? {
            if let Some(snapshot) = self.linked(link_kind, link_id, link_foreign_key, owner_id, ctx)? {
                links.push((link_id, snapshot));
            }
        }

        let mut seen = BTreeSet::new();
        let mut members = Vec::new();
        for (link_id, link) in links {
            match target {
                ThroughTarget::TargetColumn(field) => {
                    for id in self.candidates(&rel.target_kind, field, link_id)? {
                        if let Some(snapshot) = self.linked(&rel.target_kind, id, field, link_id, ctx)? {
                            if seen.insert(id) {
                                members.push((id, snapshot));
                            }
                        }
                    }
                }
                ThroughTarget::LinkColumn(field) => {
                    let Some(id) = link.attributes.get(field).and_then(AttributeValue::as_i64) else {
                        continue;
                    };
                    if let Resolution::Existed(snapshot) =
                        self.resolver.resolve(&rel.target_kind, id, ctx)?
                    {
                        if seen.insert(id) {
                            members.push((id, snapshot));
                        }
                    }
                }
            }
        }
        Ok(members)
    }

    /// Ids that reference `value` through `field` now or at any recorded point.
    fn candidates(&self, item_type: &str, field: &str, value: i64) -> HindsightResult<BTreeSet<i64>> {
        let mut ids: BTreeSet<i64> = self
            .reader
            .live_ids_referencing(item_type, field, value)?
            .into_iter()
            .collect();
        ids.extend(self.reader.historical_ids_referencing(item_type, field, value)?);
        Ok(ids)
    }

    /// Snapshot of `item_type#id` if it existed at `as_of` with `field == expected`.
    fn linked(
        &self,
        item_type: &str,
        id: i64,
        field: &str,
        expected: i64,
        ctx: &WalkContext,
    ) -> HindsightResult<Option<Snapshot>> {
        Ok(match self.resolver.resolve(item_type, id, ctx)? {
            Resolution::Existed(snapshot)
                if snapshot.attributes.get(field).and_then(AttributeValue::as_i64)
                    == Some(expected) =>
            {
                Some(snapshot)
            }
            _ => None,
        })
    }

    fn destroyed_by(&self, item_type: &str, id: i64, ctx: &WalkContext) -> HindsightResult<bool> {
        Ok(self
            .reader
            .versions_for(item_type, id)?
            .iter()
            .any(|v| v.event == VersionEvent::Destroy && !v.is_after(ctx.as_of)))
    }
}

/// Sort by the ordering field's historical value, then id; by id alone otherwise.
fn order_members(mut members: Vec<Member>, order_by: Option<&str>) -> Vec<Member> {
    match order_by {
        Some(field) => {
            let null = AttributeValue::Null;
            members.sort_by(|(lhs_id, lhs), (rhs_id, rhs)| {
                let lhs_key = lhs.attributes.get(field).unwrap_or(&null);
                let rhs_key = rhs.attributes.get(field).unwrap_or(&null);
                lhs_key.sort_cmp(rhs_key).then(lhs_id.cmp(rhs_id))
            });
        }
        None => members.sort_by_key(|(id, _)| *id),
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use hindsight_core::models::{AttributeSet, SnapshotSource};

    fn member(id: i64, position: Option<i64>) -> Member {
        let mut attributes = AttributeSet::new().with("id", id);
        if let Some(position) = position {
            attributes.insert("position", position);
        }
        (
            id,
            Snapshot {
                attributes,
                source: SnapshotSource::Live,
            },
        )
    }

    fn ids(members: &[Member]) -> Vec<i64> {
        members.iter().map(|(id, _)| *id).collect()
    }

    #[test]
    fn default_order_is_ascending_id() {
        let ordered = order_members(vec![member(3, None), member(1, None), member(2, None)], None);
        assert_eq!(ids(&ordered), vec![1, 2, 3]);
    }

    #[test]
    fn order_field_wins_and_id_breaks_ties() {
        let ordered = order_members(
            vec![
                member(1, Some(20)),
                member(2, Some(10)),
                member(3, Some(10)),
                member(4, None),
            ],
            Some("position"),
        );
        assert_eq!(ids(&ordered), vec![4, 2, 3, 1]);
    }
}
