//! ReificationEngine: the query surface.
//!
//! Every call runs inside one read transaction on one pooled connection, so a
//! reification observes a single committed state of the store even while a
//! writer is active. [`ReificationEngine::session`] exposes that scope for
//! callers that need several queries against the same view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use hindsight_core::config::ReifyConfig;
use hindsight_core::errors::HindsightResult;
use hindsight_core::models::{HistoricalEntity, Resolution, VersionRecord};
use hindsight_core::traits::{IReificationEngine, IVersionReader};
use hindsight_core::{HindsightError, SchemaRegistry};
use hindsight_storage::pool::ReadPool;
use hindsight_storage::{to_unavailable_err, SqliteVersionReader, StorageEngine};

use crate::context::{ReifyOptions, WalkContext};
use crate::walker::GraphWalker;

pub struct ReificationEngine {
    readers: Arc<ReadPool>,
    registry: Arc<SchemaRegistry>,
    config: ReifyConfig,
}

impl ReificationEngine {
    pub fn new(readers: Arc<ReadPool>, registry: Arc<SchemaRegistry>, config: ReifyConfig) -> Self {
        info!(
            "reification engine ready: {} kind(s), max_depth {}",
            registry.kinds().count(),
            config.max_depth
        );
        if config.max_depth < registry.max_depth() {
            warn!(
                "max_depth {} is below the schema ceiling {}; deep nested reifies will fail",
                config.max_depth,
                registry.max_depth()
            );
        }
        Self {
            readers,
            registry,
            config,
        }
    }

    pub fn from_storage(
        storage: &StorageEngine,
        registry: Arc<SchemaRegistry>,
        config: ReifyConfig,
    ) -> Self {
        Self::new(storage.readers(), registry, config)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ReifyConfig {
        &self.config
    }

    /// Run `f` against one consistent view of the store.
    pub fn session<F, T>(&self, f: F) -> HindsightResult<T>
    where
        F: FnOnce(&ReadSession<'_>) -> HindsightResult<T>,
    {
        self.readers.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| to_unavailable_err(format!("begin read transaction: {e}")))?;

            let result = {
                let session = ReadSession {
                    reader: SqliteVersionReader::new(&tx),
                    registry: &self.registry,
                    config: &self.config,
                };
                f(&session)
            };

            // Read-only: ending the transaction either way releases the snapshot.
            tx.rollback()
                .map_err(|e| to_unavailable_err(format!("end read transaction: {e}")))?;
            result
        })
    }

    pub fn reify_with(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
        options: &ReifyOptions,
    ) -> HindsightResult<Option<HistoricalEntity>> {
        self.session(|s| s.reify_with(item_type, item_id, as_of, options))
    }
}

impl IReificationEngine for ReificationEngine {
    fn reify(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
        include_nested: bool,
    ) -> HindsightResult<Option<HistoricalEntity>> {
        self.session(|s| s.reify(item_type, item_id, as_of, include_nested))
    }

    fn reify_version(
        &self,
        sequence: u64,
        include_nested: bool,
    ) -> HindsightResult<Option<HistoricalEntity>> {
        self.session(|s| s.reify_version(sequence, include_nested))
    }

    fn load_association(
        &self,
        entity: &HistoricalEntity,
        relationship: &str,
    ) -> HindsightResult<Vec<HistoricalEntity>> {
        self.session(|s| s.load_association(entity, relationship))
    }

    fn list_versions(&self, item_type: &str, item_id: i64) -> HindsightResult<Vec<VersionRecord>> {
        self.session(|s| s.list_versions(item_type, item_id))
    }

    fn resolve_existence(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
    ) -> HindsightResult<Resolution> {
        self.session(|s| s.resolve_existence(item_type, item_id, as_of))
    }
}

/// Queries bound to one read transaction.
pub struct ReadSession<'s> {
    reader: SqliteVersionReader<'s>,
    registry: &'s SchemaRegistry,
    config: &'s ReifyConfig,
}

impl<'s> ReadSession<'s> {
    fn walker(&self) -> GraphWalker<'_, SqliteVersionReader<'s>> {
        GraphWalker::new(&self.reader, self.registry)
    }

    pub fn reify(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
        include_nested: bool,
    ) -> HindsightResult<Option<HistoricalEntity>> {
        let options = ReifyOptions {
            include_nested,
            ..ReifyOptions::default()
        };
        self.reify_with(item_type, item_id, as_of, &options)
    }

    pub fn reify_with(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
        options: &ReifyOptions,
    ) -> HindsightResult<Option<HistoricalEntity>> {
        debug!("reify {item_type}#{item_id} at {as_of} (nested: {})", options.include_nested);
        let ctx = WalkContext::new(as_of, self.config, options);
        let walker = self.walker();

        match walker.resolver().resolve(item_type, item_id, &ctx)? {
            Resolution::Existed(snapshot) => walker
                .build(item_type, item_id, snapshot, &ctx, options.include_nested)
                .map(Some),
            Resolution::Absent { reason } => {
                debug!("{item_type}#{item_id} absent at {as_of}: {reason:?}");
                Ok(None)
            }
        }
    }

    /// The pre-state captured by version `sequence`, with associations as of
    /// the instant just before it was recorded. `None` for Create versions.
    ///
    /// Associations are walked by time, not by sequence: a sibling version
    /// recorded at the same instant is treated as not yet applied, even when
    /// its sequence is lower.
    pub fn reify_version(
        &self,
        sequence: u64,
        include_nested: bool,
    ) -> HindsightResult<Option<HistoricalEntity>> {
        let record = self
            .reader
            .version_by_sequence(sequence)?
            .ok_or_else(|| HindsightError::not_found("version", sequence))?;
        if !record.event.carries_pre_state() {
            debug!("version {sequence} is a create, nothing to reify");
            return Ok(None);
        }

        let kind = self.registry.kind(&record.item_type)?;
        let options = ReifyOptions {
            include_nested,
            ..ReifyOptions::default()
        };
        let ctx = WalkContext::new(record.instant_before(), self.config, &options);
        let walker = self.walker();
        let snapshot = walker.resolver().pre_state(kind, &record, &ctx)?;
        walker
            .build(&record.item_type, record.item_id, snapshot, &ctx, include_nested)
            .map(Some)
    }

    /// One relationship of `entity`, walked at the entity's own `as_of`.
    pub fn load_association(
        &self,
        entity: &HistoricalEntity,
        relationship: &str,
    ) -> HindsightResult<Vec<HistoricalEntity>> {
        let rel = self.registry.relationship(entity.item_type(), relationship)?;
        let ctx = WalkContext::new(entity.as_of(), self.config, &ReifyOptions::shallow());
        self.walker()
            .relationship(entity.item_type(), entity.item_id(), rel, &ctx, false)
    }

    pub fn list_versions(&self, item_type: &str, item_id: i64) -> HindsightResult<Vec<VersionRecord>> {
        self.registry.kind(item_type)?;
        self.reader.versions_for(item_type, item_id)
    }

    pub fn resolve_existence(
        &self,
        item_type: &str,
        item_id: i64,
        as_of: DateTime<Utc>,
    ) -> HindsightResult<Resolution> {
        let ctx = WalkContext::new(as_of, self.config, &ReifyOptions::shallow());
        self.walker().resolver().resolve(item_type, item_id, &ctx)
    }
}
