//! Shared fixtures: the chapter/section/paragraph library schema, a
//! deterministic clock, and a store wired to a recorder and an engine.

use std::cell::Cell;
use std::path::Path;
use std::sync::{Arc, Once};

use chrono::{DateTime, Duration, TimeZone, Utc};

use hindsight_core::config::{ReifyConfig, StorageConfig};
use hindsight_core::models::{AttributeSet, FieldType, HistoricalEntity, VersionRecord};
use hindsight_core::schema::{EntityKind, FieldSpec, RelationshipDescriptor, ThroughTarget};
use hindsight_core::traits::IReificationEngine;
use hindsight_core::SchemaRegistry;
use hindsight_reify::ReificationEngine;
use hindsight_storage::{Recorder, StorageEngine};

pub const CHAPTER: &str = "Chapter";
pub const SECTION: &str = "Section";
pub const PARAGRAPH: &str = "Paragraph";
pub const AUTHOR: &str = "Author";
pub const AUTHORSHIP: &str = "Authorship";

/// Chapter has many sections (dependent destroy, ordered by position), has
/// many paragraphs through sections, and has many authors through the
/// authorship join table. Section has many paragraphs (dependent destroy).
pub fn library_kinds() -> Vec<EntityKind> {
    vec![
        EntityKind::new(CHAPTER)
            .field(FieldSpec::required("name", FieldType::Text))
            .relationship(
                RelationshipDescriptor::has_many("sections", SECTION, "chapter_id")
                    .dependent_destroy()
                    .order_by("position"),
            )
            .relationship(RelationshipDescriptor::through(
                "paragraphs",
                PARAGRAPH,
                SECTION,
                "chapter_id",
                ThroughTarget::TargetColumn("section_id".into()),
            ))
            .relationship(RelationshipDescriptor::through(
                "authors",
                AUTHOR,
                AUTHORSHIP,
                "chapter_id",
                ThroughTarget::LinkColumn("author_id".into()),
            )),
        EntityKind::new(SECTION)
            .field(FieldSpec::required("name", FieldType::Text))
            .field(FieldSpec::required("chapter_id", FieldType::Integer))
            .field(FieldSpec::optional("position", FieldType::Integer))
            .relationship(
                RelationshipDescriptor::has_many("paragraphs", PARAGRAPH, "section_id")
                    .dependent_destroy(),
            ),
        EntityKind::new(PARAGRAPH)
            .field(FieldSpec::required("name", FieldType::Text))
            .field(FieldSpec::required("section_id", FieldType::Integer)),
        EntityKind::new(AUTHOR).field(FieldSpec::required("name", FieldType::Text)),
        EntityKind::new(AUTHORSHIP)
            .field(FieldSpec::required("chapter_id", FieldType::Integer))
            .field(FieldSpec::required("author_id", FieldType::Integer)),
    ]
}

pub fn library_schema() -> Arc<SchemaRegistry> {
    Arc::new(
        SchemaRegistry::new(library_kinds(), ReifyConfig::default().max_depth)
            .unwrap_or_else(|e| panic!("library schema is invalid: {e}")),
    )
}

/// Deterministic clock. Every mutation happens one tick after the last.
pub struct Timeline {
    now: Cell<DateTime<Utc>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::starting_at(Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap())
    }

    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    /// Advance one second and return the new instant.
    pub fn tick(&self) -> DateTime<Utc> {
        self.advance(Duration::seconds(1))
    }

    pub fn advance(&self, by: Duration) -> DateTime<Utc> {
        let next = self.now.get() + by;
        self.now.set(next);
        next
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new()
    }
}

/// A library store with a recorder, an engine and a clock.
pub struct Library {
    pub storage: StorageEngine,
    pub recorder: Recorder,
    pub engine: ReificationEngine,
    pub clock: Timeline,
}

impl Library {
    pub fn in_memory() -> Self {
        Self::in_memory_with(ReifyConfig::default())
    }

    pub fn in_memory_with(config: ReifyConfig) -> Self {
        let storage = StorageEngine::open_in_memory()
            .unwrap_or_else(|e| panic!("in-memory store: {e}"));
        Self::wire(storage, config)
    }

    /// File-backed store in WAL mode, for tests that need snapshot isolation.
    pub fn on_disk(path: &Path) -> Self {
        let storage = StorageEngine::open_with_config(path, &StorageConfig::default())
            .unwrap_or_else(|e| panic!("store at {}: {e}", path.display()));
        Self::wire(storage, ReifyConfig::default())
    }

    fn wire(storage: StorageEngine, config: ReifyConfig) -> Self {
        let schema = library_schema();
        let recorder = storage.recorder(Arc::clone(&schema));
        let engine = ReificationEngine::from_storage(&storage, schema, config);
        Self {
            storage,
            recorder,
            engine,
            clock: Timeline::new(),
        }
    }

    pub fn create(&self, kind: &str, attributes: AttributeSet) -> i64 {
        self.recorder
            .create(kind, attributes, self.clock.tick())
            .unwrap_or_else(|e| panic!("create {kind}: {e}"))
    }

    pub fn create_chapter(&self, name: &str) -> i64 {
        self.create(CHAPTER, AttributeSet::new().with("name", name))
    }

    pub fn create_section(&self, chapter_id: i64, name: &str) -> i64 {
        self.create(
            SECTION,
            AttributeSet::new().with("name", name).with("chapter_id", chapter_id),
        )
    }

    pub fn create_paragraph(&self, section_id: i64, name: &str) -> i64 {
        self.create(
            PARAGRAPH,
            AttributeSet::new().with("name", name).with("section_id", section_id),
        )
    }

    pub fn update(&self, kind: &str, id: i64, changes: AttributeSet) -> Option<u64> {
        self.recorder
            .update(kind, id, changes, self.clock.tick())
            .unwrap_or_else(|e| panic!("update {kind}#{id}: {e}"))
    }

    pub fn rename(&self, kind: &str, id: i64, name: &str) -> Option<u64> {
        self.update(kind, id, AttributeSet::new().with("name", name))
    }

    pub fn destroy(&self, kind: &str, id: i64) -> Vec<u64> {
        self.recorder
            .destroy(kind, id, self.clock.tick())
            .unwrap_or_else(|e| panic!("destroy {kind}#{id}: {e}"))
    }

    pub fn versions(&self, kind: &str, id: i64) -> Vec<VersionRecord> {
        self.engine
            .list_versions(kind, id)
            .unwrap_or_else(|e| panic!("versions of {kind}#{id}: {e}"))
    }

    /// Sequence of the most recent version of an entity.
    pub fn last_version(&self, kind: &str, id: i64) -> u64 {
        self.versions(kind, id)
            .last()
            .map(|v| v.sequence)
            .unwrap_or_else(|| panic!("{kind}#{id} has no versions"))
    }
}

/// `name` of each entity, in order.
pub fn names(entities: &[HistoricalEntity]) -> Vec<String> {
    entities
        .iter()
        .map(|e| e.text("name").unwrap_or_default().to_string())
        .collect()
}

/// Nested collection of a reified entity; panics if it was not loaded.
pub fn nested<'a>(entity: &'a HistoricalEntity, relationship: &str) -> &'a [HistoricalEntity] {
    entity
        .association(relationship)
        .unwrap_or_else(|| panic!("{relationship} not loaded on {}", entity.item_type()))
}

static TRACING: Once = Once::new();

/// Install a test subscriber filtered by `HINDSIGHT_LOG` (e.g. `hindsight_reify=debug`).
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_env("HINDSIGHT_LOG")
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
