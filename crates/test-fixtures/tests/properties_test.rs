//! Properties of reification that hold for any recorded history.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;

use hindsight_core::models::{AbsenceReason, AttributeSet, SnapshotSource};
use hindsight_core::traits::IReificationEngine;
use test_fixtures::{names, nested, Library, CHAPTER, SECTION};

// ═══════════════════════════════════════════════════════════════════════════
// Live entities without history
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn untracked_live_entity_reifies_to_its_live_attributes() {
    let lib = Library::in_memory();
    let id = lib
        .recorder
        .insert_untracked(CHAPTER, AttributeSet::new().with("name", "legacy"))
        .unwrap();

    let entity = lib
        .engine
        .reify(CHAPTER, id, lib.clock.now(), false)
        .unwrap()
        .unwrap();
    assert_eq!(entity.text("name"), Some("legacy"));
    assert_eq!(entity.source(), SnapshotSource::Live);
    assert_eq!(
        entity.attributes(),
        &AttributeSet::new().with("id", id).with("name", "legacy")
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Destroyed entities
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn destroyed_entity_is_absent_afterwards_with_its_graph() {
    let lib = Library::in_memory();
    let chapter = lib.create_chapter("doomed");
    let section = lib.create_section(chapter, "s");
    lib.destroy(CHAPTER, chapter);
    let destroyed_at = lib.clock.now();

    for at in [destroyed_at, destroyed_at + Duration::days(1)] {
        assert!(lib.engine.reify(CHAPTER, chapter, at, true).unwrap().is_none());
        assert!(lib.engine.reify(SECTION, section, at, true).unwrap().is_none());
    }
    assert_eq!(
        lib.engine
            .resolve_existence(SECTION, section, destroyed_at)
            .unwrap()
            .absence_reason(),
        Some(AbsenceReason::Destroyed)
    );
}

#[test]
fn destroyed_entity_reifies_before_its_destroy() {
    let lib = Library::in_memory();
    let chapter = lib.create_chapter("doomed");
    lib.create_section(chapter, "s");
    lib.rename(CHAPTER, chapter, "still here");
    let before = lib.clock.now();
    let written = lib.destroy(CHAPTER, chapter);

    let entity = lib.engine.reify(CHAPTER, chapter, before, true).unwrap().unwrap();
    assert_eq!(entity.text("name"), Some("still here"));
    assert_eq!(names(nested(&entity, "sections")), vec!["s"]);
    assert_eq!(
        entity.source(),
        SnapshotSource::Version {
            sequence: *written.last().unwrap()
        }
    );
}

// ═══════════════════════════════════════════════════════════════════════════
// Resolution edge cases
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn exact_version_instant_sees_the_post_state() {
    let lib = Library::in_memory();
    let chapter = lib.create_chapter("before");
    lib.rename(CHAPTER, chapter, "after");
    let renamed_at = lib.clock.now();

    let at = |t| lib.engine.reify(CHAPTER, chapter, t, false).unwrap().unwrap();
    assert_eq!(at(renamed_at).text("name"), Some("after"));
    assert_eq!(
        at(renamed_at - Duration::microseconds(1)).text("name"),
        Some("before")
    );
}

#[test]
fn existence_reports_why_an_entity_is_absent() {
    let lib = Library::in_memory();
    let before_anything = lib.clock.now();
    let chapter = lib.create_chapter("ch");

    let reason = |id, at| {
        lib.engine
            .resolve_existence(CHAPTER, id, at)
            .unwrap()
            .absence_reason()
    };
    assert_eq!(reason(chapter, before_anything), Some(AbsenceReason::NotYetCreated));
    assert_eq!(reason(chapter + 100, lib.clock.now()), Some(AbsenceReason::NeverExisted));
    assert_eq!(reason(chapter, lib.clock.now()), None);
}

#[test]
fn reify_is_idempotent() {
    let lib = Library::in_memory();
    let chapter = lib.create_chapter("ch");
    let section = lib.create_section(chapter, "s");
    lib.create_paragraph(section, "p");
    lib.rename(SECTION, section, "s2");
    let at = lib.clock.now() - Duration::milliseconds(500);

    let first = lib.engine.reify(CHAPTER, chapter, at, true).unwrap();
    let second = lib.engine.reify(CHAPTER, chapter, at, true).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

// ═══════════════════════════════════════════════════════════════════════════
// Model-checked history
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Op {
    AddSection,
    RenameSection(usize),
    DestroySection(usize),
    RenameChapter,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => Just(Op::AddSection),
        2 => (0usize..8).prop_map(Op::RenameSection),
        2 => (0usize..8).prop_map(Op::DestroySection),
        1 => Just(Op::RenameChapter),
    ]
}

/// Replays `ops`, returning each instant with the sections live right after it.
fn replay(lib: &Library, chapter: i64, ops: &[Op]) -> Vec<(DateTime<Utc>, BTreeMap<i64, String>)> {
    let mut live: BTreeMap<i64, String> = BTreeMap::new();
    let mut timeline = vec![(lib.clock.now(), live.clone())];

    for (step, op) in ops.iter().enumerate() {
        let pick = |idx: usize| live.keys().nth(idx % live.len().max(1)).copied();
        match op {
            Op::AddSection => {
                let name = format!("section {step}");
                let id = lib.create_section(chapter, &name);
                live.insert(id, name);
            }
            Op::RenameSection(idx) => {
                let Some(id) = pick(*idx) else { continue };
                let name = format!("renamed {step}");
                lib.rename(SECTION, id, &name);
                live.insert(id, name);
            }
            Op::DestroySection(idx) => {
                let Some(id) = pick(*idx) else { continue };
                lib.destroy(SECTION, id);
                live.remove(&id);
            }
            Op::RenameChapter => {
                lib.rename(CHAPTER, chapter, &format!("chapter {step}"));
            }
        }
        timeline.push((lib.clock.now(), live.clone()));
    }
    timeline
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn sections_at_every_instant_match_the_replayed_model(ops in prop::collection::vec(op(), 1..12)) {
        let lib = Library::in_memory();
        let chapter = lib.create_chapter("chapter");
        let timeline = replay(&lib, chapter, &ops);

        for (at, expected) in &timeline {
            let entity = lib.engine.reify(CHAPTER, chapter, *at, true).unwrap().unwrap();
            let sections = nested(&entity, "sections");
            let ids: Vec<i64> = sections.iter().map(|s| s.item_id()).collect();
            prop_assert_eq!(ids, expected.keys().copied().collect::<Vec<_>>());
            prop_assert_eq!(names(sections), expected.values().cloned().collect::<Vec<_>>());
        }
    }

    #[test]
    fn destroyed_sections_never_reappear(ops in prop::collection::vec(op(), 1..12)) {
        let lib = Library::in_memory();
        let chapter = lib.create_chapter("chapter");
        let timeline = replay(&lib, chapter, &ops);

        for window in timeline.windows(2) {
            let (earlier, later) = (&window[0], &window[1]);
            let at_later = lib.engine.reify(CHAPTER, chapter, later.0, true).unwrap().unwrap();
            for section in nested(&at_later, "sections") {
                let id = section.item_id();
                let gone_earlier = !earlier.1.contains_key(&id)
                    && lib.engine.resolve_existence(SECTION, id, earlier.0).unwrap().absence_reason()
                        == Some(AbsenceReason::Destroyed);
                prop_assert!(!gone_earlier, "section {} came back", id);
            }
        }
    }
}
