//! Benchmark: nested reification of a chapter with 20 sections × 10 paragraphs,
//! each renamed once, at an instant in the middle of its history.

use criterion::{criterion_group, criterion_main, Criterion};

use hindsight_core::traits::IReificationEngine;
use test_fixtures::{Library, PARAGRAPH, SECTION};

fn populated_library() -> (Library, i64) {
    let lib = Library::in_memory();
    let chapter = lib.create_chapter("bench");
    for s in 0..20 {
        let section = lib.create_section(chapter, &format!("section {s}"));
        for p in 0..10 {
            let paragraph = lib.create_paragraph(section, &format!("paragraph {s}.{p}"));
            lib.rename(PARAGRAPH, paragraph, &format!("paragraph {s}.{p} (edited)"));
        }
        lib.rename(SECTION, section, &format!("section {s} (edited)"));
    }
    (lib, chapter)
}

fn bench_nested_reify(c: &mut Criterion) {
    let (lib, chapter) = populated_library();
    let midpoint = lib.clock.now() - chrono::Duration::seconds(120);

    c.bench_function("reify_nested_20x10", |b| {
        b.iter(|| {
            let _entity = lib
                .engine
                .reify(test_fixtures::CHAPTER, chapter, midpoint, true)
                .unwrap();
        });
    });

    c.bench_function("reify_shallow", |b| {
        b.iter(|| {
            let _entity = lib
                .engine
                .reify(test_fixtures::CHAPTER, chapter, midpoint, false)
                .unwrap();
        });
    });
}

criterion_group!(benches, bench_nested_reify);
criterion_main!(benches);
