//! Benchmarks for key resolution and rendering.
//!
//! Compares exact lookup against the group.slot fallback, which walks the
//! whole document, at several document sizes.

// Criterion macros generate items without docs - this is expected for benchmarks
// Benchmarks use expect/unwrap for simplicity - panics are acceptable in benchmarks
#![allow(missing_docs)]
#![allow(clippy::expect_used, clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use promptree::{Document, KeyPath, KeyResolver, PromptKey, render};
use std::collections::HashMap;
use std::hint::black_box;

// ============================================================================
// Helper Functions
// ============================================================================

/// Builds a document with `modules` modules of ten classes of five methods each.
fn build_document(modules: usize) -> Document {
    let mut document = Document::new();
    for m in 0..modules {
        for c in 0..10 {
            for f in 0..5 {
                let key = KeyPath::parse(&format!("pkg.mod{m}.Cls{m}_{c}.fn{f}")).unwrap();
                document.insert_leaf_if_absent(&key, "Hello {name}, task {task}");
            }
        }
    }
    document
}

// ============================================================================
// Benchmarks
// ============================================================================

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    for modules in [10, 100, 1_000] {
        let document = build_document(modules);
        let resolver = KeyResolver::new(&document);
        let last = modules - 1;
        let exact = PromptKey::parse(&format!("pkg.mod{last}.Cls{last}_9.fn4")).unwrap();
        let fallback = PromptKey::parse(&format!("Cls{last}_9.fn4")).unwrap();

        group.bench_with_input(BenchmarkId::new("exact", modules), &exact, |b, key| {
            b.iter(|| resolver.resolve(black_box(key)).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("fallback", modules), &fallback, |b, key| {
            b.iter(|| resolver.resolve(black_box(key)).unwrap());
        });
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let template = "Hello {name}, task {task}";
    let variables = HashMap::from([
        ("name".to_string(), "World".to_string()),
        ("task".to_string(), "ship it".to_string()),
    ]);

    c.bench_function("render", |b| {
        b.iter(|| render(black_box(template), black_box(&variables)).unwrap());
    });
}

criterion_group!(benches, bench_resolve, bench_render);
criterion_main!(benches);
