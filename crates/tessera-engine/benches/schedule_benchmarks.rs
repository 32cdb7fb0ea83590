//! Scheduling benchmarks: catalog commit, order resolution, and the per-pass
//! overhead of driving a world with many small systems.
//!
//! Run with: `cargo bench --bench schedule_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tessera_engine::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `count` fixed systems in layers of eight; each system runs after every
/// system of the previous layer.
/// Odd-numbered systems are gated on `tag` when one is given.
fn add_layers(builder: &mut CatalogBuilder, count: usize, tag: Option<Tag>) {
    for i in 0..count {
        let mut desc = SystemDescriptor::fixed(&format!("sys{i:05}"), |_w| {
            Box::new(|_w: &mut World, dt: f32| {
                black_box(dt);
            })
        });
        let layer = i / 8;
        if layer > 0 {
            for dep in (layer - 1) * 8..layer * 8 {
                desc = desc.after(&format!("sys{dep:05}"));
            }
        }
        if let (Some(tag), true) = (tag, i % 2 == 1) {
            desc = desc.run_if(tag);
        }
        builder.system(desc);
    }
}

fn layered_builder(count: usize) -> CatalogBuilder {
    let mut builder = CatalogBuilder::new();
    add_layers(&mut builder, count, None);
    builder
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");
    for count in [64, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_with_setup(
                || layered_builder(count),
                |builder| black_box(builder.build().unwrap()),
            );
        });
    }
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_order");
    for count in [64, 256, 1024] {
        let catalog = layered_builder(count).build().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(count), &catalog, |b, catalog| {
            b.iter(|| black_box(catalog.graph().resolve_order(SystemKind::Fixed).unwrap()));
        });
    }
    group.finish();
}

fn bench_fixed_pass(c: &mut Criterion) {
    let mut builder = CatalogBuilder::new();
    let debug = builder.tag("debug").unwrap();
    add_layers(&mut builder, 256, Some(debug));
    let catalog = builder.build().unwrap();

    let mut world = World::new(catalog, &[]).unwrap();
    world.construct_systems();
    c.bench_function("update_fixed_256_half_gated", |b| {
        b.iter(|| world.update_fixed(black_box(1.0 / 60.0)));
    });
}

criterion_group!(benches, bench_commit, bench_resolve, bench_fixed_pass);
criterion_main!(benches);
