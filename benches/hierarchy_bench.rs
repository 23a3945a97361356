//! Per-frame update cost of the hierarchy graph.
//!
//! Run with `cargo bench --bench hierarchy_bench`.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use strata::prelude::*;

/// Builds `roots` trees, each a chain of `depth` nodes with `fanout` leaves
/// hanging off every chain node.
fn build_scene(roots: usize, depth: usize, fanout: usize) -> (TransformStore, HierarchyGraph, Vec<Handle>) {
    let ids = IdentifierSource::new();
    let config = StoreConfig::default().with_initial_slot_count(1024);
    let mut store = TransformStore::with_identifiers(config, ids.clone()).unwrap();
    let mut graph = HierarchyGraph::with_identifiers(ids);
    let mut movers = Vec::with_capacity(roots);

    for _ in 0..roots {
        let root = graph.root_add(&mut store);
        movers.push(graph.xform_handle_get(root));
        let mut parent = root;
        for _ in 0..depth {
            let node = graph.child_add(&mut store, parent);
            store.position_set(graph.xform_handle_get(node), Vec3::X);
            for _ in 0..fanout {
                let leaf = graph.child_add(&mut store, node);
                store.position_set(graph.xform_handle_get(leaf), Vec3::Y);
            }
            parent = node;
        }
    }
    graph.update(&mut store, 0);
    (store, graph, movers)
}

fn bench_update_all_dirty(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_all_roots_moved");
    for roots in [16, 128, 512] {
        let (mut store, mut graph, movers) = build_scene(roots, 8, 4);
        let mut frame = 1;
        group.bench_with_input(BenchmarkId::from_parameter(graph.len()), &roots, |b, _| {
            b.iter(|| {
                for &xform in &movers {
                    store.translate(xform, Vec3::Z * 0.01);
                }
                frame += 1;
                black_box(graph.update(&mut store, frame))
            });
        });
    }
    group.finish();
}

fn bench_update_clean(c: &mut Criterion) {
    let (mut store, mut graph, _) = build_scene(512, 8, 4);
    let mut frame = 1;
    c.bench_function("update_clean", |b| {
        b.iter(|| {
            frame += 1;
            black_box(graph.update(&mut store, frame))
        });
    });
}

fn bench_create_destroy(c: &mut Criterion) {
    c.bench_function("create_destroy_1k", |b| {
        let mut store = TransformStore::new();
        let mut handles = Vec::with_capacity(1000);
        b.iter(|| {
            handles.extend((0..1000).map(|_| store.create()));
            for h in &mut handles {
                store.destroy(h);
            }
            handles.clear();
        });
    });
}

criterion_group!(
    benches,
    bench_update_all_dirty,
    bench_update_clean,
    bench_create_destroy
);
criterion_main!(benches);
