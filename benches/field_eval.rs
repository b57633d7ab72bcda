//! Benchmarks for blobtree field evaluation

use blobtree::prelude::*;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::DVec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_points(count: usize, extent: f64) -> Vec<DVec3> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..count)
        .map(|_| {
            DVec3::new(
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
                rng.gen_range(-extent..extent),
            )
        })
        .collect()
}

/// Chain of convolution segments with tapering thickness
fn limb_chain(segments: usize, model: FieldModel) -> Blobtree {
    let mut tree = Blobtree::new();
    let root = tree.root();
    let blend = tree.create_ricci(2.0);
    for i in 0..segments {
        let x = i as f64 * 0.8;
        let t0 = 0.6 - 0.02 * i as f64;
        let s = tree.create_segment(
            [
                ThickVertex::new(DVec3::new(x, 0.0, 0.0), t0),
                ThickVertex::new(DVec3::new(x + 0.8, 0.1, 0.0), t0 - 0.02),
            ],
            [Material::default(); 2],
            model,
        );
        tree.add_child(blend, s).unwrap();
    }
    tree.add_child(root, blend).unwrap();
    tree.prepare_for_eval();
    tree
}

fn bench_primitives(c: &mut Criterion) {
    let mut group = c.benchmark_group("primitives");
    let p = DVec3::new(0.3, 0.2, 0.1);

    group.bench_function("point", |b| {
        let mut tree = Blobtree::new();
        let root = tree.root();
        let id = tree.create_point(ThickVertex::new(DVec3::ZERO, 1.0), Material::default());
        tree.add_child(root, id).unwrap();
        tree.prepare_for_eval();
        b.iter(|| tree.value_at(black_box(p)))
    });

    for model in [FieldModel::Distance, FieldModel::Convolution] {
        group.bench_function(BenchmarkId::new("segment", format!("{:?}", model)), |b| {
            let tree = limb_chain(1, model);
            b.iter(|| tree.sample_at(black_box(p)))
        });
        group.bench_function(BenchmarkId::new("triangle", format!("{:?}", model)), |b| {
            let mut tree = Blobtree::new();
            let root = tree.root();
            let id = tree.create_triangle(
                [
                    ThickVertex::new(DVec3::ZERO, 0.3),
                    ThickVertex::new(DVec3::X, 0.4),
                    ThickVertex::new(DVec3::Y, 0.5),
                ],
                [Material::default(); 3],
                model,
            );
            tree.add_child(root, id).unwrap();
            tree.prepare_for_eval();
            b.iter(|| tree.sample_at(black_box(p)))
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let tree = limb_chain(16, FieldModel::Convolution);

    for size in [1_000, 10_000, 100_000] {
        let points = random_points(size, 8.0);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("sequential", size), &points, |b, pts| {
            b.iter(|| eval_batch(&tree, black_box(pts)))
        });
        group.bench_with_input(BenchmarkId::new("parallel", size), &points, |b, pts| {
            b.iter(|| eval_batch_parallel(&tree, black_box(pts)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_primitives, bench_batch);
criterion_main!(benches);
