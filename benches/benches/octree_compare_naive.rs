// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compares `Octree` insert/query operations against a naive `Vec`-scan
//! baseline over the same data.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use octree::Octree;
use octree_core::build::octree_from_list;
use octree_core::types::{Box3, Point3, euclidean_point_point};

/// Small xorshift generator, seeded so every run sees the same data.
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Rng(seed.wrapping_mul(0x9E3779B97F4A7C15) | 1)
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }
}

fn bounds() -> Box3 {
    Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0))
}

fn gen_points(n: usize, seed: u64) -> Vec<(Point3, u32)> {
    let mut rng = Rng::new(seed);
    (0..n).map(|i| (Point3::new(rng.next_f64(), rng.next_f64(), rng.next_f64()), i as u32)).collect()
}

fn naive_nearest(points: &[(Point3, u32)], query: Point3) -> Option<(f64, Point3, u32)> {
    points
        .iter()
        .map(|(p, d)| (euclidean_point_point(query, *p), *p, *d))
        .fold(None, |acc, cur| match acc {
            None => Some(cur),
            Some(best) if cur.0 < best.0 => Some(cur),
            Some(best) => Some(best),
        })
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for &n in &[100usize, 1_000, 10_000] {
        let items = gen_points(n, 1);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("octree_from_list", n), &items, |b, items| {
            b.iter(|| black_box(octree_from_list(bounds(), items.iter().copied())));
        });
        group.bench_with_input(BenchmarkId::new("vec_collect", n), &items, |b, items| {
            b.iter(|| black_box(items.clone()));
        });
    }
    group.finish();
}

fn bench_nearest_to_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_to_point");
    for &n in &[100usize, 1_000, 10_000] {
        let points = gen_points(n, 2);
        let mut tree = Octree::<u32>::new(bounds());
        for (p, d) in &points {
            tree.insert(*p, *d).unwrap();
        }
        let query = Point3::new(0.5, 0.5, 0.5);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("octree", n), &tree, |b, tree| {
            b.iter(|| black_box(tree.nearest_to_point(query)));
        });
        group.bench_with_input(BenchmarkId::new("naive_scan", n), &points, |b, points| {
            b.iter(|| black_box(naive_nearest(points, query)));
        });
    }
    group.finish();
}

fn bench_near_point(c: &mut Criterion) {
    let mut group = c.benchmark_group("near_point");
    for &n in &[100usize, 1_000, 10_000] {
        let points = gen_points(n, 3);
        let mut tree = Octree::<u32>::new(bounds());
        for (p, d) in &points {
            tree.insert(*p, *d).unwrap();
        }
        let query = Point3::new(0.5, 0.5, 0.5);
        let epsilon = 0.1;
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("octree", n), &tree, |b, tree| {
            b.iter(|| black_box(tree.near_point(query, epsilon).count()));
        });
        group.bench_with_input(BenchmarkId::new("naive_scan", n), &points, |b, points| {
            b.iter(|| {
                black_box(
                    points.iter().filter(|(p, _)| euclidean_point_point(query, *p) < epsilon).count(),
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_nearest_to_point, bench_near_point);
criterion_main!(benches);
