// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compares `BlobOctree::intersect_with_box` against `rstar`'s R-tree doing
//! the equivalent envelope-intersection query, over the same extent boxes.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use octree::BlobOctree;
use octree_core::types::{Box3, Point3};
use rstar::{AABB, RTree, RTreeObject};

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

#[derive(Clone, Copy)]
struct Blob {
    center: [f64; 3],
    half: f64,
    id: u32,
}

impl RTreeObject for Blob {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        let lo = self.center.map(|v| v - self.half);
        let hi = self.center.map(|v| v + self.half);
        AABB::from_corners(lo, hi)
    }
}

fn gen_blobs(n: usize, seed: u64) -> Vec<Blob> {
    let mut rng = Rng::new(seed);
    (0..n)
        .map(|i| Blob {
            center: [rng.next_f64(), rng.next_f64(), rng.next_f64()],
            half: 0.01 + rng.next_f64() * 0.02,
            id: i as u32,
        })
        .collect()
}

fn to_box3(b: &Blob) -> Box3 {
    Box3::new(
        (b.center[0] - b.half, b.center[0] + b.half),
        (b.center[1] - b.half, b.center[1] + b.half),
        (b.center[2] - b.half, b.center[2] + b.half),
    )
}

fn bench_intersect_with_box(c: &mut Criterion) {
    let mut group = c.benchmark_group("intersect_with_box");
    let query = Box3::new((0.3, 0.5), (0.3, 0.5), (0.3, 0.5));
    let query_envelope = AABB::from_corners([0.3, 0.3, 0.3], [0.5, 0.5, 0.5]);
    for &n in &[100usize, 1_000, 10_000] {
        let blobs = gen_blobs(n, 7);

        let mut octree = BlobOctree::<u32>::new(bounds());
        for blob in &blobs {
            octree.insert(Point3::new(blob.center[0], blob.center[1], blob.center[2]), to_box3(blob), blob.id).unwrap();
        }

        let rtree = RTree::bulk_load(blobs.clone());

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("blob_octree", n), &octree, |b, octree| {
            b.iter(|| black_box(octree.intersect_with_box(query).count()));
        });
        group.bench_with_input(BenchmarkId::new("rstar", n), &rtree, |b, rtree| {
            b.iter(|| black_box(rtree.locate_in_envelope_intersecting(&query_envelope).count()));
        });
    }
    group.finish();
}

fn bench_possible_overlaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("possible_overlaps");
    for &n in &[100usize, 500, 2_000] {
        let blobs_a = gen_blobs(n, 11);
        let blobs_b = gen_blobs(n, 13);

        let mut a = BlobOctree::<u32>::new(bounds());
        for blob in &blobs_a {
            a.insert(Point3::new(blob.center[0], blob.center[1], blob.center[2]), to_box3(blob), blob.id).unwrap();
        }
        let mut b_tree = BlobOctree::<u32>::new(bounds());
        for blob in &blobs_b {
            b_tree.insert(Point3::new(blob.center[0], blob.center[1], blob.center[2]), to_box3(blob), blob.id).unwrap();
        }

        let rtree_b = RTree::bulk_load(blobs_b.clone());

        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("blob_octree", n), &(&a, &b_tree), |bencher, (a, b_tree)| {
            bencher.iter(|| black_box(a.possible_overlaps(b_tree).count()));
        });
        group.bench_with_input(BenchmarkId::new("rstar_per_item_query", n), &(&blobs_a, &rtree_b), |bencher, (blobs_a, rtree_b)| {
            bencher.iter(|| {
                let mut count = 0usize;
                for blob in blobs_a.iter() {
                    count += rtree_b.locate_in_envelope_intersecting(&blob.envelope()).count();
                }
                black_box(count)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_intersect_with_box, bench_possible_overlaps);
criterion_main!(benches);
