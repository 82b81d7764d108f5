// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-tree overlap joins between two blob octrees, e.g. colliders vs.
//! trigger volumes.
//!
//! Run:
//! - `cargo run -p octree_demos --example blob_octree_overlaps`

use octree::BlobOctree;
use octree_core::types::{Box3, Point3};

fn main() {
    let bounds = Box3::new((0.0, 100.0), (0.0, 100.0), (0.0, 100.0));

    let mut colliders = BlobOctree::<&str>::new(bounds);
    colliders
        .insert(Point3::new(10.0, 10.0, 10.0), Box3::new((5.0, 15.0), (5.0, 15.0), (5.0, 15.0)), "crate")
        .unwrap();
    colliders
        .insert(Point3::new(80.0, 80.0, 10.0), Box3::new((75.0, 85.0), (75.0, 85.0), (5.0, 15.0)), "barrel")
        .unwrap();

    let mut triggers = BlobOctree::<&str>::new(bounds);
    triggers
        .insert(Point3::new(12.0, 12.0, 12.0), Box3::new((0.0, 20.0), (0.0, 20.0), (0.0, 20.0)), "spawn-zone")
        .unwrap();
    triggers
        .insert(Point3::new(50.0, 50.0, 50.0), Box3::new((40.0, 60.0), (40.0, 60.0), (40.0, 60.0)), "safe-zone")
        .unwrap();

    let overlaps: Vec<_> =
        colliders.possible_overlaps(&triggers).map(|((_, _, c), (_, _, t))| (*c, *t)).collect();
    println!("possibly-overlapping (collider, trigger) pairs: {overlaps:?}");
    assert_eq!(overlaps, vec![("crate", "spawn-zone")]);

    for (collider, matches) in colliders.by_possible_overlap(&triggers) {
        let (_, _, name) = collider;
        let names: Vec<_> = matches.iter().map(|(_, _, t)| *t).collect();
        println!("{name} possibly overlaps: {names:?}");
    }
}
