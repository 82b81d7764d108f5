// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blob octree basics: inserting extended objects and querying by extent.
//!
//! Run:
//! - `cargo run -p octree_demos --example blob_octree_basics`

use octree::BlobOctree;
use octree_core::types::{Box3, Point3};

fn main() {
    let bounds = Box3::new((0.0, 100.0), (0.0, 100.0), (0.0, 100.0));
    let mut buildings = BlobOctree::<&str>::new(bounds);

    buildings
        .insert(
            Point3::new(10.0, 10.0, 0.0),
            Box3::new((5.0, 15.0), (5.0, 15.0), (0.0, 20.0)),
            "warehouse",
        )
        .unwrap();
    buildings
        .insert(
            Point3::new(50.0, 50.0, 0.0),
            Box3::new((45.0, 55.0), (45.0, 55.0), (0.0, 60.0)),
            "tower",
        )
        .unwrap();
    println!("stored {} buildings", buildings.len());

    let query_box = Box3::new((0.0, 20.0), (0.0, 20.0), (0.0, 100.0));
    let hits: Vec<_> = buildings.intersect_with_box(query_box).map(|(_, _, name)| *name).collect();
    println!("buildings overlapping {query_box:?}: {hits:?}");
    assert_eq!(hits, vec!["warehouse"]);

    let beam_hits: Vec<_> = buildings
        .intersect_with_line(Point3::new(50.0, 50.0, 100.0), Point3::new(0.0, 0.0, -1.0), true)
        .map(|(_, _, name)| *name)
        .collect();
    println!("buildings hit by vertical beam over the tower: {beam_hits:?}");
    assert_eq!(beam_hits, vec!["tower"]);
}
