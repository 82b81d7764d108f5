// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Point octree basics.
//!
//! Build a small octree, look up a point, and update its payload.
//!
//! Run:
//! - `cargo run -p octree_demos --example point_octree_basics`

use octree::Octree;
use octree_core::types::{Box3, Point3};

fn main() {
    let bounds = Box3::new((0.0, 10.0), (0.0, 10.0), (0.0, 10.0));
    let mut tree = Octree::<&str>::new(bounds);

    tree.insert(Point3::new(1.0, 2.0, 3.0), "lamppost").unwrap();
    tree.insert(Point3::new(8.0, 1.0, 4.0), "mailbox").unwrap();
    tree.insert(Point3::new(5.0, 5.0, 5.0), "fountain").unwrap();
    println!("stored {} points", tree.len());

    let p = Point3::new(1.0, 2.0, 3.0);
    assert_eq!(tree.get(p), Some(&"lamppost"));

    tree.update(p, "streetlamp").unwrap();
    assert_eq!(tree.get(p), Some(&"streetlamp"));

    let out_of_bounds = Point3::new(20.0, 20.0, 20.0);
    assert!(tree.insert(out_of_bounds, "nowhere").is_err());
    println!("insert outside bounds was rejected as expected");
}
