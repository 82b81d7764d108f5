// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Nearest-neighbour and cross-tree proximity queries.
//!
//! Run:
//! - `cargo run -p octree_demos --example point_octree_proximity`

use octree::Octree;
use octree_core::types::{Box3, Point3};

fn main() {
    let bounds = Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0));

    let mut sensors = Octree::<&str>::new(bounds);
    sensors.insert(Point3::new(0.1, 0.1, 0.1), "sensor-a").unwrap();
    sensors.insert(Point3::new(0.9, 0.9, 0.9), "sensor-b").unwrap();
    sensors.insert(Point3::new(0.5, 0.5, 0.1), "sensor-c").unwrap();

    let query = Point3::new(0.45, 0.5, 0.2);
    let (dist, at, name) = sensors.nearest_to_point(query).unwrap();
    println!("nearest sensor to {query:?} is {name} at {at:?}, distance {dist:.4}");
    assert_eq!(*name, "sensor-c");

    let nearby: Vec<_> = sensors.near_point(query, 0.5).map(|(_, _, name)| *name).collect();
    println!("sensors within 0.5: {nearby:?}");

    let mut relays = Octree::<&str>::new(bounds);
    relays.insert(Point3::new(0.48, 0.52, 0.18), "relay-1").unwrap();
    relays.insert(Point3::new(0.0, 0.0, 0.0), "relay-2").unwrap();

    let pairs = sensors.pairs_by_distance(&relays, 0.1);
    for (dist, s, r, sensor_name, relay_name) in &pairs {
        println!("{sensor_name} <-> {relay_name}: {dist:.4} ({s:?} - {r:?})");
    }
    assert!(!pairs.is_empty());
}
