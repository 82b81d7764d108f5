// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bulk builder: constructs a [`Tree`] from a list of `(coords, payload)`
//! pairs in `O(n log n)` via in-place partitioning, rather than `n`
//! successive `insert`s.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::pivot::pivot;
use crate::tree::Tree;
use crate::types::{Box3, subboxes};

/// Builds a [`Tree`] over `bounds` from `items`.
///
/// Partitions the slice by x at the midpoint, each half by y, each quarter
/// by z, yielding the eight octant slices, then recurses into each. Produces
/// a tree equal (as a set of entries) to repeatedly calling
/// [`Tree::insert`][crate::tree::Tree::insert] over the same points, but
/// without the `O(depth)` allocation per insertion.
///
/// Callers are responsible for ensuring `items` carries pairwise-distinct
/// coordinates, all within `bounds`; this function does not validate either
/// (the facade's `check_bounds` does that at the call site).
#[must_use]
pub fn octree_from_list<D: Clone>(
    bounds: Box3,
    items: impl IntoIterator<Item = (crate::types::Point3, D)>,
) -> Tree<D> {
    let mut items: Vec<_> = items.into_iter().collect();
    let len = items.len();
    build(bounds, &mut items, 0, len)
}

fn build<D: Clone>(bounds: Box3, items: &mut [(crate::types::Point3, D)], start: usize, stop: usize) -> Tree<D> {
    if start == stop {
        return Tree::Empty;
    }
    if start + 1 == stop {
        let (p, d) = items[start].clone();
        return Tree::Singleton(p, d);
    }
    let c = bounds.centroid();
    let n4 = pivot(items, |t| t.0.x < c.x, start, stop);
    let n2 = pivot(items, |t| t.0.y < c.y, start, n4);
    let n6 = pivot(items, |t| t.0.y < c.y, n4, stop);
    let n1 = pivot(items, |t| t.0.z < c.z, start, n2);
    let n3 = pivot(items, |t| t.0.z < c.z, n2, n4);
    let n5 = pivot(items, |t| t.0.z < c.z, n4, n6);
    let n7 = pivot(items, |t| t.0.z < c.z, n6, stop);

    let subs = subboxes(bounds);
    let starts = [start, n1, n2, n3, n4, n5, n6, n7];
    let stops = [n1, n2, n3, n4, n5, n6, n7, stop];

    // Recurse octant by octant; each slice is built over the same backing
    // array, so no allocation happens beyond the final `Node` storage.
    let mut built: [Option<Tree<D>>; 8] = Default::default();
    for i in 0..8 {
        built[i] = Some(build(subs[i], items, starts[i], stops[i]));
    }
    Tree::Node(Arc::new(built.map(|t| t.expect("every slot filled above"))))
}
