// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Octree Core: a persistent, immutable spatial index over 3D Euclidean space.
//!
//! The central type is [`Tree`], an octree mapping points to payloads.
//! Every mutating operation (`insert`, `update`, `remove`, `union`, `rebound`,
//! `deform`) returns a new tree and leaves the receiver untouched; structural
//! sharing between the old and new trees is automatic, since unaffected
//! subtrees are `Arc`-cloned rather than copied.
//!
//! [`blob::BlobTree`] is the companion structure for extended objects: each
//! entry carries an extent box alongside its reference point, and every
//! internal node caches the union of its descendants' extents, which is what
//! makes extent-indexed queries and cross-tree overlap joins output-sensitive
//! rather than quadratic.
//!
//! Neither tree stores its own bounding box; every operation threads the
//! enclosing [`types::Box3`] down from the caller, so the same tree can be
//! viewed under different bounds by different callers without copying.
//!
//! # Example
//!
//! ```rust
//! use octree_core::tree::Tree;
//! use octree_core::types::{Box3, Point3};
//!
//! let bounds = Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0));
//! let t = Tree::<&str>::new();
//! let t = t.insert(bounds, Point3::new(0.2, 0.2, 0.2), "a").unwrap();
//! let t = t.insert(bounds, Point3::new(0.8, 0.8, 0.8), "b").unwrap();
//! assert_eq!(t.len(), 2);
//! assert_eq!(t.get(bounds, Point3::new(0.2, 0.2, 0.2)), Some(&"a"));
//! ```
//!
//! Large batches are cheaper to build in one pass than via repeated
//! `insert`:
//!
//! ```rust
//! use octree_core::build::octree_from_list;
//! use octree_core::types::{Box3, Point3};
//!
//! let bounds = Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0));
//! let items = (0..100u32).map(|i| {
//!     let f = f64::from(i) / 100.0;
//!     (Point3::new(f, (f * 3.0) % 1.0, (f * 7.0) % 1.0), i)
//! });
//! let t = octree_from_list(bounds, items);
//! assert_eq!(t.len(), 100);
//! ```

#![no_std]

extern crate alloc;

pub mod blob;
pub mod build;
pub mod error;
pub mod pivot;
mod scorer;
pub mod tree;
pub mod types;

pub use blob::{BlobNodeData, BlobTree, BlobTriple};
pub use build::octree_from_list;
pub use error::OctreeError;
pub use scorer::ByScore;
pub use tree::Tree;
pub use types::{Box3, Interval, Matrix3, Point3, Score, Trivalent};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    fn bounds() -> Box3 {
        Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0))
    }

    #[test]
    fn tree_insert_get_remove_round_trips() {
        let b = bounds();
        let p = Point3::new(0.3, 0.4, 0.5);
        let t = Tree::<u32>::new().insert(b, p, 7).unwrap();
        assert_eq!(t.get(b, p), Some(&7));
        let t = t.remove(b, p).unwrap();
        assert_eq!(t, Tree::new());
    }

    #[test]
    fn blob_tree_intersection_with_box_is_non_empty_when_overlapping() {
        let b = bounds();
        let p = Point3::new(0.5, 0.5, 0.5);
        let extent = Box3::new((0.4, 0.6), (0.4, 0.6), (0.4, 0.6));
        let t = BlobTree::<&str>::new().insert(b, p, extent, "blob").unwrap();
        let hits: Vec<_> = t.intersect_with_box(extent).collect();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn by_score_orders_by_distance_to_origin() {
        let b = Box3::new((-1.0, 1.0), (-1.0, 1.0), (-1.0, 1.0));
        let origin = Point3::new(0.0, 0.0, 0.0);
        let t = Tree::<&str>::new()
            .insert(b, Point3::new(0.5, 0.0, 0.0), "near")
            .unwrap()
            .insert(b, Point3::new(0.9, 0.9, 0.9), "far")
            .unwrap();
        let nearest = t
            .by_score(
                b,
                move |p| Some(Score(types::euclidean_point_point(origin, p))),
                move |bx| Some(Score(types::euclidean_point_box(origin, bx))),
            )
            .next();
        assert_eq!(nearest.map(|(_, _, d)| *d), Some("near"));
    }
}
