// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`BlobOctree`]: the mutable facade over [`octree_core::blob::BlobTree`].

use octree_core::blob::{BlobTree, ByPossibleOverlap, Iter, IterByExtent, PossibleOverlaps};
use octree_core::error::OctreeError;
use octree_core::types::{Box3, Point3, point_in_box};

/// A mutable octree over extended objects: each entry is a reference point
/// mapped to an `(extent box, payload)` pair. Unlike [`Octree`](crate::Octree),
/// there is no `remove`: the persistent source this crate generalises never
/// offered one for blob trees, since extents are typically managed by
/// reinsertion (`update`) rather than deletion.
#[derive(Clone)]
pub struct BlobOctree<D> {
    bounds: Box3,
    tree: BlobTree<D>,
}

impl<D> core::fmt::Debug for BlobOctree<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BlobOctree").field("bounds", &self.bounds).field("len", &self.tree.len()).finish()
    }
}

impl<D> BlobOctree<D> {
    /// Creates an empty blob octree over `bounds`.
    #[must_use]
    pub const fn new(bounds: Box3) -> Self {
        Self { bounds, tree: BlobTree::Empty }
    }

    /// The facade's current bounding box.
    #[must_use]
    pub const fn bounds(&self) -> Box3 {
        self.bounds
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True iff the blob octree stores no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Iterates `(point, extent, payload)` triples.
    pub fn iter(&self) -> Iter<'_, D> {
        self.tree.iter()
    }

    fn check_bounds(&self, p: Point3) -> Result<(), OctreeError> {
        if point_in_box(p, self.bounds) {
            Ok(())
        } else {
            Err(OctreeError::OutOfBounds { point: p })
        }
    }
}

impl<'a, D> IntoIterator for &'a BlobOctree<D> {
    type Item = (Point3, Box3, &'a D);
    type IntoIter = Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.iter()
    }
}

impl<D: Clone> BlobOctree<D> {
    /// Inserts `(p, extent, d)`. Fails with [`OctreeError::OutOfBounds`] if
    /// `p` is outside [`bounds`](Self::bounds), or
    /// [`OctreeError::DuplicateKey`] if `p` is already present.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, d)))]
    pub fn insert(&mut self, p: Point3, extent: Box3, d: D) -> Result<(), OctreeError> {
        self.check_bounds(p)?;
        self.tree = self.tree.insert(self.bounds, p, extent, d)?;
        Ok(())
    }

    /// Inserts or replaces `(p, extent, d)`. Fails only with
    /// [`OctreeError::OutOfBounds`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, d)))]
    pub fn update(&mut self, p: Point3, extent: Box3, d: D) -> Result<(), OctreeError> {
        self.check_bounds(p)?;
        self.tree = self.tree.update(self.bounds, p, extent, d);
        Ok(())
    }

    /// Inserts every `(p, extent, d)` triple from `items`.
    pub fn extend(&mut self, items: impl IntoIterator<Item = (Point3, Box3, D)>) -> Result<(), OctreeError> {
        for (p, extent, d) in items {
            self.insert(p, extent, d)?;
        }
        Ok(())
    }

    /// A constant-time, structurally-shared copy of `self`.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// A new blob octree containing every entry whose extent is not disjoint
    /// from `b`.
    #[must_use]
    pub fn intersection_with_box(&self, b: Box3) -> Self {
        Self { bounds: self.bounds, tree: self.tree.intersection_with_box(b) }
    }

    /// Lazy sequence of entries whose extent is not disjoint from `b`.
    pub fn intersect_with_box(&self, b: Box3) -> IterByExtent<'_, D> {
        self.tree.intersect_with_box(b)
    }

    /// Lazy sequence of entries whose extent meets the line (or, if
    /// `positive`, the ray) through `origin` with direction `dir`.
    pub fn intersect_with_line(&self, origin: Point3, dir: Point3, positive: bool) -> IterByExtent<'_, D> {
        self.tree.intersect_with_line(origin, dir, positive)
    }

    /// Lazy sequence of entries whose extent meets the segment from `p` to `q`.
    pub fn intersect_with_line_segment(&self, p: Point3, q: Point3) -> IterByExtent<'_, D> {
        self.tree.intersect_with_line_segment(p, q)
    }

    /// Lazy sequence of entries whose extent meets the plane implicitly
    /// defined by `f`.
    pub fn intersect_with_plane<'a>(&'a self, f: impl Fn(Point3) -> f64 + Clone + 'a) -> IterByExtent<'a, D> {
        self.tree.intersect_with_plane(f)
    }

    /// Every pair `(A, B)` with `A` from `self`, `B` from `other`, whose
    /// extents are not disjoint.
    #[must_use]
    pub fn possible_overlaps<'a>(&'a self, other: &'a BlobOctree<D>) -> PossibleOverlaps<D> {
        self.tree.possible_overlaps(&other.tree)
    }

    /// As [`possible_overlaps`](Self::possible_overlaps), grouped by the
    /// `self` side: yields `(A, [B, …])`.
    #[must_use]
    pub fn by_possible_overlap<'a>(&'a self, other: &'a BlobOctree<D>) -> ByPossibleOverlap<D> {
        self.tree.by_possible_overlap(&other.tree)
    }
}
