// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The persistent blob-tree algebra: like [`crate::tree::Tree`], but each
//! stored entry carries an *extent* box in addition to its reference point,
//! and every `Node` caches the union of its descendants' extents. This
//! cached extent is what makes `possible_overlaps`/`by_possible_overlap`
//! output-sensitive instead of quadratic.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::OctreeError;
use crate::types::{
    Box3, Point3, Trivalent, box_contains, box_intersects_plane, boxes_disjoint,
    halfline_intersects_box, line_intersects_box, line_segment_intersects_box, narrow, union_box,
};

/// An owned `(reference point, extent, payload)` triple, as returned by the
/// cross-tree joins ([`BlobTree::possible_overlaps`],
/// [`BlobTree::by_possible_overlap`]). Those two operations combine `self`
/// with a freshly pruned copy of `other`; cloning the payload there sidesteps
/// having to self-reference into a locally built subtree, so this alias
/// requires `D: Clone` at the call site rather than borrowing.
pub type BlobTriple<D> = (Point3, Box3, D);

/// A persistent octree over extended objects: a 3D reference point mapped to
/// an `(extent box, payload)` pair. Same three-shape variant as
/// [`crate::tree::Tree`], but every `Node` additionally caches the union of
/// its non-empty descendants' extents.
#[derive(Clone, Debug)]
pub enum BlobTree<D> {
    /// No elements.
    Empty,
    /// Exactly one element: reference point, extent, payload.
    Singleton(Point3, Box3, D),
    /// Eight subtrees plus their cached combined extent.
    Node(Arc<BlobNodeData<D>>),
}

/// The shared contents of a blob tree `Node`: the eight subtrees and the
/// cached extent, computed once at construction (invariant 5).
#[derive(Clone, Debug)]
pub struct BlobNodeData<D> {
    /// Union of all non-empty descendants' extents, or `None` if there are none.
    pub extent: Option<Box3>,
    /// The eight octant subtrees, addressed by the ZYX octant index.
    pub children: [BlobTree<D>; 8],
}

impl<D: PartialEq> PartialEq for BlobTree<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (BlobTree::Empty, BlobTree::Empty) => true,
            (BlobTree::Singleton(p, e, d), BlobTree::Singleton(q, f, c)) => p == q && e == f && d == c,
            (BlobTree::Node(a), BlobTree::Node(b)) => a.extent == b.extent && a.children == b.children,
            _ => false,
        }
    }
}

fn empty_children<D>() -> [BlobTree<D>; 8] {
    core::array::from_fn(|_| BlobTree::Empty)
}

fn union_extents<D>(children: &[BlobTree<D>; 8]) -> Option<Box3> {
    let mut acc: Option<Box3> = None;
    for c in children {
        if let Some(e) = c.extent() {
            acc = Some(match acc {
                Some(a) => union_box(a, e),
                None => e,
            });
        }
    }
    acc
}

fn blob_node<D>(children: [BlobTree<D>; 8]) -> BlobTree<D> {
    let extent = union_extents(&children);
    BlobTree::Node(Arc::new(BlobNodeData { extent, children }))
}

impl<D> BlobTree<D> {
    /// The empty blob tree.
    #[must_use]
    pub const fn new() -> Self {
        BlobTree::Empty
    }

    /// The smallest box enclosing every stored extent, or `None` if empty.
    #[must_use]
    pub fn extent(&self) -> Option<Box3> {
        match self {
            BlobTree::Empty => None,
            BlobTree::Singleton(_, e, _) => Some(*e),
            BlobTree::Node(n) => n.extent,
        }
    }

    /// Number of stored elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            BlobTree::Empty => 0,
            BlobTree::Singleton(..) => 1,
            BlobTree::Node(n) => n.children.iter().map(BlobTree::len).sum(),
        }
    }

    /// True iff the tree stores no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, BlobTree::Empty)
    }

    /// Iterates `(point, extent, payload)` triples in octant order, depth-first.
    pub fn iter(&self) -> Iter<'_, D> {
        Iter { stack: alloc::vec![self] }
    }
}

impl<D> Default for BlobTree<D> {
    fn default() -> Self {
        BlobTree::Empty
    }
}

/// Depth-first iterator over a [`BlobTree`]'s elements.
pub struct Iter<'a, D> {
    stack: Vec<&'a BlobTree<D>>,
}

impl<'a, D> Iterator for Iter<'a, D> {
    type Item = (Point3, Box3, &'a D);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(t) = self.stack.pop() {
            match t {
                BlobTree::Empty => {}
                BlobTree::Singleton(p, e, d) => return Some((*p, *e, d)),
                BlobTree::Node(n) => {
                    for child in n.children.iter().rev() {
                        self.stack.push(child);
                    }
                }
            }
        }
        None
    }
}

impl<'a, D> IntoIterator for &'a BlobTree<D> {
    type Item = (Point3, Box3, &'a D);
    type IntoIter = Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<D: Clone> BlobTree<D> {
    /// Inserts `(p, extent, data)`. Fails with [`OctreeError::DuplicateKey`]
    /// if `p` is already present.
    pub fn insert(&self, bounds: Box3, p: Point3, extent: Box3, data: D) -> Result<BlobTree<D>, OctreeError> {
        match self {
            BlobTree::Empty => Ok(BlobTree::Singleton(p, extent, data)),
            BlobTree::Singleton(q, qe, qd) => {
                if *q == p {
                    Err(OctreeError::DuplicateKey { point: p })
                } else {
                    let fresh = blob_node(empty_children());
                    let with_old = fresh.insert(bounds, *q, *qe, qd.clone())?;
                    with_old.insert(bounds, p, extent, data)
                }
            }
            BlobTree::Node(n) => {
                let (idx, sub) = narrow(bounds, p);
                let new_child = n.children[idx].insert(sub, p, extent, data)?;
                let mut arr = n.children.clone();
                arr[idx] = new_child;
                Ok(blob_node(arr))
            }
        }
    }

    /// Inserts or replaces `(p, extent, data)`. Never fails.
    #[must_use]
    pub fn update(&self, bounds: Box3, p: Point3, extent: Box3, data: D) -> BlobTree<D> {
        match self {
            BlobTree::Empty => BlobTree::Singleton(p, extent, data),
            BlobTree::Singleton(q, _, _) => {
                if *q == p {
                    BlobTree::Singleton(p, extent, data)
                } else {
                    self.insert(bounds, p, extent, data)
                        .expect("two distinct coordinates cannot collide")
                }
            }
            BlobTree::Node(n) => {
                let (idx, sub) = narrow(bounds, p);
                let new_child = n.children[idx].update(sub, p, extent, data);
                let mut arr = n.children.clone();
                arr[idx] = new_child;
                blob_node(arr)
            }
        }
    }

    /// Retains every stored triple whose extent satisfies `point_fn`.
    /// `box_fn` is evaluated on a `Node`'s cached extent (not its bounding
    /// box): `True` keeps the whole subtree, `False` drops it, `Unknown`
    /// recurses into its children.
    #[must_use]
    pub fn subset_by_extent(
        &self,
        point_fn: &dyn Fn(Box3) -> bool,
        box_fn: &dyn Fn(Box3) -> Trivalent,
    ) -> BlobTree<D> {
        match self {
            BlobTree::Empty => BlobTree::Empty,
            BlobTree::Singleton(p, e, d) => {
                if point_fn(*e) {
                    BlobTree::Singleton(*p, *e, d.clone())
                } else {
                    BlobTree::Empty
                }
            }
            BlobTree::Node(n) => {
                let ext = n.extent.expect("a Node always has at least one non-empty descendant");
                match box_fn(ext) {
                    Trivalent::True => self.clone(),
                    Trivalent::False => BlobTree::Empty,
                    Trivalent::Unknown => {
                        let arr: [BlobTree<D>; 8] =
                            core::array::from_fn(|i| n.children[i].subset_by_extent(point_fn, box_fn));
                        blob_smartnode(arr)
                    }
                }
            }
        }
    }

    /// Lazy streaming analogue of [`subset_by_extent`](Self::subset_by_extent):
    /// once `box_fn` reports `True` for a subtree, every triple in it streams
    /// out unfiltered.
    pub fn iter_by_extent<'a>(
        &'a self,
        point_fn: impl Fn(Box3) -> bool + 'a,
        box_fn: impl Fn(Box3) -> Trivalent + 'a,
    ) -> IterByExtent<'a, D> {
        IterByExtent {
            stack: alloc::vec![StackEntry::Filter(self)],
            point_fn: alloc::boxed::Box::new(point_fn),
            box_fn: alloc::boxed::Box::new(box_fn),
        }
    }

    /// Collapses chains of `Node`s with exactly seven `Empty` children down
    /// to their unique non-empty descendant. Strips wrapping left over after
    /// aggressive filtering, so later traversals don't pay for empty spans.
    #[must_use]
    pub fn reroot(&self) -> BlobTree<D> {
        match self {
            BlobTree::Node(n) => {
                let mut only: Option<&BlobTree<D>> = None;
                let mut count = 0;
                for c in &n.children {
                    if !matches!(c, BlobTree::Empty) {
                        count += 1;
                        only = Some(c);
                    }
                }
                if count == 1 {
                    only.expect("count == 1 implies Some").reroot()
                } else {
                    self.clone()
                }
            }
            _ => self.clone(),
        }
    }

    /// Sub-octree of entries whose extent is not disjoint from `b`.
    #[must_use]
    pub fn intersection_with_box(&self, b: Box3) -> BlobTree<D> {
        self.subset_by_extent(&|e| !boxes_disjoint(e, b), &|e| box_fn_for_box(e, b))
    }

    /// Lazy sequence of entries whose extent is not disjoint from `b`.
    pub fn intersect_with_box(&self, b: Box3) -> IterByExtent<'_, D> {
        self.iter_by_extent(move |e| !boxes_disjoint(e, b), move |e| box_fn_for_box(e, b))
    }

    /// Lazy sequence of entries whose extent meets the line (or, if
    /// `positive`, the half-line/ray) through `origin` with direction `dir`.
    pub fn intersect_with_line(&self, origin: Point3, dir: Point3, positive: bool) -> IterByExtent<'_, D> {
        let point_fn = move |e: Box3| {
            if positive {
                halfline_intersects_box(origin, dir, e)
            } else {
                line_intersects_box(origin, dir, e)
            }
        };
        self.iter_by_extent(point_fn, move |e| if point_fn(e) { Trivalent::Unknown } else { Trivalent::False })
    }

    /// Lazy sequence of entries whose extent meets the segment from `p` to `q`.
    pub fn intersect_with_line_segment(&self, p: Point3, q: Point3) -> IterByExtent<'_, D> {
        let point_fn = move |e: Box3| line_segment_intersects_box(p, q, e);
        self.iter_by_extent(point_fn, move |e| if point_fn(e) { Trivalent::Unknown } else { Trivalent::False })
    }

    /// Lazy sequence of entries whose extent meets the plane implicitly
    /// defined by `f` (has vertices on both sides, or touching).
    pub fn intersect_with_plane<'a>(&'a self, f: impl Fn(Point3) -> f64 + Clone + 'a) -> IterByExtent<'a, D> {
        let f2 = f.clone();
        let point_fn = move |e: Box3| box_intersects_plane(e, |p| f(p));
        self.iter_by_extent(point_fn, move |e| {
            if box_intersects_plane(e, |p| f2(p)) { Trivalent::Unknown } else { Trivalent::False }
        })
    }

    /// Every pair `(A, B)` with `A` from `self`, `B` from `other`, whose
    /// extents are not disjoint. Completeness: exactly
    /// `{(A,B) : extents(A) ∩ extents(B) ≠ ∅}`, no duplicates.
    ///
    /// Descends `self` while pruning `other` to the current subtree's cached
    /// extent (and [`reroot`](Self::reroot)ing) at each `Node`, so both sides
    /// shrink together as the recursion proceeds — output-sensitive rather
    /// than the naive `O(n*m)` scan.
    #[must_use]
    pub fn possible_overlaps(&self, other: &BlobTree<D>) -> PossibleOverlaps<D> {
        let mut out = Vec::new();
        collect_possible_overlaps(self, other, &mut out);
        PossibleOverlaps { inner: out.into_iter() }
    }

    /// Like [`possible_overlaps`](Self::possible_overlaps), but grouped by
    /// the `self` side: yields `(A, [B, …])` pairs.
    #[must_use]
    pub fn by_possible_overlap(&self, other: &BlobTree<D>) -> ByPossibleOverlap<D> {
        let mut out = Vec::new();
        collect_by_possible_overlap(self, other, &mut out);
        ByPossibleOverlap { inner: out.into_iter() }
    }
}

fn box_fn_for_box(e: Box3, b: Box3) -> Trivalent {
    if boxes_disjoint(e, b) {
        Trivalent::False
    } else if box_contains(b, e) {
        Trivalent::True
    } else {
        Trivalent::Unknown
    }
}

fn blob_smartnode<D: Clone>(children: [BlobTree<D>; 8]) -> BlobTree<D> {
    let mut singleton_idx = None;
    let mut must_be_node = false;
    for (i, c) in children.iter().enumerate() {
        match c {
            BlobTree::Node(_) => {
                must_be_node = true;
                break;
            }
            BlobTree::Singleton(..) => {
                if singleton_idx.is_some() {
                    must_be_node = true;
                    break;
                }
                singleton_idx = Some(i);
            }
            BlobTree::Empty => {}
        }
    }
    if must_be_node {
        return blob_node(children);
    }
    match singleton_idx {
        Some(i) => {
            let mut children = children;
            core::mem::replace(&mut children[i], BlobTree::Empty)
        }
        None => BlobTree::Empty,
    }
}

fn collect_possible_overlaps<D: Clone>(
    a: &BlobTree<D>,
    b: &BlobTree<D>,
    out: &mut Vec<(BlobTriple<D>, BlobTriple<D>)>,
) {
    match a {
        BlobTree::Empty => {}
        BlobTree::Singleton(p, e, d) => {
            let t1 = (*p, *e, d.clone());
            for (p2, e2, d2) in b.intersect_with_box(*e) {
                out.push((t1.clone(), (p2, e2, d2.clone())));
            }
        }
        BlobTree::Node(n) => {
            let extent = n.extent.expect("non-empty node has an extent");
            let pruned = b.intersection_with_box(extent).reroot();
            for s in &n.children {
                collect_possible_overlaps(s, &pruned, out);
            }
        }
    }
}

fn collect_by_possible_overlap<D: Clone>(
    a: &BlobTree<D>,
    b: &BlobTree<D>,
    out: &mut Vec<(BlobTriple<D>, Vec<BlobTriple<D>>)>,
) {
    match a {
        BlobTree::Empty => {}
        BlobTree::Singleton(p, e, d) => {
            let t1 = (*p, *e, d.clone());
            let matches: Vec<_> = b.intersect_with_box(*e).map(|(p2, e2, d2)| (p2, e2, d2.clone())).collect();
            out.push((t1, matches));
        }
        BlobTree::Node(n) => {
            for s in &n.children {
                if let Some(e) = s.extent() {
                    let pruned = b.intersection_with_box(e).reroot();
                    collect_by_possible_overlap(s, &pruned, out);
                }
            }
        }
    }
}

/// Stack entries for [`IterByExtent`]'s explicit work-stack traversal.
enum StackEntry<'a, D> {
    /// Still needs `box_fn` evaluated against its cached extent.
    Filter(&'a BlobTree<D>),
    /// Already proven fully matching: stream every element unfiltered.
    All(Iter<'a, D>),
}

/// Lazy streaming analogue of `subset_by_extent`; see
/// [`BlobTree::iter_by_extent`].
pub struct IterByExtent<'a, D> {
    stack: Vec<StackEntry<'a, D>>,
    point_fn: alloc::boxed::Box<dyn Fn(Box3) -> bool + 'a>,
    box_fn: alloc::boxed::Box<dyn Fn(Box3) -> Trivalent + 'a>,
}

impl<'a, D> Iterator for IterByExtent<'a, D> {
    type Item = (Point3, Box3, &'a D);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.stack.last_mut() {
                None => return None,
                Some(StackEntry::All(it)) => match it.next() {
                    Some(item) => return Some(item),
                    None => {
                        self.stack.pop();
                    }
                },
                Some(StackEntry::Filter(_)) => {
                    let Some(StackEntry::Filter(t)) = self.stack.pop() else {
                        unreachable!("just matched Filter above")
                    };
                    match t {
                        BlobTree::Empty => {}
                        BlobTree::Singleton(p, e, d) => {
                            if (self.point_fn)(*e) {
                                return Some((*p, *e, d));
                            }
                        }
                        BlobTree::Node(n) => {
                            let ext = n.extent.expect("a Node always has at least one non-empty descendant");
                            match (self.box_fn)(ext) {
                                Trivalent::True => self.stack.push(StackEntry::All(t.iter())),
                                Trivalent::False => {}
                                Trivalent::Unknown => {
                                    for c in n.children.iter().rev() {
                                        self.stack.push(StackEntry::Filter(c));
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Iterator over [`BlobTree::possible_overlaps`].
pub struct PossibleOverlaps<D> {
    inner: alloc::vec::IntoIter<(BlobTriple<D>, BlobTriple<D>)>,
}

impl<D> Iterator for PossibleOverlaps<D> {
    type Item = (BlobTriple<D>, BlobTriple<D>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

/// Iterator over [`BlobTree::by_possible_overlap`].
pub struct ByPossibleOverlap<D> {
    inner: alloc::vec::IntoIter<(BlobTriple<D>, Vec<BlobTriple<D>>)>,
}

impl<D> Iterator for ByPossibleOverlap<D> {
    type Item = (BlobTriple<D>, Vec<BlobTriple<D>>);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Box3 {
        Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0))
    }

    fn cube(center: Point3, half: f64) -> Box3 {
        Box3::new(
            (center.x - half, center.x + half),
            (center.y - half, center.y + half),
            (center.z - half, center.z + half),
        )
    }

    #[test]
    fn insert_then_extent_roundtrip() {
        let b = bounds();
        let p = Point3::new(0.2, 0.3, 0.4);
        let e = cube(p, 0.05);
        let t = BlobTree::<&str>::new().insert(b, p, e, "a").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.extent(), Some(e));
    }

    #[test]
    fn insert_duplicate_fails() {
        let b = bounds();
        let p = Point3::new(0.2, 0.3, 0.4);
        let e = cube(p, 0.05);
        let t = BlobTree::<&str>::new().insert(b, p, e, "a").unwrap();
        assert_eq!(t.insert(b, p, e, "b"), Err(OctreeError::DuplicateKey { point: p }));
    }

    #[test]
    fn node_extent_is_union_of_children() {
        let b = bounds();
        let p0 = Point3::new(0.1, 0.1, 0.1);
        let p1 = Point3::new(0.9, 0.9, 0.9);
        let e0 = cube(p0, 0.05);
        let e1 = cube(p1, 0.05);
        let t = BlobTree::<u32>::new().insert(b, p0, e0, 1).unwrap().insert(b, p1, e1, 2).unwrap();
        assert_eq!(t.extent(), Some(union_box(e0, e1)));
    }

    #[test]
    fn intersect_with_box_matches_naive_filter() {
        let b = bounds();
        let mut t = BlobTree::<u32>::new();
        for i in 0..30u32 {
            let f = f64::from(i) / 30.0;
            let p = Point3::new(f, (f * 3.0) % 1.0, (f * 5.0) % 1.0);
            t = t.insert(b, p, cube(p, 0.05), i).unwrap();
        }
        let query = Box3::new((0.2, 0.6), (0.0, 1.0), (0.0, 1.0));
        let got: Vec<u32> = t.intersect_with_box(query).map(|(_, _, d)| *d).collect();
        let expected: Vec<u32> = t.iter().filter(|(_, e, _)| !boxes_disjoint(*e, query)).map(|(_, _, d)| *d).collect();
        let mut got = got;
        let mut expected = expected;
        got.sort_unstable();
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn intersect_with_box_excludes_blobs_outside_query_even_when_node_extent_contains_it() {
        let b = Box3::new((-0.5, 1.5), (-0.5, 1.5), (-0.5, 1.5));
        let p0 = Point3::new(0.0, 0.0, 0.0);
        let p1 = Point3::new(1.0, 1.0, 1.0);
        let t = BlobTree::<&str>::new()
            .insert(b, p0, cube(p0, 0.05), "near-origin")
            .unwrap()
            .insert(b, p1, cube(p1, 0.05), "near-corner")
            .unwrap();
        // The node's cached extent (roughly [-0.05, 1.05]^3) fully contains this
        // query box, but neither stored blob's own extent overlaps it.
        let query = Box3::new((0.4, 0.6), (0.4, 0.6), (0.4, 0.6));
        let got: Vec<_> = t.intersect_with_box(query).collect();
        assert!(got.is_empty());
    }

    #[test]
    fn possible_overlaps_matches_naive_quadratic() {
        let b = bounds();
        let mut a = BlobTree::<u32>::new();
        let mut c = BlobTree::<u32>::new();
        for i in 0..20u32 {
            let f = f64::from(i) / 20.0;
            let p = Point3::new(f, (f * 2.0) % 1.0, (f * 4.0) % 1.0);
            a = a.insert(b, p, cube(p, 0.08), i).unwrap();
        }
        for i in 0..20u32 {
            let f = f64::from(i) / 20.0;
            let p = Point3::new((f + 0.5) % 1.0, (f * 3.0) % 1.0, (f * 6.0) % 1.0);
            c = c.insert(b, p, cube(p, 0.08), 100 + i).unwrap();
        }

        let mut got: Vec<(u32, u32)> = a.possible_overlaps(&c).map(|((_, _, d1), (_, _, d2))| (d1, d2)).collect();
        let mut expected = Vec::new();
        for (_, e1, d1) in a.iter() {
            for (_, e2, d2) in c.iter() {
                if !boxes_disjoint(e1, e2) {
                    expected.push((*d1, *d2));
                }
            }
        }
        got.sort_unstable();
        expected.sort_unstable();
        assert_eq!(got, expected);
    }

    #[test]
    fn by_possible_overlap_regroups_to_same_pairs() {
        let b = bounds();
        let mut a = BlobTree::<u32>::new();
        let mut c = BlobTree::<u32>::new();
        for i in 0..15u32 {
            let f = f64::from(i) / 15.0;
            let p = Point3::new(f, (f * 2.0) % 1.0, (f * 4.0) % 1.0);
            a = a.insert(b, p, cube(p, 0.1), i).unwrap();
        }
        for i in 0..15u32 {
            let f = f64::from(i) / 15.0;
            let p = Point3::new((f + 0.3) % 1.0, (f * 3.0) % 1.0, (f * 5.0) % 1.0);
            c = c.insert(b, p, cube(p, 0.1), 100 + i).unwrap();
        }

        let grouped_count: usize = a.by_possible_overlap(&c).map(|(_, group)| group.len()).sum();
        let direct_count = a.possible_overlaps(&c).count();
        assert_eq!(grouped_count, direct_count);
    }

    #[test]
    fn reroot_strips_single_nonempty_child() {
        let b = bounds();
        let p = Point3::new(0.9, 0.9, 0.9);
        let e = cube(p, 0.05);
        let t = BlobTree::<u32>::new().insert(b, p, e, 1).unwrap();
        // A deliberately nested Node with exactly one non-empty child.
        let mut children = empty_children::<u32>();
        children[7] = t.clone();
        let wrapped = BlobTree::Node(Arc::new(BlobNodeData { extent: t.extent(), children }));
        assert_eq!(wrapped.reroot(), t);
    }
}
