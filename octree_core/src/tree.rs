// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The persistent point-tree algebra: `Empty` / `Singleton` / `Node`-of-8,
//! with `smartnode` construction guarding the non-degeneracy invariant.

use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::error::OctreeError;
use crate::scorer::{ByScore, HeapEntry};
use crate::types::{Box3, Point3, Score, Trivalent, box_contains, boxes_disjoint, narrow, point_in_box, subboxes};
use core::cmp::Reverse;
use alloc::collections::BinaryHeap;

/// A persistent octree over 3D points, parameterised by opaque payload `D`.
///
/// One of three shapes: `Empty` (no elements), `Singleton` (exactly one
/// `(coords, payload)`), or `Node` (eight subtrees, reference-counted so
/// structural sharing between snapshots is free). Bounds are never stored in
/// a node; every operation threads the enclosing box in from the caller.
#[derive(Clone, Debug)]
pub enum Tree<D> {
    /// No elements.
    Empty,
    /// Exactly one element.
    Singleton(Point3, D),
    /// Eight subtrees, addressed by the ZYX octant index.
    Node(Arc<[Tree<D>; 8]>),
}

impl<D: PartialEq> PartialEq for Tree<D> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Tree::Empty, Tree::Empty) => true,
            (Tree::Singleton(p, d), Tree::Singleton(q, e)) => p == q && d == e,
            (Tree::Node(a), Tree::Node(b)) => a == b,
            _ => false,
        }
    }
}

fn empty_children<D>() -> [Tree<D>; 8] {
    core::array::from_fn(|_| Tree::Empty)
}

impl<D> Tree<D> {
    /// The empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Tree::Empty
    }

    /// Number of stored elements.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Tree::Empty => 0,
            Tree::Singleton(_, _) => 1,
            Tree::Node(children) => children.iter().map(Tree::len).sum(),
        }
    }

    /// True iff the tree stores no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Tree::Empty)
    }

    /// Iterates `(coords, payload)` pairs in octant order, depth-first.
    pub fn iter(&self) -> Iter<'_, D> {
        Iter { stack: alloc::vec![self] }
    }
}

impl<D> Default for Tree<D> {
    fn default() -> Self {
        Tree::Empty
    }
}

/// Depth-first, lazily-descending iterator over a [`Tree`]'s elements.
pub struct Iter<'a, D> {
    stack: Vec<&'a Tree<D>>,
}

impl<'a, D> Iterator for Iter<'a, D> {
    type Item = (Point3, &'a D);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(t) = self.stack.pop() {
            match t {
                Tree::Empty => {}
                Tree::Singleton(p, d) => return Some((*p, d)),
                Tree::Node(children) => {
                    for child in children.iter().rev() {
                        self.stack.push(child);
                    }
                }
            }
        }
        None
    }
}

impl<'a, D> IntoIterator for &'a Tree<D> {
    type Item = (Point3, &'a D);
    type IntoIter = Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<D: Clone> Tree<D> {
    /// Assembles eight octant subtrees into a `Node`, collapsing to
    /// `Singleton` or `Empty` when the result would otherwise be degenerate
    /// (invariant: a `Node` always has at least two non-empty children, or a
    /// `Node` child of its own).
    #[must_use]
    pub fn smartnode(children: [Tree<D>; 8]) -> Tree<D> {
        let mut singleton_idx = None;
        let mut must_be_node = false;
        for (i, c) in children.iter().enumerate() {
            match c {
                Tree::Node(_) => {
                    must_be_node = true;
                    break;
                }
                Tree::Singleton(_, _) => {
                    if singleton_idx.is_some() {
                        must_be_node = true;
                        break;
                    }
                    singleton_idx = Some(i);
                }
                Tree::Empty => {}
            }
        }
        if must_be_node {
            return Tree::Node(Arc::new(children));
        }
        match singleton_idx {
            Some(i) => {
                let mut children = children;
                core::mem::replace(&mut children[i], Tree::Empty)
            }
            None => Tree::Empty,
        }
    }

    /// Returns the payload stored at `p`, or `None` if absent.
    #[must_use]
    pub fn get(&self, bounds: Box3, p: Point3) -> Option<&D> {
        match self {
            Tree::Empty => None,
            Tree::Singleton(q, d) => {
                if *q == p {
                    Some(d)
                } else {
                    None
                }
            }
            Tree::Node(children) => {
                let (n, sub) = narrow(bounds, p);
                children[n].get(sub, p)
            }
        }
    }

    /// Inserts `(p, data)`. Fails with [`OctreeError::DuplicateKey`] if `p`
    /// is already present.
    pub fn insert(&self, bounds: Box3, p: Point3, data: D) -> Result<Tree<D>, OctreeError> {
        match self {
            Tree::Empty => Ok(Tree::Singleton(p, data)),
            Tree::Singleton(q, qd) => {
                if *q == p {
                    Err(OctreeError::DuplicateKey { point: p })
                } else {
                    let fresh = Tree::Node(Arc::new(empty_children()));
                    let with_old = fresh.insert(bounds, *q, qd.clone())?;
                    with_old.insert(bounds, p, data)
                }
            }
            Tree::Node(children) => {
                let (n, sub) = narrow(bounds, p);
                let new_child = children[n].insert(sub, p, data)?;
                let mut arr = (**children).clone();
                arr[n] = new_child;
                Ok(Tree::Node(Arc::new(arr)))
            }
        }
    }

    /// Inserts or replaces `(p, data)`. When `p` is already present and
    /// `replace` is `false`, the existing entry is kept unchanged. Never
    /// fails.
    #[must_use]
    pub fn update(&self, bounds: Box3, p: Point3, data: D, replace: bool) -> Tree<D> {
        match self {
            Tree::Empty => Tree::Singleton(p, data),
            Tree::Singleton(q, qd) => {
                if *q == p {
                    if replace {
                        Tree::Singleton(p, data)
                    } else {
                        self.clone()
                    }
                } else {
                    let fresh = Tree::Node(Arc::new(empty_children()));
                    let with_old = fresh
                        .insert(bounds, *q, qd.clone())
                        .expect("freshly built node cannot contain a duplicate");
                    with_old
                        .insert(bounds, p, data)
                        .expect("two distinct coordinates cannot collide")
                }
            }
            Tree::Node(children) => {
                let (n, sub) = narrow(bounds, p);
                let new_child = children[n].update(sub, p, data, replace);
                let mut arr = (**children).clone();
                arr[n] = new_child;
                Tree::Node(Arc::new(arr))
            }
        }
    }

    /// Removes `p`. Fails with [`OctreeError::MissingKey`] if absent.
    pub fn remove(&self, bounds: Box3, p: Point3) -> Result<Tree<D>, OctreeError> {
        match self {
            Tree::Empty => Err(OctreeError::MissingKey { point: p }),
            Tree::Singleton(q, _) => {
                if *q == p {
                    Ok(Tree::Empty)
                } else {
                    Err(OctreeError::MissingKey { point: p })
                }
            }
            Tree::Node(children) => {
                let (n, sub) = narrow(bounds, p);
                let new_child = children[n].remove(sub, p)?;
                let mut arr = (**children).clone();
                arr[n] = new_child;
                Ok(Tree::smartnode(arr))
            }
        }
    }

    /// Retains every stored point `p` with `point_fn(p)` true. `box_fn`
    /// short-circuits whole subtrees: `True` keeps, `False` drops, `Unknown`
    /// recurses.
    #[must_use]
    pub fn subset(
        &self,
        bounds: Box3,
        point_fn: &dyn Fn(Point3) -> bool,
        box_fn: &dyn Fn(Box3) -> Trivalent,
    ) -> Tree<D> {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Singleton(q, d) => {
                if point_fn(*q) {
                    Tree::Singleton(*q, d.clone())
                } else {
                    Tree::Empty
                }
            }
            Tree::Node(children) => match box_fn(bounds) {
                Trivalent::True => self.clone(),
                Trivalent::False => Tree::Empty,
                Trivalent::Unknown => {
                    let subs = subboxes(bounds);
                    let arr: [Tree<D>; 8] =
                        core::array::from_fn(|i| children[i].subset(subs[i], point_fn, box_fn));
                    Tree::smartnode(arr)
                }
            },
        }
    }

    /// Point-wise union of `self` and `other`, both scoped to `bounds`. On a
    /// coordinate collision the retained payload is deliberately
    /// unspecified; `swapped` only controls which *side* wins consistently
    /// regardless of which tree the caller names first.
    #[must_use]
    pub fn union(&self, bounds: Box3, other: &Tree<D>, swapped: bool) -> Tree<D> {
        match (self, other) {
            (Tree::Empty, _) => other.clone(),
            (Tree::Singleton(p, d), _) => other.update(bounds, *p, d.clone(), swapped),
            (Tree::Node(_), Tree::Empty) => self.clone(),
            (Tree::Node(_), Tree::Singleton(p, d)) => self.update(bounds, *p, d.clone(), !swapped),
            (Tree::Node(a), Tree::Node(b)) => {
                if swapped {
                    other.union(bounds, self, false)
                } else {
                    let subs = subboxes(bounds);
                    let arr: [Tree<D>; 8] =
                        core::array::from_fn(|i| a[i].union(subs[i], &b[i], false));
                    Tree::Node(Arc::new(arr))
                }
            }
        }
    }

    /// Produces a tree valid for `newbounds`, dropping points that fall
    /// outside it.
    #[must_use]
    pub fn rebound(&self, oldbounds: Box3, newbounds: Box3) -> Tree<D> {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Singleton(p, _) => {
                if point_in_box(*p, newbounds) {
                    self.clone()
                } else {
                    Tree::Empty
                }
            }
            Tree::Node(children) => {
                if box_contains(oldbounds, newbounds) {
                    let subs = subboxes(newbounds);
                    let arr: [Tree<D>; 8] = core::array::from_fn(|i| self.rebound(oldbounds, subs[i]));
                    Tree::smartnode(arr)
                } else if boxes_disjoint(oldbounds, newbounds) {
                    Tree::Empty
                } else {
                    let old_subs = subboxes(oldbounds);
                    let mut acc = Tree::Empty;
                    for i in 0..8 {
                        let rebounded = children[i].rebound(old_subs[i], newbounds);
                        acc = acc.union(newbounds, &rebounded, false);
                    }
                    acc
                }
            }
        }
    }

    /// As [`rebound`](Self::rebound), but transforms every point through
    /// `point_fn` first; `box_fn` must bound the image of a box under the
    /// same transform (used only to prune disjoint subtrees early).
    #[must_use]
    pub fn deform(
        &self,
        oldbounds: Box3,
        newbounds: Box3,
        point_fn: &dyn Fn(Point3) -> Point3,
        box_fn: &dyn Fn(Box3) -> Box3,
    ) -> Tree<D> {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Singleton(p, d) => {
                let np = point_fn(*p);
                if point_in_box(np, newbounds) {
                    Tree::Singleton(np, d.clone())
                } else {
                    Tree::Empty
                }
            }
            Tree::Node(children) => {
                if box_contains(box_fn(oldbounds), newbounds) {
                    let subs = subboxes(newbounds);
                    let arr: [Tree<D>; 8] =
                        core::array::from_fn(|i| self.deform(oldbounds, subs[i], point_fn, box_fn));
                    Tree::smartnode(arr)
                } else if boxes_disjoint(box_fn(oldbounds), newbounds) {
                    Tree::Empty
                } else {
                    let old_subs = subboxes(oldbounds);
                    let mut acc = Tree::Empty;
                    for i in 0..8 {
                        let deformed = children[i].deform(old_subs[i], newbounds, point_fn, box_fn);
                        acc = acc.union(newbounds, &deformed, false);
                    }
                    acc
                }
            }
        }
    }

    /// Pushes `self` onto the shared best-first search heap: a `Singleton`
    /// pushes itself if `pointscore` is not absent; a `Node` pushes a single
    /// lazy entry for its whole bounding box if `boxscore` is not absent
    /// (its children are only enqueued once this entry is popped — see
    /// [`crate::scorer::by_score`]); `Empty` pushes nothing.
    pub(crate) fn enqueue<'a>(
        &'a self,
        heap: &mut BinaryHeap<Reverse<HeapEntry<'a, D>>>,
        bounds: Box3,
        seq: &mut u64,
        pointscore: &dyn Fn(Point3) -> Option<Score>,
        boxscore: &dyn Fn(Box3) -> Option<Score>,
    ) {
        match self {
            Tree::Empty => {}
            Tree::Singleton(p, d) => {
                if let Some(score) = pointscore(*p) {
                    *seq += 1;
                    heap.push(Reverse(HeapEntry::point(score, *seq, *p, d)));
                }
            }
            Tree::Node(_) => {
                if let Some(score) = boxscore(bounds) {
                    *seq += 1;
                    heap.push(Reverse(HeapEntry::node(score, *seq, bounds, self)));
                }
            }
        }
    }

    /// Best-first search over `self`, yielding `(score, coords, payload)` in
    /// non-decreasing score order. See [`crate::scorer::by_score`] for the
    /// correctness obligation on `boxscore`.
    pub fn by_score<'a, PF, BF>(&'a self, bounds: Box3, pointscore: PF, boxscore: BF) -> ByScore<'a, D>
    where
        PF: Fn(Point3) -> Option<Score> + 'a,
        BF: Fn(Box3) -> Option<Score> + 'a,
    {
        crate::scorer::by_score(self, bounds, pointscore, boxscore)
    }
}
