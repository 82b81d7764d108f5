// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Octree`]: the mutable facade over [`octree_core::tree::Tree`].

use alloc::vec::Vec;

use octree_core::error::OctreeError;
use octree_core::tree::Tree;
use octree_core::types::{
    Box3, Matrix3, Point3, Score, convex_box_deform, euclidean_point_box, euclidean_point_point,
    matrix_action, point_in_box, union_box, vertices,
};
use octree_core::{ByScore, Trivalent};

/// A mutable point octree: owns a bounding box and a persistent [`Tree`]
/// root, replacing the root atomically on each successful mutation.
///
/// Every point inserted must lie within `bounds` (checked on every mutating
/// call); coordinates are otherwise pairwise distinct by construction of the
/// underlying tree algebra.
#[derive(Clone)]
pub struct Octree<D> {
    bounds: Box3,
    tree: Tree<D>,
}

impl<D> core::fmt::Debug for Octree<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Octree").field("bounds", &self.bounds).field("len", &self.tree.len()).finish()
    }
}

impl<D> Octree<D> {
    /// Creates an empty octree over `bounds`.
    #[must_use]
    pub const fn new(bounds: Box3) -> Self {
        Self { bounds, tree: Tree::Empty }
    }

    /// The facade's current bounding box.
    #[must_use]
    pub const fn bounds(&self) -> Box3 {
        self.bounds
    }

    /// Number of stored points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// True iff the octree stores no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Iterates `(coords, payload)` pairs.
    pub fn iter(&self) -> octree_core::tree::Iter<'_, D> {
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

impl<'a, D> IntoIterator for &'a Octree<D> {
    type Item = (Point3, &'a D);
    type IntoIter = octree_core::tree::Iter<'a, D>;

    fn into_iter(self) -> Self::IntoIter {
        self.tree.iter()
    }
}

impl<D: Clone> Octree<D> {
    /// Returns the payload stored at `p`, or `None` if absent.
    #[must_use]
    pub fn get(&self, p: Point3) -> Option<&D> {
        self.tree.get(self.bounds, p)
    }

    /// Inserts `(p, d)`. Fails with [`OctreeError::OutOfBounds`] if `p` is
    /// outside [`bounds`](Self::bounds), or [`OctreeError::DuplicateKey`] if
    /// `p` is already present.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, d)))]
    pub fn insert(&mut self, p: Point3, d: D) -> Result<(), OctreeError> {
        self.check_bounds(p)?;
        self.tree = self.tree.insert(self.bounds, p, d)?;
        Ok(())
    }

    /// Inserts or replaces `(p, d)`. Fails only with
    /// [`OctreeError::OutOfBounds`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, d)))]
    pub fn update(&mut self, p: Point3, d: D) -> Result<(), OctreeError> {
        self.check_bounds(p)?;
        self.tree = self.tree.update(self.bounds, p, d, true);
        Ok(())
    }

    /// Removes `p`. Fails with [`OctreeError::OutOfBounds`] or
    /// [`OctreeError::MissingKey`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn remove(&mut self, p: Point3) -> Result<(), OctreeError> {
        self.check_bounds(p)?;
        self.tree = self.tree.remove(self.bounds, p)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(len = self.tree.len(), is_empty = self.tree.is_empty(), "smartnode collapse check after remove");
        Ok(())
    }

    /// Inserts every `(p, d)` pair from `items`. Stops at the first
    /// out-of-bounds or duplicate point, leaving earlier insertions applied
    /// (matching the original's sequential `insert`-in-a-loop semantics).
    pub fn extend(&mut self, items: impl IntoIterator<Item = (Point3, D)>) -> Result<(), OctreeError> {
        for (p, d) in items {
            self.insert(p, d)?;
        }
        Ok(())
    }

    /// Union of `self` and `other`, which must share identical bounds.
    /// Fails with [`OctreeError::BoundsMismatch`] otherwise. On a coordinate
    /// present in both, the retained payload is deliberately unspecified.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, other)))]
    pub fn simple_union(&self, other: &Self) -> Result<Self, OctreeError> {
        if self.bounds != other.bounds {
            return Err(OctreeError::BoundsMismatch { left: self.bounds, right: other.bounds });
        }
        Ok(Self { bounds: self.bounds, tree: self.tree.union(self.bounds, &other.tree, false) })
    }

    /// Union of `self` and `other` over arbitrary bounds: both are first
    /// [`rebound`](Self::rebound)ed to `union_box(self.bounds, other.bounds)`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, other)))]
    pub fn general_union(&self, other: &Self) -> Self {
        let b = union_box(self.bounds, other.bounds);
        let x = if b == self.bounds { self.clone() } else { self.rebound(b) };
        let y = if b == other.bounds { other.clone() } else { other.rebound(b) };
        x.simple_union(&y).expect("both sides rebounded to the same box")
    }

    /// A copy of `self` restricted (or extended) to `newbounds`, dropping any
    /// points that fall outside it.
    #[must_use]
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self)))]
    pub fn rebound(&self, newbounds: Box3) -> Self {
        Self { bounds: newbounds, tree: self.tree.rebound(self.bounds, newbounds) }
    }

    /// Applies the linear map `m` to every stored point, reboxing to the
    /// smallest axis-aligned enclosure of the transformed bounds.
    #[must_use]
    pub fn apply_matrix(&self, m: Matrix3) -> Self {
        let newbounds = convex_box_deform(|p| matrix_action(m, p), self.bounds);
        let tree = self.tree.deform(
            self.bounds,
            newbounds,
            &|p| matrix_action(m, p),
            &|b| convex_box_deform(|p| matrix_action(m, p), b),
        );
        Self { bounds: newbounds, tree }
    }

    /// Retains every point for which `point_fn` is true.
    #[must_use]
    pub fn subset(&self, point_fn: impl Fn(Point3) -> bool) -> Self {
        let tree = self.tree.subset(self.bounds, &point_fn, &|_| Trivalent::Unknown);
        Self { bounds: self.bounds, tree }
    }

    /// Best-first search, yielding `(score, coords, payload)` in
    /// non-decreasing score order. `boxscore` must lower-bound `pointscore`
    /// over every point contained in the box it is given.
    pub fn by_score<'a, PF, BF>(&'a self, pointscore: PF, boxscore: BF) -> ByScore<'a, D>
    where
        PF: Fn(Point3) -> Option<Score> + 'a,
        BF: Fn(Box3) -> Option<Score> + 'a,
    {
        self.tree.by_score(self.bounds, pointscore, boxscore)
    }

    /// Points in non-decreasing distance from `p`, clamped to `epsilon`
    /// (`f64::INFINITY` for no limit).
    pub fn by_distance_from_point(&self, p: Point3, epsilon: f64) -> ByScore<'_, D> {
        self.by_score(
            move |q| score_within(euclidean_point_point(p, q), epsilon),
            move |b| score_within(euclidean_point_box(p, b), epsilon),
        )
    }

    /// Points in non-increasing distance from `p` (furthest first).
    pub fn by_distance_from_point_rev(&self, p: Point3) -> impl Iterator<Item = (f64, Point3, &D)> {
        self.by_score(
            move |q| Some(Score(-euclidean_point_point(p, q))),
            move |b| {
                vertices(b)
                    .into_iter()
                    .map(|v| -euclidean_point_point(p, v))
                    .fold(None::<f64>, |acc, d| Some(acc.map_or(d, |a| a.min(d))))
                    .map(Score)
            },
        )
        .map(|(Score(d), p, v)| (-d, p, v))
    }

    /// The nearest point to `p`, or `None` if the tree is empty.
    #[must_use]
    pub fn nearest_to_point(&self, p: Point3) -> Option<(f64, Point3, &D)> {
        self.by_distance_from_point(p, f64::INFINITY).next().map(|(Score(d), q, v)| (d, q, v))
    }

    /// Points within `epsilon` of `p`, in non-decreasing distance order.
    pub fn near_point(&self, p: Point3, epsilon: f64) -> impl Iterator<Item = (f64, Point3, &D)> {
        self.by_distance_from_point(p, epsilon).map(|(Score(d), q, v)| (d, q, v))
    }
}

fn score_within(d: f64, epsilon: f64) -> Option<Score> {
    if d < epsilon { Some(Score(d)) } else { None }
}

impl<D: Clone> Octree<D> {
    /// Pairs `(distance, coords_a, coords_b, payload_a, payload_b)` sorted
    /// ascending by the distance from each point of `self` to its nearest
    /// neighbour in `other`; points with no neighbour within `epsilon` are
    /// omitted.
    #[must_use]
    pub fn by_proximity<'a, E>(&'a self, other: &'a Octree<E>, epsilon: f64) -> Vec<(f64, Point3, Point3, D, E)>
    where
        E: Clone,
    {
        let mut out: Vec<_> = self
            .iter()
            .filter_map(|(p, d)| {
                other.nearest_to_point(p).filter(|(dist, _, _)| *dist < epsilon).map(|(dist, q, e)| {
                    (dist, p, q, d.clone(), e.clone())
                })
            })
            .collect();
        out.sort_by(|a, b| a.0.total_cmp(&b.0));
        out
    }

    /// As [`by_proximity`](Self::by_proximity), but sorted descending —
    /// points in `self` whose nearest neighbour in `other` is farthest away
    /// (while still within `epsilon`) come first.
    #[must_use]
    pub fn by_isolation<'a, E>(&'a self, other: &'a Octree<E>, epsilon: f64) -> Vec<(f64, Point3, Point3, D, E)>
    where
        E: Clone,
    {
        let mut out = self.by_proximity(other, epsilon);
        out.sort_by(|a, b| b.0.total_cmp(&a.0));
        out
    }

    /// Every pair of points, one from `self` and one from `other`, within
    /// `epsilon` of each other, sorted ascending by pair distance.
    #[must_use]
    pub fn pairs_by_distance<'a, E>(&'a self, other: &'a Octree<E>, epsilon: f64) -> Vec<(f64, Point3, Point3, D, E)>
    where
        E: Clone,
    {
        let mut out = self.pairs_nearby(other, epsilon);
        out.sort_by(|a, b| a.0.total_cmp(&b.0));
        out
    }

    /// As [`pairs_by_distance`](Self::pairs_by_distance), but in unspecified
    /// (traversal) order — cheaper when the caller doesn't need global
    /// sorting.
    #[must_use]
    pub fn pairs_nearby<'a, E>(&'a self, other: &'a Octree<E>, epsilon: f64) -> Vec<(f64, Point3, Point3, D, E)>
    where
        E: Clone,
    {
        let mut out = Vec::new();
        for (p, d) in self.iter() {
            for (dist, q, e) in other.near_point(p, epsilon) {
                out.push((dist, p, q, d.clone(), e.clone()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Box3 {
        Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0))
    }

    #[test]
    fn insert_out_of_bounds_fails() {
        let mut t = Octree::<&str>::new(bounds());
        assert_eq!(
            t.insert(Point3::new(2.0, 0.5, 0.5), "x"),
            Err(OctreeError::OutOfBounds { point: Point3::new(2.0, 0.5, 0.5) })
        );
    }

    #[test]
    fn insert_duplicate_fails_and_update_does_not() {
        let mut t = Octree::<&str>::new(bounds());
        let p = Point3::new(0.33, 0.66, 0.99);
        t.insert(p, "A").unwrap();
        assert_eq!(t.insert(p, "A2"), Err(OctreeError::DuplicateKey { point: p }));
        t.update(p, "A'").unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(p), Some(&"A'"));
    }

    #[test]
    fn end_to_end_scenario_one() {
        let mut t = Octree::<&str>::new(bounds());
        t.insert(Point3::new(0.33, 0.66, 0.99), "A").unwrap();
        t.insert(Point3::new(0.12, 0.34, 0.56), "B").unwrap();
        t.insert(Point3::new(0.98, 0.76, 0.54), "C").unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(
            t.insert(Point3::new(2.35, 0.87, 0.56), "D"),
            Err(OctreeError::OutOfBounds { point: Point3::new(2.35, 0.87, 0.56) })
        );
        assert_eq!(
            t.insert(Point3::new(0.33, 0.66, 0.99), "A2"),
            Err(OctreeError::DuplicateKey { point: Point3::new(0.33, 0.66, 0.99) })
        );
        t.update(Point3::new(0.33, 0.66, 0.99), "A'").unwrap();
        assert_eq!(t.len(), 3);
    }

    #[test]
    fn by_distance_from_point_matches_iteration_set_and_is_sorted() {
        let b = Box3::new((-1.0, 1.0), (-1.0, 1.0), (-1.0, 1.0));
        let mut t = Octree::<u32>::new(b);
        for i in 0..50u32 {
            let tt = f64::from(i) * 0.1;
            t.insert(Point3::new((tt).sin(), (tt * 2.0).sin(), (tt * 3.0).sin()), i).unwrap();
        }
        let query = Point3::new(0.123, 0.456, 0.789);
        let results: Vec<_> = t.by_distance_from_point(query, f64::INFINITY).collect();
        assert_eq!(results.len(), 50);
        for w in results.windows(2) {
            assert!(w[0].0 <= w[1].0);
        }
        let nearest = t.nearest_to_point(query).unwrap();
        assert_eq!((nearest.0, nearest.1), (results[0].0.0, results[0].1));
    }

    #[test]
    fn simple_union_requires_matching_bounds() {
        let a = Octree::<u32>::new(bounds());
        let b = Octree::<u32>::new(Box3::new((0.0, 2.0), (0.0, 2.0), (0.0, 2.0)));
        assert!(matches!(a.simple_union(&b), Err(OctreeError::BoundsMismatch { .. })));
    }

    #[test]
    fn simple_union_of_split_halves_reconstructs_whole() {
        let b = Box3::new((-1.0, 1.0), (-1.0, 1.0), (-1.0, 1.0));
        let center = Point3::new(0.236, -0.532, -0.117);
        let mut whole = Octree::<u32>::new(b);
        for i in 0..50u32 {
            let tt = f64::from(i) * 0.1;
            whole.insert(Point3::new(tt.sin(), (tt * 2.0).sin(), (tt * 3.0).sin()), i).unwrap();
        }
        let mut near = Octree::<u32>::new(b);
        let mut far = Octree::<u32>::new(b);
        for (p, d) in whole.iter() {
            if euclidean_point_point(center, p) < 1.0 {
                near.insert(p, *d).unwrap();
            } else {
                far.insert(p, *d).unwrap();
            }
        }
        let rejoined = near.simple_union(&far).unwrap();
        assert_eq!(rejoined.len(), whole.len());
        for (p, _) in whole.iter() {
            assert!(rejoined.get(p).is_some());
        }
    }

    #[test]
    fn rebound_to_larger_box_preserves_distance_order() {
        let b = Box3::new((-1.0, 1.0), (-1.0, 1.0), (-1.0, 1.0));
        let mut t = Octree::<u32>::new(b);
        for i in 0..50u32 {
            let tt = f64::from(i) * 0.1;
            t.insert(Point3::new(tt.sin(), (tt * 2.0).sin(), (tt * 3.0).sin()), i).unwrap();
        }
        let grown = t.rebound(Box3::new((-1.0, 1.6), (-1.0, 1.6), (-1.0, 1.6)));
        assert_eq!(grown.len(), t.len());
        let query = Point3::new(0.1, 0.1, 0.1);
        let before: Vec<_> = t.by_distance_from_point(query, f64::INFINITY).map(|(_, p, _)| p).collect();
        let after: Vec<_> = grown.by_distance_from_point(query, f64::INFINITY).map(|(_, p, _)| p).collect();
        assert_eq!(
            before.iter().map(|p| p.to_array()).collect::<Vec<_>>(),
            after.iter().map(|p| p.to_array()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn rebound_to_smaller_box_matches_subset() {
        let b = Box3::new((-1.0, 1.0), (-1.0, 1.0), (-1.0, 1.0));
        let mut t = Octree::<u32>::new(b);
        for i in 0..30u32 {
            let f = f64::from(i) / 30.0 * 2.0 - 1.0;
            t.insert(Point3::new(f, (f * 3.0).sin(), (f * 7.0).cos() * 0.5), i).unwrap();
        }
        let newbounds = Box3::new((-1.57, 0.43), (-0.76, 0.83), (-0.37, 1.96));
        let rebounded = t.rebound(newbounds);
        let subset = t.subset(|p| point_in_box(p, newbounds));
        let mut a: Vec<_> = rebounded.iter().map(|(p, d)| (p.to_array().map(|x| (x * 1e9) as i64), *d)).collect();
        let mut c: Vec<_> = subset.iter().map(|(p, d)| (p.to_array().map(|x| (x * 1e9) as i64), *d)).collect();
        a.sort();
        c.sort();
        assert_eq!(a, c);
    }

    #[test]
    fn apply_matrix_identity_preserves_points() {
        let b = bounds();
        let mut t = Octree::<u32>::new(b);
        t.insert(Point3::new(0.2, 0.3, 0.4), 1).unwrap();
        let moved = t.apply_matrix(Matrix3::identity());
        assert_eq!(moved.len(), 1);
        assert_eq!(moved.get(Point3::new(0.2, 0.3, 0.4)), Some(&1));
    }

    #[test]
    fn by_proximity_and_pairs_by_distance_are_sorted() {
        let b = Box3::new((0.0, 1.0), (0.0, 1.0), (0.0, 1.0));
        let mut a = Octree::<u32>::new(b);
        let mut c = Octree::<u32>::new(b);
        for i in 0..10u32 {
            let f = f64::from(i) / 10.0;
            a.insert(Point3::new(f, f, f), i).unwrap();
        }
        for i in 0..10u32 {
            let f = f64::from(i) / 10.0;
            c.insert(Point3::new(f, f, (f + 0.02).min(0.999)), 100 + i).unwrap();
        }
        let prox = a.by_proximity(&c, 0.5);
        for w in prox.windows(2) {
            assert!(w[0].0 <= w[1].0);
        }
        let pairs = a.pairs_by_distance(&c, 0.5);
        for w in pairs.windows(2) {
            assert!(w[0].0 <= w[1].0);
        }
        assert_eq!(pairs.len(), a.pairs_nearby(&c, 0.5).len());
    }
}
