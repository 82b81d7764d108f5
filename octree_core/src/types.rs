// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core geometric types shared by every layer: `Point3`, `Box3`, and a small
//! 3x3 matrix for [`apply_matrix`](crate::tree::Tree)-style transforms.

use core::cmp::Ordering;

#[inline]
fn abs(x: f64) -> f64 {
    #[cfg(feature = "std")]
    {
        x.abs()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::fabs(x)
    }
}

#[inline]
fn sqrt(v: f64) -> f64 {
    #[cfg(feature = "std")]
    {
        v.sqrt()
    }
    #[cfg(not(feature = "std"))]
    {
        libm::sqrt(v)
    }
}

/// A point in 3D Euclidean space.
///
/// Equality is exact bit-for-bit `f64` comparison, matching the coordinate
/// uniqueness invariant relied on throughout the tree algebra.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point3 {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

impl Point3 {
    /// Creates a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Component-wise access as an array, in `[x, y, z]` order.
    #[must_use]
    pub const fn to_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    /// Builds a point from a `[x, y, z]` array.
    #[must_use]
    pub const fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub(crate) fn axis(self, i: usize) -> f64 {
        match i {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }
}

/// An axis-aligned interval `[min, max]` on one axis, with `min <= max`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Interval {
    /// Lower bound (inclusive).
    pub min: f64,
    /// Upper bound. Treated as exclusive for point containment (see [`point_in_box`]),
    /// inclusive for box/box and box/vertex geometry.
    pub max: f64,
}

impl Interval {
    /// Creates a new interval. Does not validate `min <= max`; callers are expected
    /// to construct intervals from already-ordered bounds.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    fn mid(self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// An axis-aligned box in 3D: `((xmin, xmax), (ymin, ymax), (zmin, zmax))`.
///
/// Used uniformly as a facade's bounds, a node's bounding box, and a blob's
/// extent. A point `p` is *in* a box when `xmin <= p.x < xmax`, and likewise
/// for y, z — half-open on the upper bound. This convention is relied upon by
/// the octant subdivision decision in [`narrow`] and [`subboxes`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Box3 {
    /// X-axis extent.
    pub x: Interval,
    /// Y-axis extent.
    pub y: Interval,
    /// Z-axis extent.
    pub z: Interval,
}

impl Box3 {
    /// Creates a box from three (min, max) pairs.
    #[must_use]
    pub const fn new(x: (f64, f64), y: (f64, f64), z: (f64, f64)) -> Self {
        Self {
            x: Interval::new(x.0, x.1),
            y: Interval::new(y.0, y.1),
            z: Interval::new(z.0, z.1),
        }
    }

    pub(crate) fn axis(self, i: usize) -> Interval {
        match i {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// The centroid `(mx, my, mz)` used to subdivide this box into eight octants.
    #[must_use]
    pub fn centroid(self) -> Point3 {
        Point3::new(self.x.mid(), self.y.mid(), self.z.mid())
    }
}

/// True iff `p` lies in `b`, using the half-open upper bound convention.
#[must_use]
pub fn point_in_box(p: Point3, b: Box3) -> bool {
    (b.x.min <= p.x && p.x < b.x.max)
        && (b.y.min <= p.y && p.y < b.y.max)
        && (b.z.min <= p.z && p.z < b.z.max)
}

/// True iff every point of `inner` is also in `outer`.
///
/// Compares closed corners (`inner.min >= outer.min`, `inner.max <= outer.max`)
/// since `inner` is itself a box, not a single point.
#[must_use]
pub fn box_contains(outer: Box3, inner: Box3) -> bool {
    let axis = |o: Interval, i: Interval| o.min <= i.min && i.max <= o.max;
    axis(outer.x, inner.x) && axis(outer.y, inner.y) && axis(outer.z, inner.z)
}

/// True iff `a` and `b` share no point.
///
/// Uses the symmetric form `max_a <= min_b || max_b <= min_a` on every axis.
/// An earlier draft of the source this crate is modeled on mixed up an index
/// (`miny1`/`minz1` where `miny2`/`minz2` was meant) in one of its two copies
/// of this check; the symmetric form below sidesteps that class of bug by
/// construction.
#[must_use]
pub fn boxes_disjoint(a: Box3, b: Box3) -> bool {
    let sep = |ia: Interval, ib: Interval| ia.max <= ib.min || ib.max <= ia.min;
    sep(a.x, b.x) || sep(a.y, b.y) || sep(a.z, b.z)
}

/// Componentwise min/max union of two boxes.
#[must_use]
pub fn union_box(a: Box3, b: Box3) -> Box3 {
    let axis = |ia: Interval, ib: Interval| Interval::new(ia.min.min(ib.min), ia.max.max(ib.max));
    Box3 {
        x: axis(a.x, b.x),
        y: axis(a.y, b.y),
        z: axis(a.z, b.z),
    }
}

/// The centroid of a box; a free-function alias of [`Box3::centroid`] kept to
/// mirror the shape of the rest of the geometry kernel.
#[must_use]
pub fn centroid(b: Box3) -> Point3 {
    b.centroid()
}

/// Splits `b` into its eight octant sub-boxes, in the canonical ZYX order:
/// index `4*[x>=mx] + 2*[y>=my] + 1*[z>=mz]`.
#[must_use]
pub fn subboxes(b: Box3) -> [Box3; 8] {
    let c = b.centroid();
    let lo_hi = |iv: Interval, mid: f64| (Interval::new(iv.min, mid), Interval::new(mid, iv.max));
    let (xlo, xhi) = lo_hi(b.x, c.x);
    let (ylo, yhi) = lo_hi(b.y, c.y);
    let (zlo, zhi) = lo_hi(b.z, c.z);
    let mut out = [b; 8];
    for (idx, slot) in out.iter_mut().enumerate() {
        let x = if idx & 0b100 != 0 { xhi } else { xlo };
        let y = if idx & 0b010 != 0 { yhi } else { ylo };
        let z = if idx & 0b001 != 0 { zhi } else { zlo };
        *slot = Box3 { x, y, z };
    }
    out
}

/// The eight corner vertices of `b`.
#[must_use]
pub fn vertices(b: Box3) -> [Point3; 8] {
    let mut out = [Point3::new(0.0, 0.0, 0.0); 8];
    for (idx, slot) in out.iter_mut().enumerate() {
        let x = if idx & 0b100 != 0 { b.x.max } else { b.x.min };
        let y = if idx & 0b010 != 0 { b.y.max } else { b.y.min };
        let z = if idx & 0b001 != 0 { b.z.max } else { b.z.min };
        *slot = Point3::new(x, y, z);
    }
    out
}

/// Chooses the octant of `bounds` that contains `p`, returning the octant
/// index (per the ZYX convention) and that octant's sub-box.
///
/// Does not check that `p` actually lies in `bounds`; callers validate bounds
/// membership at the facade boundary.
#[must_use]
pub fn narrow(bounds: Box3, p: Point3) -> (usize, Box3) {
    let c = bounds.centroid();
    let idx =
        (usize::from(p.x >= c.x) << 2) | (usize::from(p.y >= c.y) << 1) | usize::from(p.z >= c.z);
    (idx, subboxes(bounds)[idx])
}

/// Straight-line distance between two points.
#[must_use]
pub fn euclidean_point_point(a: Point3, b: Point3) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    sqrt(dx * dx + dy * dy + dz * dz)
}

fn clamp_to_interval(v: f64, iv: Interval) -> f64 {
    if v < iv.min {
        iv.min
    } else if v > iv.max {
        iv.max
    } else {
        v
    }
}

fn farthest_in_interval(v: f64, iv: Interval) -> f64 {
    if abs(v - iv.min) >= abs(v - iv.max) {
        iv.min
    } else {
        iv.max
    }
}

/// Distance from `p` to the nearest point of `b` (0 if `p` is inside `b`).
#[must_use]
pub fn euclidean_point_box(p: Point3, b: Box3) -> f64 {
    let nearest = Point3::new(
        clamp_to_interval(p.x, b.x),
        clamp_to_interval(p.y, b.y),
        clamp_to_interval(p.z, b.z),
    );
    euclidean_point_point(p, nearest)
}

/// Distance from `p` to the farthest point of `b` (always a vertex).
#[must_use]
pub fn euclidean_point_box_max(p: Point3, b: Box3) -> f64 {
    let farthest = Point3::new(
        farthest_in_interval(p.x, b.x),
        farthest_in_interval(p.y, b.y),
        farthest_in_interval(p.z, b.z),
    );
    euclidean_point_point(p, farthest)
}

fn interval_gap(a: Interval, b: Interval) -> f64 {
    if a.max < b.min {
        b.min - a.max
    } else if b.max < a.min {
        a.min - b.max
    } else {
        0.0
    }
}

/// Minimum separation between two boxes (0 if they overlap or touch).
#[must_use]
pub fn euclidean_box_box(a: Box3, b: Box3) -> f64 {
    let dx = interval_gap(a.x, b.x);
    let dy = interval_gap(a.y, b.y);
    let dz = interval_gap(a.z, b.z);
    sqrt(dx * dx + dy * dy + dz * dz)
}

fn interval_max_gap(a: Interval, b: Interval) -> f64 {
    abs(a.max - b.min).max(abs(b.max - a.min))
}

/// Maximum separation between two boxes: the farthest a point of `a` can be
/// from a point of `b`.
#[must_use]
pub fn euclidean_box_box_max(a: Box3, b: Box3) -> f64 {
    let dx = interval_max_gap(a.x, b.x);
    let dy = interval_max_gap(a.y, b.y);
    let dz = interval_max_gap(a.z, b.z);
    sqrt(dx * dx + dy * dy + dz * dz)
}

/// True iff the infinite line through `origin` with direction `dir` meets `b`,
/// via the slab method (successive per-axis interval intersection).
#[must_use]
pub fn line_intersects_box(origin: Point3, dir: Point3, b: Box3) -> bool {
    slab_intersection(origin, dir, b, f64::NEG_INFINITY, f64::INFINITY).is_some()
}

/// True iff the ray (half-line) from `origin` in direction `dir`, `t >= 0`, meets `b`.
#[must_use]
pub fn halfline_intersects_box(origin: Point3, dir: Point3, b: Box3) -> bool {
    slab_intersection(origin, dir, b, 0.0, f64::INFINITY).is_some()
}

/// True iff the segment from `p` to `q` meets `b`, via successive-axis clipping
/// of the parameter interval `t in [0, 1]`.
#[must_use]
pub fn line_segment_intersects_box(p: Point3, q: Point3, b: Box3) -> bool {
    let dir = Point3::new(q.x - p.x, q.y - p.y, q.z - p.z);
    slab_intersection(p, dir, b, 0.0, 1.0).is_some()
}

/// Clips the parametric interval `[t_lo, t_hi]` of the ray `origin + t*dir`
/// against each axis slab of `b` in turn, narrowing the interval; returns
/// `None` once it becomes empty.
fn slab_intersection(
    origin: Point3,
    dir: Point3,
    b: Box3,
    t_lo: f64,
    t_hi: f64,
) -> Option<(f64, f64)> {
    let mut lo = t_lo;
    let mut hi = t_hi;
    for axis in 0..3 {
        let o = origin.axis(axis);
        let d = dir.axis(axis);
        let iv = b.axis(axis);
        if d == 0.0 {
            if o < iv.min || o > iv.max {
                return None;
            }
            continue;
        }
        let mut t0 = (iv.min - o) / d;
        let mut t1 = (iv.max - o) / d;
        if t0 > t1 {
            core::mem::swap(&mut t0, &mut t1);
        }
        lo = lo.max(t0);
        hi = hi.min(t1);
        if lo > hi {
            return None;
        }
    }
    Some((lo, hi))
}

/// True iff the box has at least one vertex with `f(vertex) >= 0` and at
/// least one with `f(vertex) <= 0` — i.e. the plane implicitly defined by `f`
/// passes through (or touches) the box.
pub fn box_intersects_plane(b: Box3, mut f: impl FnMut(Point3) -> f64) -> bool {
    let mut any_nonneg = false;
    let mut any_nonpos = false;
    for v in vertices(b) {
        let s = f(v);
        any_nonneg |= s >= 0.0;
        any_nonpos |= s <= 0.0;
    }
    any_nonneg && any_nonpos
}

/// A 3x3 matrix, row-major, for linear transforms of points and boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix3 {
    /// Matrix rows.
    pub rows: [[f64; 3]; 3],
}

impl Matrix3 {
    /// Creates a matrix from its rows.
    #[must_use]
    pub const fn new(rows: [[f64; 3]; 3]) -> Self {
        Self { rows }
    }

    /// The identity matrix.
    #[must_use]
    pub const fn identity() -> Self {
        Self::new([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]])
    }
}

/// Applies `m` to the column vector `p`.
#[must_use]
pub fn matrix_action(m: Matrix3, p: Point3) -> Point3 {
    let a = p.to_array();
    let mut out = [0.0; 3];
    for (i, row) in m.rows.iter().enumerate() {
        out[i] = row[0] * a[0] + row[1] * a[1] + row[2] * a[2];
    }
    Point3::from_array(out)
}

/// Bounding box of `f` applied to each of the 8 vertices of `b`.
///
/// Used for [`apply_matrix`](crate::tree::Tree) and any other transform that
/// is affine/linear-ish but not necessarily axis-preserving: the image of a
/// box under a general linear map is a parallelepiped, so the tightest
/// axis-aligned enclosure is the convex hull of the transformed vertices,
/// which for a linear map is exactly their componentwise min/max.
pub fn convex_box_deform(mut f: impl FnMut(Point3) -> Point3, b: Box3) -> Box3 {
    let pts = vertices(b).map(&mut f);
    let mut lo = pts[0];
    let mut hi = pts[0];
    for p in &pts[1..] {
        lo = Point3::new(lo.x.min(p.x), lo.y.min(p.y), lo.z.min(p.z));
        hi = Point3::new(hi.x.max(p.x), hi.y.max(p.y), hi.z.max(p.z));
    }
    Box3::new((lo.x, hi.x), (lo.y, hi.y), (lo.z, hi.z))
}

/// A score produced by a point-score or box-score callback: either a
/// comparable value, or *absent* (modeled by wrapping in `Option<Score>`)
/// meaning "prune this point/subtree".
///
/// Wraps `f64` with a total order; the distance functions in this module
/// never produce `NaN`, so the fallback in `Ord` is unreachable in practice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Score(pub f64);

impl Eq for Score {}

impl PartialOrd for Score {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Score {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.partial_cmp(&other.0).unwrap_or(Ordering::Equal)
    }
}

/// A three-valued answer used by the `box_fn` half of the subset/filter
/// protocol shared by [`crate::tree::Tree::subset`] and the blob tree's
/// extent-indexed queries.
///
/// `True` keeps a whole subtree without recursing; `False` drops it
/// entirely; `Unknown` means "recurse into the children and decide there."
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trivalent {
    /// Keep the whole subtree.
    True,
    /// Drop the whole subtree.
    False,
    /// Recurse into children.
    Unknown,
}
