// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Best-first search over a [`Tree`], parameterised by a point-score and a
//! box-score callback. Every distance, range, and proximity query the
//! facades expose is an instantiation of this one traversal.

use alloc::collections::BinaryHeap;
use alloc::boxed::Box as AllocBox;
use core::cmp::{Ordering, Reverse};

use crate::tree::Tree;
use crate::types::{Box3, Point3, Score, subboxes};

enum HeapKind<'a, D> {
    Point(Point3, &'a D),
    Node(Box3, &'a Tree<D>),
}

pub(crate) struct HeapEntry<'a, D> {
    score: Score,
    seq: u64,
    kind: HeapKind<'a, D>,
}

impl<'a, D> HeapEntry<'a, D> {
    pub(crate) fn point(score: Score, seq: u64, p: Point3, d: &'a D) -> Self {
        Self { score, seq, kind: HeapKind::Point(p, d) }
    }

    pub(crate) fn node(score: Score, seq: u64, bounds: Box3, tree: &'a Tree<D>) -> Self {
        Self { score, seq, kind: HeapKind::Node(bounds, tree) }
    }
}

impl<'a, D> PartialEq for HeapEntry<'a, D> {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl<'a, D> Eq for HeapEntry<'a, D> {}

impl<'a, D> PartialOrd for HeapEntry<'a, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<'a, D> Ord for HeapEntry<'a, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Ties broken by insertion order (the monotone `seq` counter), never by
        // comparing payloads or tree contents, which have no defined order.
        self.score.cmp(&other.score).then(self.seq.cmp(&other.seq))
    }
}

/// Lazy best-first traversal produced by [`Tree::by_score`].
///
/// Yields `(score, coords, payload)` in non-decreasing `score` order. Holds a
/// work-stack-style min-heap internally rather than recursing, so a consumer
/// that stops early (e.g. after the first element) never pays for unvisited
/// subtrees.
pub struct ByScore<'a, D> {
    heap: BinaryHeap<Reverse<HeapEntry<'a, D>>>,
    seq: u64,
    pointscore: AllocBox<dyn Fn(Point3) -> Option<Score> + 'a>,
    boxscore: AllocBox<dyn Fn(Box3) -> Option<Score> + 'a>,
}

pub(crate) fn by_score<'a, D, PF, BF>(
    root: &'a Tree<D>,
    bounds: Box3,
    pointscore: PF,
    boxscore: BF,
) -> ByScore<'a, D>
where
    D: Clone,
    PF: Fn(Point3) -> Option<Score> + 'a,
    BF: Fn(Box3) -> Option<Score> + 'a,
{
    let pointscore: AllocBox<dyn Fn(Point3) -> Option<Score> + 'a> = AllocBox::new(pointscore);
    let boxscore: AllocBox<dyn Fn(Box3) -> Option<Score> + 'a> = AllocBox::new(boxscore);
    let mut heap = BinaryHeap::new();
    let mut seq = 0u64;
    root.enqueue(&mut heap, bounds, &mut seq, &*pointscore, &*boxscore);
    ByScore { heap, seq, pointscore, boxscore }
}

impl<'a, D> Iterator for ByScore<'a, D>
where
    D: Clone,
{
    type Item = (Score, Point3, &'a D);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Reverse(entry)) = self.heap.pop() {
            match entry.kind {
                HeapKind::Point(p, d) => return Some((entry.score, p, d)),
                HeapKind::Node(bounds, tree) => {
                    if let Tree::Node(children) = tree {
                        let subs = subboxes(bounds);
                        for i in 0..8 {
                            children[i].enqueue(
                                &mut self.heap,
                                subs[i],
                                &mut self.seq,
                                &*self.pointscore,
                                &*self.boxscore,
                            );
                        }
                    }
                }
            }
        }
        None
    }
}
